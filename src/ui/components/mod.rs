pub mod chat_area;
pub mod input_bar;
pub mod library;
pub mod mood_panel;
pub mod sidebar;
