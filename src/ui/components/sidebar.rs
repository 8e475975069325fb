use chrono::{Local, TimeZone, Utc};
use eframe::egui;

use crate::ui::state::AppState;

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Default)]
pub struct SidebarActions {
    pub new_chat: bool,
    pub search: Option<String>,
    pub select: Option<String>,
    pub delete: Option<String>,
    pub open_library: bool,
}

/// Sidebar label for when a session was last active, relative to `now_ms`.
pub fn relative_label(updated_at_ms: i64, now_ms: i64) -> String {
    let hours = (now_ms - updated_at_ms) / HOUR_MS;
    if hours < 24 {
        "Today".to_string()
    } else if hours < 48 {
        "Yesterday".to_string()
    } else if hours < 24 * 7 {
        "This Week".to_string()
    } else {
        match Local.timestamp_millis_opt(updated_at_ms).single() {
            Some(date) => date.format("%b %-d, %Y").to_string(),
            None => "Earlier".to_string(),
        }
    }
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> SidebarActions {
    let mut actions = SidebarActions::default();

    ui.heading("Conversations");
    ui.separator();

    if ui.button("+ New chat").clicked() {
        actions.new_chat = true;
    }

    // Matches titles and message content
    let response = ui.add(egui::TextEdit::singleline(&mut state.search_text).hint_text("Search"));
    if response.changed() {
        actions.search = Some(state.search_text.clone());
    }

    ui.separator();

    if state.sessions.is_empty() {
        ui.label("No conversations yet");
    }

    let now_ms = Utc::now().timestamp_millis();
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 40.0)
        .show(ui, |ui| {
            for session in &state.sessions {
                let selected = state.current_session.as_deref() == Some(session.id.as_str());
                ui.horizontal(|ui| {
                    if ui.selectable_label(selected, session.title.as_str()).clicked() {
                        actions.select = Some(session.id.clone());
                    }
                    ui.label(egui::RichText::new(relative_label(session.updated_at, now_ms)).weak());
                    if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                        actions.delete = Some(session.id.clone());
                    }
                });
            }
        });

    ui.separator();
    if ui.button("Media library").clicked() {
        actions.open_library = true;
    }

    actions
}
