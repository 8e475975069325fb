use std::path::PathBuf;

use chrono::{Local, TimeZone};
use eframe::egui;

use crate::ui::state::AppState;

#[derive(Default)]
pub struct LibraryActions {
    pub upload: Option<PathBuf>,
    pub refresh: bool,
    pub close: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> LibraryActions {
    let mut actions = LibraryActions::default();

    ui.horizontal(|ui| {
        ui.heading("Media library");
        if ui.button("Refresh").clicked() {
            actions.refresh = true;
        }
        if ui.button("Back to chat").clicked() {
            actions.close = true;
        }
    });
    ui.separator();

    ui.horizontal(|ui| {
        ui.add(egui::TextEdit::singleline(&mut state.upload_path).hint_text("Path to a file"));
        if ui.button("Upload").clicked() && !state.upload_path.trim().is_empty() {
            actions.upload = Some(PathBuf::from(state.upload_path.trim()));
            state.upload_path.clear();
        }
    });
    ui.separator();

    if state.library.is_empty() {
        ui.label("No files uploaded yet");
        return actions;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for item in &state.library {
            ui.horizontal(|ui| {
                ui.hyperlink_to(item.file_name.as_str(), &item.file_url);
                ui.label(egui::RichText::new(&item.file_type).weak());
                if let Some(title) = &item.session_title {
                    ui.label(egui::RichText::new(format!("from \"{title}\"")).weak());
                }
                if let Some(date) = Local.timestamp_millis_opt(item.created_at).single() {
                    ui.label(egui::RichText::new(date.format("%b %-d, %Y").to_string()).weak());
                }
            });
        }
    });

    actions
}
