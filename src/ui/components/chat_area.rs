use eframe::egui;

use crate::common::ChatMessage;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for message in &state.messages {
                render_message(ui, message);
            }

            if state.is_typing() {
                ui.label(egui::RichText::new("Companion is typing...").italics().weak());
            } else if state.streaming {
                bubble(ui, "Companion", &state.draft, egui::Color32::LIGHT_BLUE);
            }
        });
}

fn render_message(ui: &mut egui::Ui, message: &ChatMessage) {
    if message.is_user {
        bubble(ui, "You", &message.content, egui::Color32::LIGHT_GREEN);
    } else {
        bubble(ui, "Companion", &message.content, egui::Color32::LIGHT_BLUE);
    }
}

fn bubble(ui: &mut egui::Ui, author: &str, content: &str, color: egui::Color32) {
    ui.add_space(4.0);
    ui.colored_label(color, egui::RichText::new(author).strong());
    ui.label(content);
}
