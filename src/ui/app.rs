use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{ChatCommand, ChatEvent};

use super::components::{chat_area, input_bar, library, mood_panel, sidebar};
use super::state::AppState;

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<ChatCommand>,
    event_receiver: mpsc::Receiver<ChatEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<ChatCommand>,
        event_receiver: mpsc::Receiver<ChatEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_backend_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            if let Some(follow_up) = self.state.apply(event) {
                self.send_command(follow_up);
            }
        }
    }

    fn send_command(&mut self, command: ChatCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to backend: {err}");
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_backend_events();

        egui::SidePanel::left("session_sidebar")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                let actions = sidebar::render(ui, &mut self.state);
                if actions.new_chat {
                    self.send_command(ChatCommand::NewSession);
                }
                if let Some(query) = actions.search {
                    self.send_command(ChatCommand::SearchSessions(query));
                }
                if let Some(session_id) = actions.select {
                    self.send_command(ChatCommand::SelectSession(session_id));
                }
                if let Some(session_id) = actions.delete {
                    self.send_command(ChatCommand::DeleteSession(session_id));
                }
                if actions.open_library {
                    self.state.show_library = true;
                    self.send_command(ChatCommand::RefreshLibrary);
                }
            });

        egui::SidePanel::right("mood_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                if let Some(check_in) = mood_panel::render(ui, &mut self.state) {
                    self.send_command(ChatCommand::LogMood(check_in));
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.show_library {
                let actions = library::render(ui, &mut self.state);
                if let Some(path) = actions.upload {
                    self.send_command(ChatCommand::UploadMedia(path));
                }
                if actions.refresh {
                    self.send_command(ChatCommand::RefreshLibrary);
                }
                if actions.close {
                    self.state.show_library = false;
                }
                return;
            }

            ui.heading("Mood Companion");
            if let Some(banner) = &self.state.banner {
                ui.colored_label(egui::Color32::LIGHT_RED, banner.as_str());
            }
            ui.separator();

            // Chừa chỗ cho thanh nhập liệu ở cuối
            let chat_height = (ui.available_height() - 40.0).max(0.0);
            ui.allocate_ui(egui::vec2(ui.available_width(), chat_height), |ui| {
                chat_area::render(ui, &self.state);
            });

            ui.separator();
            let actions = input_bar::render(ui, &mut self.state.input_text, self.state.streaming);
            if let Some(content) = actions.send {
                self.send_command(ChatCommand::SendMessage(content));
            }
            if actions.cancel {
                self.send_command(ChatCommand::CancelTurn);
            }
        });

        ctx.request_repaint();
    }
}
