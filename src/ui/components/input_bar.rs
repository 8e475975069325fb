use eframe::egui;

const SEARCH_COMMAND: &str = "/search ";

/// Text to send for what the user typed, if anything.
///
/// `/search <query>` becomes a web search request for the chat function.
pub fn outgoing_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if let Some(query) = trimmed.strip_prefix(SEARCH_COMMAND) {
        let query = query.trim();
        return (!query.is_empty()).then(|| format!("[Web Search] {query}"));
    }
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub struct InputActions {
    pub send: Option<String>,
    pub cancel: bool,
}

pub fn render(ui: &mut egui::Ui, input_text: &mut String, streaming: bool) -> InputActions {
    let mut actions = InputActions {
        send: None,
        cancel: false,
    };
    let mut send = false;

    ui.horizontal(|ui| {
        let response = ui.add_enabled(
            !streaming,
            egui::TextEdit::singleline(input_text)
                .hint_text("Share what's on your mind... (/search <query> to search the web)")
                .desired_width(ui.available_width() - 80.0),
        );

        if streaming {
            if ui.button("Stop").clicked() {
                actions.cancel = true;
            }
        } else if ui.button("Send").clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
        }
    });

    if send && !streaming {
        if let Some(message) = outgoing_text(input_text) {
            input_text.clear();
            actions.send = Some(message);
        }
    }

    actions
}
