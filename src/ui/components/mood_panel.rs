use eframe::egui;

use crate::mood::MoodCheckIn;
use crate::mood::checkin::{CHECK_IN_MOODS, MAX_CHECK_IN_INTENSITY};
use crate::mood::trends::entry_time_label;
use crate::ui::state::AppState;

/// Returns the check-in to submit when the user presses "Log mood".
pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> Option<MoodCheckIn> {
    let mut submitted = None;

    ui.heading("How are you feeling?");
    ui.separator();

    ui.horizontal_wrapped(|ui| {
        for mood in CHECK_IN_MOODS {
            let selected = state.check_in.mood == mood;
            if ui.selectable_label(selected, mood).clicked() {
                state.check_in.mood = mood.to_string();
            }
        }
    });
    ui.add(
        egui::Slider::new(&mut state.check_in.intensity, 1..=MAX_CHECK_IN_INTENSITY)
            .text("Intensity"),
    );
    ui.add(
        egui::TextEdit::multiline(&mut state.check_in.note)
            .hint_text("Anything you'd like to add? (optional)")
            .desired_rows(3),
    );
    if ui.button("Log mood").clicked() {
        submitted = Some(state.check_in.clone());
    }

    if let Some(notice) = &state.notice {
        ui.label(egui::RichText::new(notice).weak());
    }

    ui.separator();
    ui.heading("Trends");

    let trends = &state.trends;
    if trends.is_empty() {
        ui.label("No mood entries yet");
        return submitted;
    }

    ui.label(format!("Entries: {}", trends.total));
    ui.label(format!("Average intensity: {:.1}", trends.average_intensity));
    for (mood, count) in &trends.top_moods {
        ui.label(format!("{mood}: {count}"));
    }

    ui.separator();
    egui::ScrollArea::vertical()
        .id_salt("mood_points")
        .max_height(200.0)
        .show(ui, |ui| {
            for point in trends.points.iter().rev() {
                ui.horizontal(|ui| {
                    ui.label(format!("{} {}", point.label, point.mood));
                    let fraction = point.intensity as f32 / MAX_CHECK_IN_INTENSITY as f32;
                    ui.add(
                        egui::ProgressBar::new(fraction.clamp(0.0, 1.0))
                            .text(point.intensity.to_string()),
                    );
                });
            }
        });

    ui.separator();
    ui.label("Recent entries:");
    for entry in &trends.recent {
        ui.horizontal_wrapped(|ui| {
            ui.label(egui::RichText::new(&entry.mood).strong());
            ui.label(format!("{}/10", entry.intensity));
            ui.label(egui::RichText::new(entry_time_label(entry.created_at)).weak());
        });
        if let Some(note) = &entry.note {
            ui.label(egui::RichText::new(note).italics());
        }
    }

    submitted
}
