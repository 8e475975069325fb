use std::collections::HashMap;

use chrono::DateTime;

use crate::storage::models::MoodEntry;

const TOP_MOODS: usize = 3;
const RECENT_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    /// Day label such as `Mar 4`.
    pub label: String,
    pub intensity: i64,
    pub mood: String,
}

/// Summary shown in the mood panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoodTrends {
    pub total: usize,
    /// Mean intensity rounded to one decimal.
    pub average_intensity: f64,
    /// Most frequent moods with their counts, most frequent first.
    pub top_moods: Vec<(String, usize)>,
    /// Chronological series for the intensity chart.
    pub points: Vec<TrendPoint>,
    /// Latest stored entries, newest first.
    pub recent: Vec<MoodEntry>,
}

impl MoodTrends {
    /// `entries` must be in chronological order.
    pub fn from_entries(entries: &[MoodEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let sum: i64 = entries.iter().map(|entry| entry.intensity).sum();
        let average = sum as f64 / entries.len() as f64;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in entries {
            *counts.entry(entry.mood.as_str()).or_default() += 1;
        }
        let mut top_moods: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(mood, count)| (mood.to_string(), count))
            .collect();
        top_moods.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_moods.truncate(TOP_MOODS);

        let points = entries
            .iter()
            .map(|entry| TrendPoint {
                label: day_label(entry.created_at),
                intensity: entry.intensity,
                mood: entry.mood.clone(),
            })
            .collect();

        Self {
            total: entries.len(),
            average_intensity: (average * 10.0).round() / 10.0,
            top_moods,
            points,
            recent: entries.iter().rev().take(RECENT_ENTRIES).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Timestamp shown next to a recent entry, e.g. `Mar 4, 12:00 PM`.
pub fn entry_time_label(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|time| time.format("%b %-d, %-I:%M %p").to_string())
        .unwrap_or_default()
}

fn day_label(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|time| time.format("%b %-d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mood: &str, intensity: i64, created_at: i64) -> MoodEntry {
        MoodEntry {
            id: format!("{mood}-{created_at}"),
            session_id: None,
            mood: mood.to_string(),
            intensity,
            note: None,
            context: "ai-detected".to_string(),
            created_at,
        }
    }

    #[test]
    fn empty_history_has_no_trends() {
        let trends = MoodTrends::from_entries(&[]);
        assert!(trends.is_empty());
        assert!(trends.points.is_empty());
    }

    #[test]
    fn summarizes_intensity_and_frequency() {
        // 2024-03-04T12:00:00Z and one day later.
        let day = 86_400_000;
        let start = 1_709_553_600_000;
        let entries = vec![
            entry("sad", 2, start),
            entry("happy", 4, start + 1),
            entry("happy", 5, start + day),
            entry("calm", 3, start + day + 1),
            entry("anxious", 3, start + day + 2),
            entry("sad", 3, start + day + 3),
        ];

        let trends = MoodTrends::from_entries(&entries);
        assert_eq!(trends.total, 6);
        assert_eq!(trends.average_intensity, 3.3);
        assert_eq!(
            trends.top_moods,
            vec![
                ("happy".to_string(), 2),
                ("sad".to_string(), 2),
                ("anxious".to_string(), 1),
            ]
        );
        assert_eq!(trends.points[0].label, "Mar 4");
        assert_eq!(trends.points[2].label, "Mar 5");
        assert_eq!(trends.points[2].intensity, 5);
    }

    #[test]
    fn recent_entries_are_newest_first_and_capped() {
        let start = 1_709_553_600_000;
        let mut entries: Vec<MoodEntry> = (0..7)
            .map(|i| entry("neutral", i + 1, start + i * 60_000))
            .collect();
        entries[6].note = Some("after the walk".to_string());

        let trends = MoodTrends::from_entries(&entries);
        let intensities: Vec<i64> = trends.recent.iter().map(|e| e.intensity).collect();
        assert_eq!(intensities, vec![7, 6, 5, 4, 3]);
        assert_eq!(trends.recent[0].note.as_deref(), Some("after the walk"));
        assert_eq!(entry_time_label(trends.recent[4].created_at), "Mar 4, 12:02 PM");
    }
}
