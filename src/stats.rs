use chrono::{Duration, NaiveDate};

/// Aggregates for sessions dated today.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TodayStats {
    pub count: u64,
    pub duration_secs: u64,
    pub avg_pause: f64,
}

/// Aggregates over a trailing period of days.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodStats {
    pub total_duration_secs: u64,
    pub total_count: u64,
    pub avg_pause: f64,
    pub consecutive_days: u32,
}

/// One slice of the practice-type distribution chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeShare {
    pub practice_type: String,
    pub count: u64,
    pub percent: f64,
}

/// Round to one decimal, the precision the stat cards display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Length of the practice streak ending today: walking the distinct session
/// dates newest first, the streak grows while dates[i] == today - i days and
/// breaks at the first gap. A streak that does not include today is 0.
pub fn consecutive_days(dates_desc: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    for (i, &date) in dates_desc.iter().enumerate() {
        let expected = today - Duration::days(i as i64);
        if date != expected {
            break;
        }
        streak += 1;
    }
    streak
}

/// Attach percentages to raw per-type counts.
pub fn type_shares(counts: &[(String, u64)]) -> Vec<TypeShare> {
    let total: u64 = counts.iter().map(|(_, c)| c).sum();
    counts
        .iter()
        .map(|(practice_type, count)| {
            let percent = if total == 0 {
                0.0
            } else {
                round1(*count as f64 * 100.0 / total as f64)
            };
            TypeShare {
                practice_type: practice_type.clone(),
                count: *count,
                percent,
            }
        })
        .collect()
}
