/// Format a duration in seconds as a HH:MM:SS clock string.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Whole minutes (floor), the way the history table displays duration.
pub fn whole_minutes(total_secs: u64) -> u64 {
    total_secs / 60
}

/// Format a duration in seconds as "M min S s" for save confirmations.
pub fn format_min_sec(total_secs: u64) -> String {
    format!("{} min {} s", total_secs / 60, total_secs % 60)
}

/// Format a duration in seconds as fractional hours with one decimal.
pub fn format_hours(total_secs: u64) -> String {
    format!("{:.1}", total_secs as f64 / 3600.0)
}

/// Truncate a notes string for table display, appending an ellipsis when
/// something was cut. Operates on characters, not bytes.
pub fn truncate_notes(notes: &str, max_chars: usize) -> String {
    let count = notes.chars().count();
    if count <= max_chars {
        notes.to_string()
    } else {
        let cut: String = notes.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
