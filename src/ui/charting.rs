/// Compute X (days) and Y (minutes) bounds for the duration trend chart
pub fn trend_bounds(points: &[(f64, f64)], period_days: u32) -> (f64, f64) {
    let mut highest_minutes = 0.0;
    for &(_, minutes) in points {
        if minutes > highest_minutes {
            highest_minutes = minutes;
        }
    }

    let mut last_day = match points.last() {
        Some(p) => p.0,
        None => period_days.saturating_sub(1) as f64,
    };
    if last_day < 1.0 {
        last_day = 1.0;
    }

    (last_day, highest_minutes.round().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
