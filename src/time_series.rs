use chrono::NaiveDate;

/// One day of practice on the duration trend chart: day offset from the
/// start of the period on the x axis, total minutes practiced on the y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub day: f64,
    pub minutes: f64,
}

impl TrendPoint {
    pub fn new(day: f64, minutes: f64) -> Self {
        Self { day, minutes }
    }
}

impl From<(f64, f64)> for TrendPoint {
    fn from(v: (f64, f64)) -> Self {
        TrendPoint {
            day: v.0,
            minutes: v.1,
        }
    }
}

impl From<TrendPoint> for (f64, f64) {
    fn from(p: TrendPoint) -> Self {
        (p.day, p.minutes)
    }
}

/// Map dated per-day totals onto chart points, using the earliest date as
/// day zero. Input is expected sorted ascending by date, as the store
/// returns it.
pub fn trend_points(daily: &[(NaiveDate, u64)]) -> Vec<TrendPoint> {
    let Some(&(first, _)) = daily.first() else {
        return Vec::new();
    };
    daily
        .iter()
        .map(|&(date, secs)| {
            let day = (date - first).num_days() as f64;
            TrendPoint::new(day, secs as f64 / 60.0)
        })
        .collect()
}
