use chrono::{DateTime, Utc};

const MS_PER_HOUR: f64 = 3_600_000.0;

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    ((later - earlier).num_milliseconds() as f64 / MS_PER_HOUR).max(0.0)
}

/// Exponential half-life decay of an age in hours, in `[0.0, 1.0]`.
pub fn half_life_decay(age_hours: f64, half_life_hours: f64) -> f64 {
    if age_hours <= 0.0 {
        return 1.0;
    }
    0.5_f64.powf(age_hours / half_life_hours).clamp(0.0, 1.0)
}

/// Recency of something published at `at`, judged at `now`. Future timestamps count as fresh.
pub fn recency_decay(at: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f64 {
    half_life_decay(hours_between(at, now), half_life_hours)
}

/// 1.0 for a storyline first seen in this run, decaying the longer it persists.
pub fn novelty_signal(first_seen_at: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f64 {
    if first_seen_at >= now {
        return 1.0;
    }
    half_life_decay(hours_between(first_seen_at, now), half_life_hours)
}

/// Popularity relative to the run's maximum. Absent signals contribute zero.
pub fn normalized_popularity(signal: Option<f64>, run_max: f64) -> f64 {
    match signal {
        Some(p) if run_max > 0.0 && p.is_finite() => (p / run_max).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
