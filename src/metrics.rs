//! Rate and ratio statistics. Every function states its zero-denominator value.

use crate::delivery::Delivery;

/// Runs per 100 legal balls; 0 when no legal balls.
pub fn strike_rate(runs: u32, legal_balls: usize) -> f64 {
    if legal_balls == 0 {
        return 0.0;
    }
    runs as f64 / legal_balls as f64 * 100.0
}

/// Runs per dismissal; the total runs when never dismissed.
pub fn batting_average(runs: u32, dismissals: usize) -> f64 {
    if dismissals == 0 {
        return runs as f64;
    }
    runs as f64 / dismissals as f64
}

/// Runs conceded per wicket; 0 when wicketless.
pub fn bowling_average(runs_conceded: u32, wickets: usize) -> f64 {
    if wickets == 0 {
        return 0.0;
    }
    runs_conceded as f64 / wickets as f64
}

/// Balls per wicket; 0 when wicketless.
pub fn bowling_strike_rate(legal_balls: usize, wickets: usize) -> f64 {
    if wickets == 0 {
        return 0.0;
    }
    legal_balls as f64 / wickets as f64
}

/// Runs conceded per six legal balls; 0 when no legal balls.
pub fn economy(runs_conceded: u32, legal_balls: usize) -> f64 {
    if legal_balls == 0 {
        return 0.0;
    }
    runs_conceded as f64 / (legal_balls as f64 / 6.0)
}

/// `part / whole * 100`; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// `part / whole`; 0 when `whole` is 0.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

/// Chance, in percent, of at least one event in `horizon` independent balls.
pub fn event_probability(per_ball: f64, horizon: u32) -> f64 {
    let p = per_ball.clamp(0.0, 1.0);
    let n = i32::try_from(horizon).unwrap_or(i32::MAX);
    (1.0 - (1.0 - p).powi(n)) * 100.0
}

/// Per-ball rate `events / balls` projected over `horizon` balls; 0 when no balls.
pub fn projected_event_probability(events: usize, balls: usize, horizon: u32) -> f64 {
    event_probability(ratio(events, balls), horizon)
}

/// Dot-ball percentage over the balls `is_legal` accepts. `runs` picks the run
/// column (off the bat for batters, charged runs for bowlers).
pub fn dot_ball_pct<'a, I, L, F>(deliveries: I, is_legal: L, runs: F) -> f64
where
    I: IntoIterator<Item = &'a Delivery>,
    L: Fn(&Delivery) -> bool,
    F: Fn(&Delivery) -> u32,
{
    let mut legal = 0usize;
    let mut dots = 0usize;
    for d in deliveries {
        if !is_legal(d) {
            continue;
        }
        legal += 1;
        if runs(d) == 0 {
            dots += 1;
        }
    }
    percentage(dots, legal)
}

/// Boundary percentage over batter-legal balls.
pub fn boundary_pct<'a, I>(deliveries: I) -> f64
where
    I: IntoIterator<Item = &'a Delivery>,
{
    let mut legal = 0usize;
    let mut boundaries = 0usize;
    for d in deliveries {
        if d.is_wide() {
            continue;
        }
        legal += 1;
        if d.is_boundary() {
            boundaries += 1;
        }
    }
    percentage(boundaries, legal)
}
