//! Order-dependent metrics. Callers pass deliveries already sorted by
//! (match, over, ball), as `DeliveryStore` returns them.

use serde::{Deserialize, Serialize};

use crate::delivery::Delivery;
use crate::metrics;

pub const BATTING_PACE_WINDOW: usize = 10;
pub const BOWLING_SPELL_WINDOW: usize = 6;
pub const SETUP_LOOKBACK: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateKind {
    /// Runs per 100 balls.
    StrikeRate,
    /// Runs per 6 balls.
    Economy,
}

impl RateKind {
    fn rate(self, runs: u32, balls: usize) -> f64 {
        match self {
            RateKind::StrikeRate => metrics::strike_rate(runs, balls),
            RateKind::Economy => metrics::economy(runs, balls),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBucket {
    /// 1-based ball number (within a match) of the first ball in the window.
    pub first_ball: usize,
    pub last_ball: usize,
    pub balls: usize,
    pub runs: u32,
    pub boundaries: usize,
    pub wickets: usize,
    /// Strike rate or economy, depending on the `RateKind` used.
    pub rate: f64,
    /// `rate` minus the previous bucket's rate; 0 for the first bucket.
    pub momentum: f64,
    /// Boundaries per ball.
    pub aggression: f64,
    /// Boundaries per six balls.
    pub risk: f64,
}

/// Numbers each player's deliveries from 1 within every match, groups them
/// into windows of `window` balls and aggregates each window across matches.
pub fn interval_buckets<R, W>(
    deliveries: &[&Delivery],
    window: usize,
    kind: RateKind,
    runs: R,
    is_wicket: W,
) -> Vec<IntervalBucket>
where
    R: Fn(&Delivery) -> u32,
    W: Fn(&Delivery) -> bool,
{
    let window = window.max(1);
    let mut buckets: Vec<IntervalBucket> = Vec::new();
    let mut current_match: Option<u64> = None;
    let mut ball_no = 0usize;

    for d in deliveries {
        if current_match != Some(d.match_id) {
            current_match = Some(d.match_id);
            ball_no = 0;
        }
        ball_no += 1;
        let idx = (ball_no - 1) / window;
        while buckets.len() <= idx {
            let start = buckets.len() * window + 1;
            buckets.push(IntervalBucket {
                first_ball: start,
                last_ball: start + window - 1,
                balls: 0,
                runs: 0,
                boundaries: 0,
                wickets: 0,
                rate: 0.0,
                momentum: 0.0,
                aggression: 0.0,
                risk: 0.0,
            });
        }
        let bucket = &mut buckets[idx];
        bucket.balls += 1;
        bucket.runs += runs(d);
        if d.is_boundary() {
            bucket.boundaries += 1;
        }
        if is_wicket(d) {
            bucket.wickets += 1;
        }
    }

    let mut prev_rate: Option<f64> = None;
    for bucket in &mut buckets {
        bucket.rate = kind.rate(bucket.runs, bucket.balls);
        bucket.momentum = prev_rate.map(|p| bucket.rate - p).unwrap_or(0.0);
        bucket.aggression = metrics::ratio(bucket.boundaries, bucket.balls);
        bucket.risk = metrics::ratio(bucket.boundaries, bucket.balls) * 6.0;
        prev_rate = Some(bucket.rate);
    }
    buckets
}

/// Mean number of consecutive dot balls absorbed before each boundary.
///
/// Ones, twos and threes reset the streak without recording it. Returns 0
/// when no boundary was hit.
pub fn frustration_index<I>(runs: I) -> f64
where
    I: IntoIterator<Item = u32>,
{
    let mut recorded: Vec<usize> = Vec::new();
    let mut dots = 0usize;
    for r in runs {
        match r {
            0 => dots += 1,
            4 | 6 => {
                recorded.push(dots);
                dots = 0;
            }
            _ => dots = 0,
        }
    }
    if recorded.is_empty() {
        return 0.0;
    }
    recorded.iter().sum::<usize>() as f64 / recorded.len() as f64
}

/// How far back the setup-index window may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SetupWindow {
    /// Lookback is clipped only at the start of the bowler's data, so the
    /// first wicket of a match can see deliveries from the previous match.
    #[default]
    AcrossMatches,
    /// Lookback is clipped at the start of the wicket's match.
    WithinMatch,
}

/// Mean number of dot balls (no runs charged to the bowler) among the
/// `lookback` deliveries preceding each bowler-credited wicket.
pub fn setup_index(deliveries: &[&Delivery], lookback: usize, window: SetupWindow) -> f64 {
    let mut dots_before: Vec<usize> = Vec::new();
    for (i, d) in deliveries.iter().enumerate() {
        if !d.is_bowler_wicket() {
            continue;
        }
        let mut start = i.saturating_sub(lookback);
        if window == SetupWindow::WithinMatch {
            while start < i && deliveries[start].match_id != d.match_id {
                start += 1;
            }
        }
        let dots = deliveries[start..i]
            .iter()
            .filter(|p| p.bowler_runs() == 0)
            .count();
        dots_before.push(dots);
    }
    if dots_before.is_empty() {
        return 0.0;
    }
    dots_before.iter().sum::<usize>() as f64 / dots_before.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;
    use crate::delivery::fixtures::*;

    #[test]
    fn frustration_index_records_dots_before_boundaries() {
        let seq = [0, 0, 4, 0, 6, 1, 0, 0, 0, 4];
        assert_eq!(frustration_index(seq), 2.0);
        assert_eq!(frustration_index([1, 2, 0, 0]), 0.0);
        assert_eq!(frustration_index(std::iter::empty()), 0.0);
    }

    #[test]
    fn first_bucket_has_zero_momentum() {
        let balls: Vec<_> = (0..25)
            .map(|i| ball("A", "B", (i / 6) as u8, if i < 10 { 1 } else { 2 }))
            .collect();
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let buckets = interval_buckets(
            &refs,
            BATTING_PACE_WINDOW,
            RateKind::StrikeRate,
            |d| d.batsman_runs,
            |d| d.is_wicket,
        );
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].momentum, 0.0);
        assert_eq!(buckets[0].rate, 100.0);
        assert_eq!(buckets[1].rate, 200.0);
        assert_eq!(buckets[1].momentum, 100.0);
        assert_eq!(buckets[2].balls, 5);
        assert_eq!((buckets[2].first_ball, buckets[2].last_ball), (21, 30));
    }

    #[test]
    fn ball_numbering_restarts_each_match() {
        let mut balls: Vec<_> = (0..8).map(|_| ball("A", "B", 0, 6)).collect();
        for d in balls.iter_mut().skip(4) {
            d.match_id = 2;
        }
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let buckets = interval_buckets(&refs, 6, RateKind::Economy, |d| d.bowler_runs(), |_| false);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].balls, 8);
        assert_eq!(buckets[0].rate, 36.0);
        assert_eq!(buckets[0].risk, 6.0);
    }

    #[test]
    fn setup_index_looks_back_six_balls() {
        let mut balls = vec![
            ball("A", "B", 0, 1),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 4),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 0),
        ];
        balls.push(wicket("A", "B", 1, DismissalKind::Bowled));
        balls.push(wicket("C", "B", 1, DismissalKind::Caught));
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        // both windows hold a single scoring shot (the four); the first
        // wicket ball counts as a dot inside the second window
        assert_eq!(
            setup_index(&refs, SETUP_LOOKBACK, SetupWindow::AcrossMatches),
            5.0
        );
    }

    #[test]
    fn setup_index_window_modes_differ_at_match_start() {
        let mut balls = vec![
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 0),
        ];
        let mut w = wicket("A", "B", 0, DismissalKind::Lbw);
        w.match_id = 2;
        balls.push(w);
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        assert_eq!(setup_index(&refs, 6, SetupWindow::AcrossMatches), 3.0);
        assert_eq!(setup_index(&refs, 6, SetupWindow::WithinMatch), 0.0);
    }

    #[test]
    fn setup_index_ignores_run_outs() {
        let balls = sequence(vec![
            ball("A", "B", 0, 0),
            wicket("A", "B", 0, DismissalKind::RunOut),
        ]);
        let refs: Vec<&Delivery> = balls.iter().collect();
        assert_eq!(setup_index(&refs, 6, SetupWindow::AcrossMatches), 0.0);
    }
}
