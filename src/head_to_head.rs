use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::batting::{self, BattingInsights, BattingPhase, BattingSummary};
use crate::dataset::DeliveryStore;
use crate::delivery::Delivery;
use crate::metrics;
use crate::stats::Analysis;

pub const BUNNY_DISMISSALS: usize = 3;
pub const DOMINANT_STRIKE_RATE: f64 = 170.0;
pub const CONTAINED_STRIKE_RATE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Bunny,
    Dominant,
    Contained,
    EvenContest,
}

impl Verdict {
    /// First matching rule wins: dismissals, then high strike rate, then low.
    pub fn from_stats(dismissals: usize, strike_rate: f64) -> Self {
        if dismissals >= BUNNY_DISMISSALS {
            Verdict::Bunny
        } else if strike_rate > DOMINANT_STRIKE_RATE {
            Verdict::Dominant
        } else if strike_rate < CONTAINED_STRIKE_RATE {
            Verdict::Contained
        } else {
            Verdict::EvenContest
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Bunny => "bunny",
            Verdict::Dominant => "dominant",
            Verdict::Contained => "contained",
            Verdict::EvenContest => "even contest",
        }
    }

    pub fn describe(self, batter: &str, bowler: &str) -> String {
        match self {
            Verdict::Bunny => format!("{batter} is {bowler}'s bunny"),
            Verdict::Dominant => format!("{batter} dominates {bowler}"),
            Verdict::Contained => format!("{bowler} keeps {batter} quiet"),
            Verdict::EvenContest => "an evenly matched contest".to_string(),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallClass {
    Wicket,
    Six,
    Four,
    Dot,
    Runs,
}

impl BallClass {
    fn of(d: &Delivery) -> Self {
        if d.is_wicket {
            BallClass::Wicket
        } else {
            match d.batsman_runs {
                6 => BallClass::Six,
                4 => BallClass::Four,
                0 => BallClass::Dot,
                _ => BallClass::Runs,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineBall {
    /// 1-based position across every meeting of the pair.
    pub seq: usize,
    pub match_id: u64,
    pub runs: u32,
    pub cumulative_runs: u32,
    pub wicket: bool,
    pub class: BallClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Runs(u32),
    Wicket,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Runs(r) => write!(f, "{r}"),
            Outcome::Wicket => f.write_str("W"),
        }
    }
}

/// Columns of the outcome grid.
pub const GRID_OUTCOMES: [Outcome; 7] = [
    Outcome::Runs(0),
    Outcome::Runs(1),
    Outcome::Runs(2),
    Outcome::Runs(3),
    Outcome::Runs(4),
    Outcome::Runs(6),
    Outcome::Wicket,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeShare {
    pub outcome: Outcome,
    pub count: usize,
    /// Percent of legal balls.
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub bowler: String,
    pub legal_balls: usize,
    pub strike_rate: f64,
    pub boundary_pct: f64,
    pub wicket_pct: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerScatter {
    pub batter: String,
    pub points: Vec<ScatterPoint>,
    pub mean_boundary_pct: f64,
    pub mean_wicket_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    /// 1-based meeting number.
    pub seq: usize,
    pub match_id: u64,
    pub runs: u32,
    pub legal_balls: usize,
    pub strike_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupReport {
    pub batter: String,
    pub bowler: String,
    pub summary: BattingSummary,
    pub phases: Vec<BattingPhase>,
    pub insights: BattingInsights,
    pub verdict: Verdict,
    pub timeline: Vec<TimelineBall>,
    pub scoring: BTreeMap<u32, usize>,
    pub outcome_grid: Vec<OutcomeShare>,
    pub consistency: Vec<Meeting>,
    pub scatter: BowlerScatter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeadToHead {
    /// The pair never met; the scatter still describes the batter.
    NoData {
        batter: String,
        bowler: String,
        scatter: BowlerScatter,
    },
    Found(Box<MatchupReport>),
}

impl HeadToHead {
    pub fn report(&self) -> Option<&MatchupReport> {
        match self {
            HeadToHead::Found(report) => Some(report),
            HeadToHead::NoData { .. } => None,
        }
    }
}

pub fn timeline(balls: &[&Delivery]) -> Vec<TimelineBall> {
    let mut total = 0u32;
    balls
        .iter()
        .enumerate()
        .map(|(i, d)| {
            total += d.batsman_runs;
            TimelineBall {
                seq: i + 1,
                match_id: d.match_id,
                runs: d.batsman_runs,
                cumulative_runs: total,
                wicket: d.is_wicket,
                class: BallClass::of(d),
            }
        })
        .collect()
}

pub fn outcome_grid(balls: &[&Delivery]) -> Vec<OutcomeShare> {
    let legal: Vec<&Delivery> = balls
        .iter()
        .copied()
        .filter(|d| d.is_legal_for_batter())
        .collect();
    GRID_OUTCOMES
        .iter()
        .map(|&outcome| {
            let count = legal
                .iter()
                .filter(|d| match outcome {
                    Outcome::Runs(r) => d.batsman_runs == r,
                    Outcome::Wicket => d.is_wicket,
                })
                .count();
            OutcomeShare {
                outcome,
                count,
                pct: metrics::percentage(count, legal.len()),
            }
        })
        .collect()
}

/// Per-match runs and strike rate, in the order the pair met.
pub fn consistency(balls: &[&Delivery]) -> Vec<Meeting> {
    let mut meetings: Vec<Meeting> = Vec::new();
    for d in balls {
        if meetings.last().is_none_or(|m| m.match_id != d.match_id) {
            meetings.push(Meeting {
                seq: meetings.len() + 1,
                match_id: d.match_id,
                runs: 0,
                legal_balls: 0,
                strike_rate: 0.0,
            });
        }
        if let Some(m) = meetings.last_mut() {
            m.runs += d.batsman_runs;
            if d.is_legal_for_batter() {
                m.legal_balls += 1;
            }
        }
    }
    for m in &mut meetings {
        m.strike_rate = metrics::strike_rate(m.runs, m.legal_balls);
    }
    meetings
}

impl DeliveryStore {
    /// Boundary and wicket rates of `batter` against every bowler faced for
    /// more than `analysis.min_scatter_balls` legal balls.
    pub fn bowler_scatter(&self, batter: &str, selected: &str, analysis: &Analysis) -> BowlerScatter {
        let opponents = self.opponents_of(batter);
        let points: Vec<ScatterPoint> = opponents
            .par_iter()
            .filter_map(|bowler| {
                let balls = self.for_pair(batter, bowler);
                let legal = balls.iter().filter(|d| d.is_legal_for_batter()).count();
                if legal <= analysis.min_scatter_balls {
                    return None;
                }
                let runs: u32 = balls.iter().map(|d| d.batsman_runs).sum();
                let boundaries = balls
                    .iter()
                    .filter(|d| d.is_legal_for_batter() && d.is_boundary())
                    .count();
                let wickets = balls.iter().filter(|d| d.is_wicket).count();
                Some(ScatterPoint {
                    bowler: bowler.clone(),
                    legal_balls: legal,
                    strike_rate: metrics::strike_rate(runs, legal),
                    boundary_pct: metrics::percentage(boundaries, legal),
                    wicket_pct: metrics::percentage(wickets, legal),
                    selected: bowler == selected,
                })
            })
            .collect();

        let n = points.len();
        let mean = |f: fn(&ScatterPoint) -> f64| {
            if n == 0 {
                0.0
            } else {
                points.iter().map(f).sum::<f64>() / n as f64
            }
        };
        BowlerScatter {
            batter: batter.to_string(),
            mean_boundary_pct: mean(|p| p.boundary_pct),
            mean_wicket_pct: mean(|p| p.wicket_pct),
            points,
        }
    }

    pub fn head_to_head(&self, batter: &str, bowler: &str, analysis: &Analysis) -> HeadToHead {
        let balls = self.for_pair(batter, bowler);
        let scatter = self.bowler_scatter(batter, bowler, analysis);
        if balls.is_empty() {
            return HeadToHead::NoData {
                batter: batter.to_string(),
                bowler: bowler.to_string(),
                scatter,
            };
        }

        let summary = batting::batting_summary(&balls);
        let mut scoring: BTreeMap<u32, usize> = BTreeMap::new();
        for d in &balls {
            *scoring.entry(d.batsman_runs).or_default() += 1;
        }

        HeadToHead::Found(Box::new(MatchupReport {
            batter: batter.to_string(),
            bowler: bowler.to_string(),
            verdict: Verdict::from_stats(summary.dismissals, summary.strike_rate),
            phases: batting::batting_phases(&balls),
            insights: batting::batting_insights(batter, &balls, analysis.horizon),
            timeline: timeline(&balls),
            scoring,
            outcome_grid: outcome_grid(&balls),
            consistency: consistency(&balls),
            summary,
            scatter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;
    use crate::delivery::fixtures::*;

    #[test]
    fn verdict_priority() {
        assert_eq!(Verdict::from_stats(3, 140.0), Verdict::Bunny);
        assert_eq!(Verdict::from_stats(3, 250.0), Verdict::Bunny);
        assert_eq!(Verdict::from_stats(2, 170.5), Verdict::Dominant);
        assert_eq!(Verdict::from_stats(2, 170.0), Verdict::EvenContest);
        assert_eq!(Verdict::from_stats(0, 99.9), Verdict::Contained);
        assert_eq!(Verdict::from_stats(0, 100.0), Verdict::EvenContest);
    }

    #[test]
    fn timeline_accumulates_runs() {
        let balls = sequence(vec![
            ball("A", "B", 0, 4),
            ball("A", "B", 0, 0),
            ball("A", "B", 0, 6),
            wicket("A", "B", 0, DismissalKind::Caught),
        ]);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let tl = timeline(&refs);
        let totals: Vec<u32> = tl.iter().map(|t| t.cumulative_runs).collect();
        assert_eq!(totals, vec![4, 4, 10, 10]);
        assert_eq!(tl[2].class, BallClass::Six);
        assert_eq!(tl[3].class, BallClass::Wicket);
    }

    #[test]
    fn outcome_grid_ignores_wides() {
        let balls = sequence(vec![
            ball("A", "B", 0, 1),
            wide("A", "B", 0),
            ball("A", "B", 0, 4),
            ball("A", "B", 0, 1),
            wicket("A", "B", 0, DismissalKind::Bowled),
        ]);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let grid = outcome_grid(&refs);
        assert_eq!(grid.len(), 7);
        assert_eq!(grid[1].count, 2);
        assert_eq!(grid[1].pct, 50.0);
        // the wicket ball scored nothing, so it is also a dot
        assert_eq!(grid[0].count, 1);
        assert_eq!(grid[6].outcome, Outcome::Wicket);
        assert_eq!(grid[6].pct, 25.0);
    }

    #[test]
    fn consistency_splits_meetings() {
        let mut balls = vec![ball("A", "B", 0, 2), ball("A", "B", 0, 2)];
        let mut later = ball("A", "B", 0, 3);
        later.match_id = 7;
        balls.push(later);
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let meetings = consistency(&refs);
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].runs, 4);
        assert_eq!(meetings[0].strike_rate, 200.0);
        assert_eq!((meetings[1].seq, meetings[1].match_id), (2, 7));
    }

    #[test]
    fn unmet_pair_has_no_data() {
        let store = DeliveryStore::from_deliveries(vec![ball("A", "B", 0, 1)]);
        let h2h = store.head_to_head("A", "Z", &Analysis::default());
        assert!(matches!(h2h, HeadToHead::NoData { .. }));
        assert!(h2h.report().is_none());
    }
}
