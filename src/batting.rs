use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dataset::DeliveryStore;
use crate::delivery::{Delivery, Phase};
use crate::metrics;
use crate::sequence::{self, IntervalBucket, RateKind};
use crate::stats::{Analysis, Tally, top_by};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingSummary {
    pub matches: usize,
    pub runs: u32,
    pub legal_balls: usize,
    pub dismissals: usize,
    pub boundaries: usize,
    pub fours: usize,
    pub sixes: usize,
    pub strike_rate: f64,
    pub average: f64,
    pub dot_pct: f64,
    pub boundary_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingPhase {
    pub phase: Phase,
    pub runs: u32,
    pub legal_balls: usize,
    pub fours: usize,
    pub sixes: usize,
    pub strike_rate: f64,
    pub dot_pct: f64,
    pub boundary_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingInsights {
    pub frustration_index: f64,
    /// Percent chance of a four or six in the next `horizon` balls.
    pub boundary_probability: f64,
    /// Percent chance of being dismissed in the next `horizon` balls.
    pub wicket_probability: f64,
    pub horizon: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattingProfile {
    pub batter: String,
    pub summary: BattingSummary,
    /// Always three rows, Powerplay, Middle, Death.
    pub phases: Vec<BattingPhase>,
    /// Count of deliveries by runs off the bat (0..=6).
    pub scoring: BTreeMap<u32, usize>,
    /// Runs per match in match order.
    pub match_runs: Vec<(u64, u32)>,
    pub favourite_bowlers: Vec<Tally>,
    pub kryptonite: Vec<Tally>,
    pub favourite_teams: Vec<Tally>,
    pub pacing: Vec<IntervalBucket>,
    /// Dismissals per over number, 1-based.
    pub dismissals_by_over: BTreeMap<u8, usize>,
    pub insights: BattingInsights,
}

/// Headline numbers over an arbitrary delivery subset faced by one batter.
///
/// Dismissals use the raw wicket flag, so run-outs count here.
pub fn batting_summary(balls: &[&Delivery]) -> BattingSummary {
    let runs: u32 = balls.iter().map(|d| d.batsman_runs).sum();
    let legal_balls = balls.iter().filter(|d| d.is_legal_for_batter()).count();
    let dismissals = balls.iter().filter(|d| d.is_wicket).count();
    let fours = balls.iter().filter(|d| d.batsman_runs == 4).count();
    let sixes = balls.iter().filter(|d| d.batsman_runs == 6).count();
    let matches = balls.iter().map(|d| d.match_id).collect::<HashSet<_>>().len();

    BattingSummary {
        matches,
        runs,
        legal_balls,
        dismissals,
        boundaries: fours + sixes,
        fours,
        sixes,
        strike_rate: metrics::strike_rate(runs, legal_balls),
        average: metrics::batting_average(runs, dismissals),
        dot_pct: metrics::dot_ball_pct(
            balls.iter().copied(),
            Delivery::is_legal_for_batter,
            |d| d.batsman_runs,
        ),
        boundary_pct: metrics::boundary_pct(balls.iter().copied()),
    }
}

pub fn batting_phases(balls: &[&Delivery]) -> Vec<BattingPhase> {
    Phase::ALL
        .iter()
        .map(|&phase| {
            let in_phase: Vec<&Delivery> = balls
                .iter()
                .copied()
                .filter(|d| d.phase() == phase)
                .collect();
            let legal: Vec<&Delivery> = in_phase
                .iter()
                .copied()
                .filter(|d| d.is_legal_for_batter())
                .collect();
            let runs: u32 = legal.iter().map(|d| d.batsman_runs).sum();
            BattingPhase {
                phase,
                runs,
                legal_balls: legal.len(),
                fours: in_phase.iter().filter(|d| d.batsman_runs == 4).count(),
                sixes: in_phase.iter().filter(|d| d.batsman_runs == 6).count(),
                strike_rate: metrics::strike_rate(runs, legal.len()),
                dot_pct: metrics::dot_ball_pct(
                    in_phase.iter().copied(),
                    Delivery::is_legal_for_batter,
                    |d| d.batsman_runs,
                ),
                boundary_pct: metrics::boundary_pct(in_phase.iter().copied()),
            }
        })
        .collect()
}

pub fn batting_insights(batter: &str, balls: &[&Delivery], horizon: u32) -> BattingInsights {
    let legal: Vec<&Delivery> = balls
        .iter()
        .copied()
        .filter(|d| d.is_legal_for_batter())
        .collect();
    let boundaries = legal.iter().filter(|d| d.is_boundary()).count();
    // non-striker run-outs are excluded: the dismissed player must be this batter
    let own_wickets = balls
        .iter()
        .filter(|d| d.is_wicket && d.player_dismissed.as_deref() == Some(batter))
        .count();

    BattingInsights {
        frustration_index: sequence::frustration_index(legal.iter().map(|d| d.batsman_runs)),
        boundary_probability: metrics::projected_event_probability(
            boundaries,
            legal.len(),
            horizon,
        ),
        wicket_probability: metrics::projected_event_probability(
            own_wickets,
            legal.len(),
            horizon,
        ),
        horizon,
    }
}

impl DeliveryStore {
    /// Full batting profile; `None` when the batter never faced a ball.
    pub fn batting_profile(&self, batter: &str, analysis: &Analysis) -> Option<BattingProfile> {
        let balls = self.for_batter(batter);
        if balls.is_empty() {
            return None;
        }

        let mut scoring: BTreeMap<u32, usize> = BTreeMap::new();
        for d in &balls {
            *scoring.entry(d.batsman_runs).or_default() += 1;
        }

        let mut match_runs: Vec<(u64, u32)> = Vec::new();
        for d in &balls {
            match match_runs.last_mut() {
                Some((id, runs)) if *id == d.match_id => *runs += d.batsman_runs,
                _ => match_runs.push((d.match_id, d.batsman_runs)),
            }
        }

        let mut runs_by_bowler: HashMap<&str, usize> = HashMap::new();
        let mut runs_by_team: HashMap<&str, usize> = HashMap::new();
        let mut wickets_by_bowler: HashMap<&str, usize> = HashMap::new();
        let mut dismissals_by_over: BTreeMap<u8, usize> = BTreeMap::new();
        for d in &balls {
            *runs_by_bowler.entry(d.bowler.as_str()).or_default() += d.batsman_runs as usize;
            *runs_by_team.entry(d.bowling_team.as_str()).or_default() +=
                d.batsman_runs as usize;
            if d.is_bowler_wicket() {
                *wickets_by_bowler.entry(d.bowler.as_str()).or_default() += 1;
            }
            if d.is_wicket {
                *dismissals_by_over.entry(d.over + 1).or_default() += 1;
            }
        }

        let legal: Vec<&Delivery> = balls
            .iter()
            .copied()
            .filter(|d| d.is_legal_for_batter())
            .collect();
        let pacing = sequence::interval_buckets(
            &legal,
            sequence::BATTING_PACE_WINDOW,
            RateKind::StrikeRate,
            |d| d.batsman_runs,
            |d| d.is_wicket,
        );

        Some(BattingProfile {
            batter: batter.to_string(),
            summary: batting_summary(&balls),
            phases: batting_phases(&balls),
            scoring,
            match_runs,
            favourite_bowlers: top_by(runs_by_bowler, 3),
            kryptonite: top_by(wickets_by_bowler, 3),
            favourite_teams: top_by(runs_by_team, 3),
            pacing,
            dismissals_by_over,
            insights: batting_insights(batter, &balls, analysis.horizon),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;
    use crate::delivery::fixtures::*;

    fn store() -> DeliveryStore {
        let mut balls = vec![
            ball("Kohli", "Bumrah", 0, 0),
            ball("Kohli", "Bumrah", 0, 4),
            wide("Kohli", "Bumrah", 0),
            ball("Kohli", "Bumrah", 1, 1),
            ball("Kohli", "Chahal", 8, 6),
            ball("Kohli", "Chahal", 8, 0),
            wicket("Kohli", "Chahal", 8, DismissalKind::Stumped),
        ];
        balls = sequence(balls);
        DeliveryStore::from_deliveries(balls)
    }

    #[test]
    fn summary_excludes_wides_from_balls_faced() {
        let store = store();
        let balls = store.for_batter("Kohli");
        let s = batting_summary(&balls);
        assert_eq!(s.runs, 11);
        assert_eq!(s.legal_balls, 6);
        assert_eq!(s.dismissals, 1);
        assert_eq!(s.boundaries, 2);
        assert!((s.strike_rate - 11.0 / 6.0 * 100.0).abs() < 1e-9);
        assert_eq!(s.average, 11.0);
        assert_eq!(s.dot_pct, 50.0);
    }

    #[test]
    fn phases_are_ordered_and_zero_filled() {
        let store = store();
        let phases = batting_phases(&store.for_batter("Kohli"));
        let order: Vec<Phase> = phases.iter().map(|p| p.phase).collect();
        assert_eq!(order, Phase::ALL.to_vec());
        let death = &phases[2];
        assert_eq!(death.legal_balls, 0);
        assert_eq!(death.strike_rate, 0.0);
        assert_eq!(death.dot_pct, 0.0);
        assert_eq!(phases[0].runs, 5);
        assert_eq!(phases[0].legal_balls, 3);
    }

    #[test]
    fn profile_collects_matchups() {
        let store = store();
        let profile = store
            .batting_profile("Kohli", &Analysis::default())
            .expect("profile");
        assert_eq!(profile.favourite_bowlers[0].name, "Chahal");
        assert_eq!(profile.favourite_bowlers[1].value, 5);
        assert_eq!(profile.kryptonite[0].name, "Chahal");
        assert_eq!(profile.dismissals_by_over.get(&9), Some(&1));
        assert_eq!(profile.pacing[0].momentum, 0.0);
        assert_eq!(profile.scoring.get(&0), Some(&4));
        assert!(store.batting_profile("Nobody", &Analysis::default()).is_none());
    }
}
