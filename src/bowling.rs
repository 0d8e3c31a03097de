use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dataset::DeliveryStore;
use crate::delivery::{Delivery, Phase};
use crate::metrics;
use crate::sequence::{self, IntervalBucket, RateKind};
use crate::stats::{Analysis, Tally, top_by};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingSummary {
    pub matches: usize,
    pub deliveries: usize,
    /// Deliveries that were neither wides nor no-balls.
    pub legal_balls: usize,
    pub runs_conceded: u32,
    pub wickets: usize,
    pub economy: f64,
    pub average: f64,
    pub strike_rate: f64,
    pub dot_pct: f64,
}

impl BowlingSummary {
    /// Overs in cricket notation, e.g. `3.4`.
    pub fn overs_label(&self) -> String {
        format!("{}.{}", self.legal_balls / 6, self.legal_balls % 6)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingPhase {
    pub phase: Phase,
    pub legal_balls: usize,
    pub runs_conceded: u32,
    pub wickets: usize,
    pub economy: f64,
    pub dot_pct: f64,
    /// Wickets per 100 legal balls.
    pub wicket_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverEffectiveness {
    /// 1-based over number.
    pub over: u8,
    pub runs_conceded: u32,
    pub wickets: usize,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingInsights {
    pub setup_index: f64,
    /// Percent chance of a wicket in the next `horizon` balls.
    pub wicket_probability: f64,
    /// Percent chance of conceding a four or six in the next `horizon` balls.
    pub boundary_probability: f64,
    pub horizon: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlingProfile {
    pub bowler: String,
    pub summary: BowlingSummary,
    /// Always three rows, Powerplay, Middle, Death.
    pub phases: Vec<BowlingPhase>,
    pub bunnies: Vec<Tally>,
    pub smashers: Vec<Tally>,
    pub dismissal_methods: BTreeMap<String, usize>,
    pub favourite_opponents: Vec<Tally>,
    pub by_over: Vec<OverEffectiveness>,
    /// Six-ball spell buckets, first `Analysis::max_spell_overs` only.
    pub spell: Vec<IntervalBucket>,
    pub insights: BowlingInsights,
}

/// Headline bowling numbers over an arbitrary subset of one bowler's deliveries.
///
/// Only bowler-credited dismissals count as wickets. Dot balls are legal
/// deliveries that cost the bowler nothing, over the same `legal_balls`
/// denominator as economy.
pub fn bowling_summary(balls: &[&Delivery]) -> BowlingSummary {
    let runs_conceded: u32 = balls.iter().map(|d| d.bowler_runs()).sum();
    let legal_balls = balls.iter().filter(|d| d.is_legal_for_bowler()).count();
    let wickets = balls.iter().filter(|d| d.is_bowler_wicket()).count();
    BowlingSummary {
        matches: balls.iter().map(|d| d.match_id).collect::<HashSet<_>>().len(),
        deliveries: balls.len(),
        legal_balls,
        runs_conceded,
        wickets,
        economy: metrics::economy(runs_conceded, legal_balls),
        average: metrics::bowling_average(runs_conceded, wickets),
        strike_rate: metrics::bowling_strike_rate(legal_balls, wickets),
        dot_pct: metrics::dot_ball_pct(
            balls.iter().copied(),
            Delivery::is_legal_for_bowler,
            Delivery::bowler_runs,
        ),
    }
}

pub fn bowling_phases(balls: &[&Delivery]) -> Vec<BowlingPhase> {
    Phase::ALL
        .iter()
        .map(|&phase| {
            let in_phase: Vec<&Delivery> = balls
                .iter()
                .copied()
                .filter(|d| d.phase() == phase)
                .collect();
            let s = bowling_summary(&in_phase);
            BowlingPhase {
                phase,
                legal_balls: s.legal_balls,
                runs_conceded: s.runs_conceded,
                wickets: s.wickets,
                economy: s.economy,
                dot_pct: s.dot_pct,
                wicket_pct: metrics::percentage(s.wickets, s.legal_balls),
            }
        })
        .collect()
}

pub fn bowling_insights(balls: &[&Delivery], analysis: &Analysis) -> BowlingInsights {
    let legal = balls.iter().filter(|d| d.is_legal_for_bowler()).count();
    let wickets = balls.iter().filter(|d| d.is_bowler_wicket()).count();
    let boundaries = balls.iter().filter(|d| d.is_boundary()).count();
    BowlingInsights {
        setup_index: sequence::setup_index(
            balls,
            sequence::SETUP_LOOKBACK,
            analysis.setup_window,
        ),
        wicket_probability: metrics::projected_event_probability(wickets, legal, analysis.horizon),
        boundary_probability: metrics::projected_event_probability(
            boundaries,
            legal,
            analysis.horizon,
        ),
        horizon: analysis.horizon,
    }
}

impl DeliveryStore {
    /// Full bowling profile; `None` when the bowler never bowled a ball.
    pub fn bowling_profile(&self, bowler: &str, analysis: &Analysis) -> Option<BowlingProfile> {
        let balls = self.for_bowler(bowler);
        if balls.is_empty() {
            return None;
        }

        let mut bunnies: HashMap<&str, usize> = HashMap::new();
        let mut smashers: HashMap<&str, usize> = HashMap::new();
        let mut opponents: HashMap<&str, usize> = HashMap::new();
        let mut methods: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_over: BTreeMap<u8, (u32, usize, HashSet<u64>)> = BTreeMap::new();

        for d in &balls {
            *smashers.entry(d.batter.as_str()).or_default() += d.batsman_runs as usize;
            let slot = by_over.entry(d.over + 1).or_default();
            slot.0 += d.bowler_runs();
            slot.2.insert(d.match_id);
            if !d.is_bowler_wicket() {
                continue;
            }
            slot.1 += 1;
            if let Some(out) = d.player_dismissed.as_deref() {
                *bunnies.entry(out).or_default() += 1;
            }
            if let Some(kind) = &d.dismissal_kind {
                *methods.entry(kind.label().to_string()).or_default() += 1;
            }
            *opponents.entry(d.batting_team.as_str()).or_default() += 1;
        }

        let legal: Vec<&Delivery> = balls
            .iter()
            .copied()
            .filter(|d| d.is_legal_for_bowler())
            .collect();
        let mut spell = sequence::interval_buckets(
            &legal,
            sequence::BOWLING_SPELL_WINDOW,
            RateKind::Economy,
            Delivery::bowler_runs,
            Delivery::is_bowler_wicket,
        );
        spell.truncate(analysis.max_spell_overs);

        Some(BowlingProfile {
            bowler: bowler.to_string(),
            summary: bowling_summary(&balls),
            phases: bowling_phases(&balls),
            bunnies: top_by(bunnies, 5),
            smashers: top_by(smashers, 5),
            dismissal_methods: methods,
            favourite_opponents: top_by(opponents, 5),
            by_over: by_over
                .into_iter()
                .map(|(over, (runs, wickets, matches))| OverEffectiveness {
                    over,
                    runs_conceded: runs,
                    wickets,
                    matches: matches.len(),
                })
                .collect(),
            spell,
            insights: bowling_insights(&balls, analysis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::fixtures::*;
    use crate::delivery::{DismissalKind, ExtrasType};

    fn spell() -> Vec<Delivery> {
        let legbyes = Delivery {
            total_runs: 4,
            extras_type: Some(ExtrasType::LegByes),
            extra_runs: 4,
            ..ball("Gill", "Rashid", 2, 0)
        };
        sequence(vec![
            ball("Gill", "Rashid", 2, 0),
            ball("Gill", "Rashid", 2, 4),
            legbyes,
            wide("Gill", "Rashid", 2),
            no_ball("Gill", "Rashid", 2),
            ball("Gill", "Rashid", 2, 1),
            wicket("Pant", "Rashid", 2, DismissalKind::RunOut),
            wicket("Pant", "Rashid", 17, DismissalKind::Bowled),
        ])
    }

    #[test]
    fn summary_charges_only_bowler_runs() {
        let balls = spell();
        let refs: Vec<&Delivery> = balls.iter().collect();
        let s = bowling_summary(&refs);
        // 4 off the bat + wide + no-ball + single; leg byes are not charged
        assert_eq!(s.runs_conceded, 7);
        assert_eq!(s.legal_balls, 6);
        assert_eq!(s.wickets, 1);
        assert_eq!(s.economy, 7.0);
        assert_eq!(s.average, 7.0);
        assert_eq!(s.strike_rate, 6.0);
        assert_eq!(s.overs_label(), "1.0");
    }

    #[test]
    fn no_balls_stay_out_of_the_dot_denominator() {
        let mut balls: Vec<Delivery> = (0..6).map(|_| ball("Gill", "Rashid", 8, 0)).collect();
        balls.insert(3, no_ball("Gill", "Rashid", 8));
        let balls = sequence(balls);
        let refs: Vec<&Delivery> = balls.iter().collect();
        let s = bowling_summary(&refs);
        assert_eq!(s.legal_balls, 6);
        assert_eq!(s.runs_conceded, 1);
        assert_eq!(s.dot_pct, 100.0);
        let middle = &bowling_phases(&refs)[Phase::Middle.index()];
        assert_eq!(middle.dot_pct, 100.0);
    }

    #[test]
    fn wicketless_bowling_average_is_zero() {
        let balls = vec![ball("A", "B", 0, 6)];
        let refs: Vec<&Delivery> = balls.iter().collect();
        let s = bowling_summary(&refs);
        assert_eq!(s.average, 0.0);
        assert_eq!(s.strike_rate, 0.0);
    }

    #[test]
    fn phases_split_wickets() {
        let balls = spell();
        let refs: Vec<&Delivery> = balls.iter().collect();
        let phases = bowling_phases(&refs);
        assert_eq!(phases[0].wickets, 0);
        assert_eq!(phases[1].legal_balls, 0);
        assert_eq!(phases[1].economy, 0.0);
        assert_eq!(phases[2].wickets, 1);
        assert_eq!(phases[2].wicket_pct, 100.0);
    }

    #[test]
    fn profile_groups_dismissals() {
        let store = DeliveryStore::from_deliveries(spell());
        let profile = store
            .bowling_profile("Rashid", &Analysis::default())
            .expect("profile");
        assert_eq!(profile.bunnies.len(), 1);
        assert_eq!(profile.bunnies[0].name, "Pant");
        assert_eq!(profile.dismissal_methods.get("bowled"), Some(&1));
        assert!(!profile.dismissal_methods.contains_key("run out"));
        assert_eq!(profile.smashers[0].name, "Gill");
        assert_eq!(profile.by_over.len(), 2);
        assert_eq!(profile.by_over[1].over, 18);
        assert!(profile.spell.len() <= 4);
    }
}
