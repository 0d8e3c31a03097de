//! Feature vector fed to the outcome model: encoder vectors for the
//! categorical inputs followed by the live numeric match state.

use serde::{Deserialize, Serialize};

use crate::encoding::{self, Category, EncodingTable};
use crate::error::Result;
use crate::metrics;
use crate::predictor::BallOutcome;

/// Block name and width, in vector order.
pub const FEATURE_LAYOUT: [(&str, usize); 45] = [
    ("venue", 8),
    ("batting_team", 7),
    ("bowling_team", 7),
    ("innings_type", 2),
    ("striker", 12),
    ("bowler", 11),
    ("non_striker", 12),
    ("super_over", 2),
    ("batting_experience", 2),
    ("bowling_experience", 2),
    ("over", 1),
    ("curr_score", 1),
    ("curr_wickets", 1),
    ("current_run_rate", 1),
    ("req_run_rate", 1),
    ("batsman_score", 1),
    ("balls_faced_batsman", 1),
    ("batsman_strike_rate", 1),
    ("runs_conceded_by_bowler", 1),
    ("balls_bowled_bowler", 1),
    ("wickets_by_bowler", 1),
    ("bowler_economy", 1),
    ("batsman_prop0", 1),
    ("batsman_prop1", 1),
    ("batsman_prop2", 1),
    ("batsman_prop3", 1),
    ("batsman_prop4", 1),
    ("batsman_prop5", 1),
    ("batsman_prop6", 1),
    ("batsman_prop7", 1),
    ("bowler_prop0", 1),
    ("bowler_prop1", 1),
    ("bowler_prop2", 1),
    ("bowler_prop3", 1),
    ("bowler_prop4", 1),
    ("bowler_prop5", 1),
    ("bowler_prop6", 1),
    ("bowler_prop7", 1),
    ("bowler_prop8", 1),
    ("explosivity", 1),
    ("running_rating", 1),
    ("power_play_rating", 1),
    ("end_over_explosivity", 1),
    ("wicket_taking_rating", 1),
    ("bowling_consistency_rating", 1),
];

pub fn feature_width() -> usize {
    FEATURE_LAYOUT.iter().map(|(_, w)| w).sum()
}

/// Running numbers for a batter within the current innings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatterTally {
    pub runs: u32,
    pub balls: u32,
    /// Balls faced by runs scored; dismissals count as 0.
    pub outcomes: [u32; 8],
    pub out: bool,
}

impl BatterTally {
    pub fn record(&mut self, outcome: BallOutcome) {
        self.balls += 1;
        self.runs += outcome.runs();
        let slot = (outcome.runs() as usize).min(7);
        self.outcomes[slot] += 1;
        if outcome.is_wicket() {
            self.out = true;
        }
    }

    pub fn strike_rate(&self) -> f64 {
        metrics::strike_rate(self.runs, self.balls as usize)
    }

    pub fn proportions(&self) -> [f64; 8] {
        self.outcomes
            .map(|n| metrics::ratio(n as usize, self.balls as usize))
    }
}

/// Running numbers for a bowler within the current innings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BowlerTally {
    pub runs: u32,
    pub balls: u32,
    pub wickets: u32,
    /// Balls bowled by outcome; slot 8 is the wicket.
    pub outcomes: [u32; 9],
}

impl BowlerTally {
    pub fn record(&mut self, outcome: BallOutcome) {
        self.balls += 1;
        self.runs += outcome.runs();
        let slot = match outcome {
            BallOutcome::Wicket => {
                self.wickets += 1;
                8
            }
            BallOutcome::Runs(r) => (r as usize).min(7),
        };
        self.outcomes[slot] += 1;
    }

    pub fn economy(&self) -> f64 {
        metrics::economy(self.runs, self.balls as usize)
    }

    pub fn proportions(&self) -> [f64; 9] {
        self.outcomes
            .map(|n| metrics::ratio(n as usize, self.balls as usize))
    }

    /// `overs.balls` notation.
    pub fn overs_label(&self) -> String {
        format!("{}.{}", self.balls / 6, self.balls % 6)
    }
}

/// Everything the encoder needs to describe the next ball.
#[derive(Debug, Clone)]
pub struct BallContext<'a> {
    pub venue: &'a str,
    pub batting_team: &'a str,
    pub bowling_team: &'a str,
    /// 1 when setting a score, 2 when chasing.
    pub innings: u8,
    pub super_over: bool,
    pub striker: &'a str,
    pub non_striker: &'a str,
    pub bowler: &'a str,
    /// Legal balls already bowled in the innings.
    pub balls_bowled: u32,
    pub max_balls: u32,
    pub score: u32,
    pub wickets: u32,
    pub target: Option<u32>,
    pub striker_tally: &'a BatterTally,
    pub bowler_tally: &'a BowlerTally,
}

impl BallContext<'_> {
    /// Completed overs plus balls of the current over as tenths, e.g. 3.4.
    pub fn over_decimal(&self) -> f64 {
        (self.balls_bowled / 6) as f64 + (self.balls_bowled % 6) as f64 / 10.0
    }

    pub fn current_run_rate(&self) -> f64 {
        metrics::economy(self.score, self.balls_bowled as usize)
    }

    /// Runs still needed per over; 0 when not chasing or no balls remain.
    pub fn required_run_rate(&self) -> f64 {
        let Some(target) = self.target else {
            return 0.0;
        };
        let remaining = self.max_balls.saturating_sub(self.balls_bowled);
        metrics::economy(target.saturating_sub(self.score), remaining as usize)
    }
}

/// Blocks a batting-order name is looked up in once it reaches either end.
pub const BATTER_CATEGORIES: [Category; 3] = [
    Category::Striker,
    Category::NonStriker,
    Category::BattingExperience,
];

/// Blocks a bowler's name is looked up in.
pub const BOWLER_CATEGORIES: [Category; 2] = [Category::Bowler, Category::BowlingExperience];

/// Builds the model input for one ball in `FEATURE_LAYOUT` order.
pub fn encode(table: &EncodingTable, ctx: &BallContext<'_>) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(feature_width());
    let categorical = [
        (Category::Venue, ctx.venue),
        (Category::BattingTeam, ctx.batting_team),
        (Category::BowlingTeam, ctx.bowling_team),
        (Category::InningsType, encoding::innings_type(ctx.innings)),
        (Category::Striker, ctx.striker),
        (Category::Bowler, ctx.bowler),
        (Category::NonStriker, ctx.non_striker),
        (Category::SuperOver, encoding::super_over_flag(ctx.super_over)),
        (Category::BattingExperience, ctx.striker),
        (Category::BowlingExperience, ctx.bowler),
    ];
    for (category, name) in categorical {
        out.extend_from_slice(table.lookup(category, name)?);
    }

    let bat = ctx.striker_tally;
    let bowl = ctx.bowler_tally;
    out.extend_from_slice(&[
        ctx.over_decimal(),
        ctx.score as f64,
        ctx.wickets as f64,
        ctx.current_run_rate(),
        ctx.required_run_rate(),
        bat.runs as f64,
        bat.balls as f64,
        bat.strike_rate(),
        bowl.runs as f64,
        bowl.balls as f64,
        bowl.wickets as f64,
        bowl.economy(),
    ]);
    out.extend_from_slice(&bat.proportions());
    out.extend_from_slice(&bowl.proportions());

    let batting = table.ratings(ctx.striker, Category::Striker)?;
    let bowling = table.ratings(ctx.bowler, Category::Bowler)?;
    out.extend_from_slice(&[
        batting.explosivity,
        batting.running_rating,
        batting.power_play_rating,
        batting.end_over_explosivity,
        bowling.wicket_taking_rating,
        bowling.bowling_consistency_rating,
    ]);
    Ok(out)
}
