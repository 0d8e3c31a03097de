//! Ball-by-ball innings and match simulation driven by an [`OutcomeModel`].

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encoding::{self, Category, EncodingTable};
use crate::error::{CricketError, Result};
use crate::features::{self, BallContext, BatterTally, BowlerTally};
use crate::predictor::{BallOutcome, OutcomeModel};

pub const OVERS_PER_INNINGS: u8 = 20;
pub const BALLS_PER_OVER: u8 = 6;
pub const SUPER_OVER_OVERS: u8 = 1;
pub const SUPER_OVER_WICKETS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    pub team: String,
    /// Batting order; the first two open.
    pub batting_order: Vec<String>,
    /// Bowlers in rotation order, one over each.
    pub bowlers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSetup {
    pub venue: String,
    pub batting: Squad,
    pub bowling: Squad,
    /// 1 when setting a score, 2 when chasing.
    pub innings: u8,
    pub super_over: bool,
    /// Runs needed to win, for a chase.
    pub target: Option<u32>,
}

impl SimulationSetup {
    pub fn max_overs(&self) -> u8 {
        if self.super_over { SUPER_OVER_OVERS } else { OVERS_PER_INNINGS }
    }

    /// Wickets that end the innings.
    pub fn max_wickets(&self) -> u32 {
        let all_out = self.batting.batting_order.len().saturating_sub(1) as u32;
        if self.super_over {
            all_out.min(SUPER_OVER_WICKETS)
        } else {
            all_out
        }
    }

    pub fn validate(&self) -> Result<()> {
        let order = &self.batting.batting_order;
        if order.len() < 2 {
            return Err(CricketError::InvalidSetup(format!(
                "{} needs at least two batters",
                self.batting.team
            )));
        }
        let distinct: HashSet<&String> = order.iter().collect();
        if distinct.len() != order.len() {
            return Err(CricketError::InvalidSetup(format!(
                "{} batting order repeats a player",
                self.batting.team
            )));
        }
        let bowlers = &self.bowling.bowlers;
        if bowlers.is_empty() {
            return Err(CricketError::InvalidSetup(format!(
                "{} has no bowlers",
                self.bowling.team
            )));
        }
        let distinct_bowlers: HashSet<&String> = bowlers.iter().collect();
        if distinct_bowlers.len() != bowlers.len() {
            return Err(CricketError::InvalidSetup(format!(
                "{} bowling rotation repeats a bowler",
                self.bowling.team
            )));
        }
        if bowlers.len() < 2 && self.max_overs() > 1 {
            return Err(CricketError::InvalidSetup(
                "one bowler cannot bowl consecutive overs".into(),
            ));
        }
        if self.batting.team == self.bowling.team {
            return Err(CricketError::InvalidSetup("a team cannot play itself".into()));
        }
        Ok(())
    }

    /// Looks up every name the innings can encode and reports all failures
    /// together, at most one per name.
    pub fn check_vocabulary(&self, table: &EncodingTable) -> Result<()> {
        let context = [
            (Category::Venue, self.venue.as_str()),
            (Category::BattingTeam, self.batting.team.as_str()),
            (Category::BowlingTeam, self.bowling.team.as_str()),
            (Category::InningsType, encoding::innings_type(self.innings)),
            (Category::SuperOver, encoding::super_over_flag(self.super_over)),
        ];
        let mut failures: Vec<CricketError> = context
            .into_iter()
            .filter_map(|(category, name)| table.lookup(category, name).err())
            .collect();
        for name in &self.batting.batting_order {
            let failure = features::BATTER_CATEGORIES
                .iter()
                .find_map(|&category| table.lookup(category, name).err())
                .or_else(|| table.ratings(name, Category::Striker).err());
            failures.extend(failure);
        }
        for name in &self.bowling.bowlers {
            let failure = features::BOWLER_CATEGORIES
                .iter()
                .find_map(|&category| table.lookup(category, name).err())
                .or_else(|| table.ratings(name, Category::Bowler).err());
            failures.extend(failure);
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CricketError::UnresolvedNames(failures))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallRecord {
    /// 0-based over.
    pub over: u8,
    /// 1-based ball within the over.
    pub ball: u8,
    pub striker: String,
    pub bowler: String,
    pub outcome: BallOutcome,
    pub score: u32,
    pub wickets: u32,
}

impl fmt::Display for BallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {} to {}: {} ({}/{})",
            self.over, self.ball, self.bowler, self.striker, self.outcome, self.score, self.wickets
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InningsEnd {
    AllOut,
    OversComplete,
    TargetReached,
}

/// Mutable state threaded through every simulated ball.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    pub score: u32,
    pub wickets: u32,
    pub balls_bowled: u32,
    /// Indexes into the batting order.
    pub striker: usize,
    pub non_striker: usize,
    pub next_batter: usize,
    pub batters: Vec<BatterTally>,
    pub bowlers: Vec<BowlerTally>,
    pub log: Vec<BallRecord>,
}

impl SimulationState {
    pub fn new(setup: &SimulationSetup) -> Self {
        Self {
            striker: 0,
            non_striker: 1,
            next_batter: 2,
            batters: vec![BatterTally::default(); setup.batting.batting_order.len()],
            bowlers: vec![BowlerTally::default(); setup.bowling.bowlers.len()],
            ..Self::default()
        }
    }

    pub fn rotate_strike(&mut self) {
        std::mem::swap(&mut self.striker, &mut self.non_striker);
    }

    /// Applies one outcome; returns how the innings ended, if it did.
    pub fn apply(
        &mut self,
        setup: &SimulationSetup,
        bowler: usize,
        outcome: BallOutcome,
    ) -> Option<InningsEnd> {
        self.balls_bowled += 1;
        self.score += outcome.runs();
        self.batters[self.striker].record(outcome);
        self.bowlers[bowler].record(outcome);

        if outcome.is_wicket() {
            self.wickets += 1;
            if self.wickets >= setup.max_wickets() || self.next_batter >= self.batters.len() {
                return Some(InningsEnd::AllOut);
            }
            self.striker = self.next_batter;
            self.next_batter += 1;
        } else if outcome.runs() % 2 == 1 {
            self.rotate_strike();
        }

        if setup.target.is_some_and(|t| self.score >= t) {
            return Some(InningsEnd::TargetReached);
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterLine {
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
    pub out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowlerLine {
    pub name: String,
    pub overs: String,
    pub runs: u32,
    pub wickets: u32,
    pub economy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsResult {
    pub batting_team: String,
    pub bowling_team: String,
    pub score: u32,
    pub wickets: u32,
    pub balls: u32,
    pub end: InningsEnd,
    pub target: Option<u32>,
    pub batting: Vec<BatterLine>,
    pub bowling: Vec<BowlerLine>,
    pub log: Vec<BallRecord>,
}

impl InningsResult {
    pub fn overs_label(&self) -> String {
        format!("{}.{}", self.balls / 6, self.balls % 6)
    }

    fn from_state(setup: &SimulationSetup, state: SimulationState, end: InningsEnd) -> Self {
        let batting = setup
            .batting
            .batting_order
            .iter()
            .zip(&state.batters)
            .enumerate()
            .filter(|(i, (_, t))| t.balls > 0 || *i == state.striker || *i == state.non_striker)
            .map(|(_, (name, t))| BatterLine {
                name: name.clone(),
                runs: t.runs,
                balls: t.balls,
                strike_rate: t.strike_rate(),
                out: t.out,
            })
            .collect();
        let bowling = setup
            .bowling
            .bowlers
            .iter()
            .zip(&state.bowlers)
            .filter(|(_, t)| t.balls > 0)
            .map(|(name, t)| BowlerLine {
                name: name.clone(),
                overs: t.overs_label(),
                runs: t.runs,
                wickets: t.wickets,
                economy: t.economy(),
            })
            .collect();
        Self {
            batting_team: setup.batting.team.clone(),
            bowling_team: setup.bowling.team.clone(),
            score: state.score,
            wickets: state.wickets,
            balls: state.balls_bowled,
            end,
            target: setup.target,
            batting,
            bowling,
            log: state.log,
        }
    }
}

/// Plays one innings ball by ball until all out, overs done or target reached.
pub fn simulate_innings(
    table: &EncodingTable,
    model: &dyn OutcomeModel,
    setup: &SimulationSetup,
) -> Result<InningsResult> {
    setup.validate()?;
    setup.check_vocabulary(table)?;
    let mut state = SimulationState::new(setup);
    let max_balls = setup.max_overs() as u32 * BALLS_PER_OVER as u32;
    let mut end = InningsEnd::OversComplete;

    'overs: for over in 0..setup.max_overs() {
        let bowler = over as usize % setup.bowling.bowlers.len();
        for ball in 1..=BALLS_PER_OVER {
            let striker = &setup.batting.batting_order[state.striker];
            let ctx = BallContext {
                venue: &setup.venue,
                batting_team: &setup.batting.team,
                bowling_team: &setup.bowling.team,
                innings: setup.innings,
                super_over: setup.super_over,
                striker,
                non_striker: &setup.batting.batting_order[state.non_striker],
                bowler: &setup.bowling.bowlers[bowler],
                balls_bowled: state.balls_bowled,
                max_balls,
                score: state.score,
                wickets: state.wickets,
                target: setup.target,
                striker_tally: &state.batters[state.striker],
                bowler_tally: &state.bowlers[bowler],
            };
            let x = features::encode(table, &ctx)?;
            let outcome = BallOutcome::from_label(model.predict(&x)?)?;

            let striker = striker.clone();
            let finished = state.apply(setup, bowler, outcome);
            let record = BallRecord {
                over,
                ball,
                striker,
                bowler: setup.bowling.bowlers[bowler].clone(),
                outcome,
                score: state.score,
                wickets: state.wickets,
            };
            debug!(%record, "ball");
            state.log.push(record);

            if let Some(how) = finished {
                end = how;
                break 'overs;
            }
        }
        state.rotate_strike();
    }

    let result = InningsResult::from_state(setup, state, end);
    info!(
        team = %result.batting_team,
        score = result.score,
        wickets = result.wickets,
        overs = %result.overs_label(),
        end = ?result.end,
        "innings complete"
    );
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TossDecision {
    Bat,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub winner: String,
    pub loser: String,
    pub decision: TossDecision,
}

impl Toss {
    /// (batting first, fielding first)
    pub fn batting_order(&self) -> (&str, &str) {
        match self.decision {
            TossDecision::Bat => (&self.winner, &self.loser),
            TossDecision::Field => (&self.loser, &self.winner),
        }
    }
}

impl fmt::Display for Toss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let choice = match self.decision {
            TossDecision::Bat => "bat",
            TossDecision::Field => "field",
        };
        write!(f, "{} won the toss and chose to {choice}", self.winner)
    }
}

pub fn toss<R: Rng + ?Sized>(team_a: &str, team_b: &str, rng: &mut R) -> Toss {
    let (winner, loser) = if rng.gen_bool(0.5) {
        (team_a, team_b)
    } else {
        (team_b, team_a)
    };
    let decision = if rng.gen_bool(0.5) {
        TossDecision::Bat
    } else {
        TossDecision::Field
    };
    Toss {
        winner: winner.to_string(),
        loser: loser.to_string(),
        decision,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub venue: String,
    pub home: Squad,
    pub away: Squad,
    #[serde(default)]
    pub super_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    WonByRuns { winner: String, runs: u32 },
    WonByWickets { winner: String, wickets: u32 },
    Tie,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::WonByRuns { winner, runs } => write!(f, "{winner} won by {runs} runs"),
            MatchOutcome::WonByWickets { winner, wickets } => {
                write!(f, "{winner} won by {wickets} wickets")
            }
            MatchOutcome::Tie => f.write_str("match tied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub toss: Toss,
    pub first: InningsResult,
    pub second: InningsResult,
    pub outcome: MatchOutcome,
}

/// Toss, first innings, then a chase of the first-innings total plus one.
pub fn simulate_match<R: Rng + ?Sized>(
    table: &EncodingTable,
    model: &dyn OutcomeModel,
    setup: &MatchSetup,
    rng: &mut R,
) -> Result<MatchResult> {
    let toss = toss(&setup.home.team, &setup.away.team, rng);
    info!(%toss, "toss");
    let (bat_first, bowl_first) = if toss.batting_order().0 == setup.home.team {
        (&setup.home, &setup.away)
    } else {
        (&setup.away, &setup.home)
    };

    let first_setup = SimulationSetup {
        venue: setup.venue.clone(),
        batting: bat_first.clone(),
        bowling: bowl_first.clone(),
        innings: 1,
        super_over: setup.super_over,
        target: None,
    };
    let chase_setup = SimulationSetup {
        venue: setup.venue.clone(),
        batting: bowl_first.clone(),
        bowling: bat_first.clone(),
        innings: 2,
        super_over: setup.super_over,
        target: None,
    };
    // both innings are checked before the first ball
    chase_setup.validate()?;
    chase_setup.check_vocabulary(table)?;

    let first = simulate_innings(table, model, &first_setup)?;
    let second_setup = SimulationSetup {
        target: Some(first.score + 1),
        ..chase_setup
    };
    let second = simulate_innings(table, model, &second_setup)?;

    let outcome = if second.end == InningsEnd::TargetReached {
        MatchOutcome::WonByWickets {
            winner: second.batting_team.clone(),
            wickets: second_setup.max_wickets() - second.wickets,
        }
    } else if second.score == first.score {
        MatchOutcome::Tie
    } else {
        MatchOutcome::WonByRuns {
            winner: first.batting_team.clone(),
            runs: first.score - second.score,
        }
    };
    info!(%outcome, "match complete");

    Ok(MatchResult {
        toss,
        first,
        second,
        outcome,
    })
}
