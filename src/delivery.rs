use std::fmt;

use serde::{Deserialize, Serialize};

/// Innings segment derived from the over number (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Powerplay,
    Middle,
    Death,
}

impl Phase {
    /// Display and aggregation order.
    pub const ALL: [Phase; 3] = [Phase::Powerplay, Phase::Middle, Phase::Death];

    pub fn from_over(over: u8) -> Self {
        if over < 6 {
            Phase::Powerplay
        } else if over < 16 {
            Phase::Middle
        } else {
            Phase::Death
        }
    }

    pub fn index(self) -> usize {
        match self {
            Phase::Powerplay => 0,
            Phase::Middle => 1,
            Phase::Death => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Powerplay => "Powerplay",
            Phase::Middle => "Middle",
            Phase::Death => "Death",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrasType {
    Wides,
    NoBalls,
    LegByes,
    Byes,
    Penalty,
}

impl ExtrasType {
    /// Parses the dataset spelling. Blank and NA-like cells mean "no extra".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wides" | "wide" => Some(ExtrasType::Wides),
            "noballs" | "noball" | "no ball" => Some(ExtrasType::NoBalls),
            "legbyes" | "legbye" | "leg bye" => Some(ExtrasType::LegByes),
            "byes" | "bye" => Some(ExtrasType::Byes),
            "penalty" => Some(ExtrasType::Penalty),
            _ => None,
        }
    }

    /// Extras the bowler is not charged for.
    pub fn is_fielding_extra(self) -> bool {
        matches!(
            self,
            ExtrasType::LegByes | ExtrasType::Byes | ExtrasType::Penalty
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DismissalKind {
    Caught,
    Bowled,
    Lbw,
    Stumped,
    CaughtAndBowled,
    HitWicket,
    RunOut,
    RetiredHurt,
    RetiredOut,
    ObstructingTheField,
    Other(String),
}

impl DismissalKind {
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().to_ascii_lowercase();
        let kind = match s.as_str() {
            "" | "na" | "nan" | "none" => return None,
            "caught" => DismissalKind::Caught,
            "bowled" => DismissalKind::Bowled,
            "lbw" => DismissalKind::Lbw,
            "stumped" => DismissalKind::Stumped,
            "caught and bowled" => DismissalKind::CaughtAndBowled,
            "hit wicket" => DismissalKind::HitWicket,
            "run out" => DismissalKind::RunOut,
            "retired hurt" => DismissalKind::RetiredHurt,
            "retired out" => DismissalKind::RetiredOut,
            "obstructing the field" => DismissalKind::ObstructingTheField,
            _ => DismissalKind::Other(s),
        };
        Some(kind)
    }

    /// Dismissals credited to the bowler.
    pub fn credits_bowler(&self) -> bool {
        matches!(
            self,
            DismissalKind::Caught
                | DismissalKind::Bowled
                | DismissalKind::Lbw
                | DismissalKind::Stumped
                | DismissalKind::CaughtAndBowled
                | DismissalKind::HitWicket
        )
    }

    pub fn label(&self) -> &str {
        match self {
            DismissalKind::Caught => "caught",
            DismissalKind::Bowled => "bowled",
            DismissalKind::Lbw => "lbw",
            DismissalKind::Stumped => "stumped",
            DismissalKind::CaughtAndBowled => "caught and bowled",
            DismissalKind::HitWicket => "hit wicket",
            DismissalKind::RunOut => "run out",
            DismissalKind::RetiredHurt => "retired hurt",
            DismissalKind::RetiredOut => "retired out",
            DismissalKind::ObstructingTheField => "obstructing the field",
            DismissalKind::Other(s) => s.as_str(),
        }
    }
}

/// One ball bowled, legal or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub match_id: u64,
    pub over: u8,
    pub ball: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub batter: String,
    pub non_striker: String,
    pub bowler: String,
    pub batsman_runs: u32,
    pub total_runs: u32,
    pub extras_type: Option<ExtrasType>,
    pub extra_runs: u32,
    pub is_wicket: bool,
    pub dismissal_kind: Option<DismissalKind>,
    pub player_dismissed: Option<String>,
}

impl Delivery {
    pub fn phase(&self) -> Phase {
        Phase::from_over(self.over)
    }

    pub fn is_wide(&self) -> bool {
        self.extras_type == Some(ExtrasType::Wides)
    }

    pub fn is_no_ball(&self) -> bool {
        self.extras_type == Some(ExtrasType::NoBalls)
    }

    /// Counts towards the batter's balls faced.
    pub fn is_legal_for_batter(&self) -> bool {
        !self.is_wide()
    }

    /// Counts towards the six balls of the bowler's over.
    pub fn is_legal_for_bowler(&self) -> bool {
        !self.is_wide() && !self.is_no_ball()
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self.batsman_runs, 4 | 6)
    }

    /// Runs charged to the bowler: byes, leg byes and penalties are not.
    pub fn bowler_runs(&self) -> u32 {
        match self.extras_type {
            Some(extra) if extra.is_fielding_extra() => {
                self.total_runs.saturating_sub(self.extra_runs)
            }
            _ => self.total_runs,
        }
    }

    /// Wicket credited to the bowler (run-outs and retirements excluded).
    pub fn is_bowler_wicket(&self) -> bool {
        self.is_wicket
            && self
                .dismissal_kind
                .as_ref()
                .is_some_and(DismissalKind::credits_bowler)
    }

    /// Sort key for chronological ordering.
    pub fn chrono_key(&self) -> (u64, u8, u8) {
        (self.match_id, self.over, self.ball)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn ball(batter: &str, bowler: &str, over: u8, runs: u32) -> Delivery {
        Delivery {
            match_id: 1,
            over,
            ball: 1,
            batting_team: "Mumbai Indians".into(),
            bowling_team: "Chennai Super Kings".into(),
            batter: batter.into(),
            non_striker: "Partner".into(),
            bowler: bowler.into(),
            batsman_runs: runs,
            total_runs: runs,
            extras_type: None,
            extra_runs: 0,
            is_wicket: false,
            dismissal_kind: None,
            player_dismissed: None,
        }
    }

    pub fn wide(batter: &str, bowler: &str, over: u8) -> Delivery {
        Delivery {
            total_runs: 1,
            extras_type: Some(ExtrasType::Wides),
            extra_runs: 1,
            ..ball(batter, bowler, over, 0)
        }
    }

    /// A one-run no-ball with nothing off the bat.
    pub fn no_ball(batter: &str, bowler: &str, over: u8) -> Delivery {
        Delivery {
            total_runs: 1,
            extras_type: Some(ExtrasType::NoBalls),
            extra_runs: 1,
            ..ball(batter, bowler, over, 0)
        }
    }

    pub fn wicket(batter: &str, bowler: &str, over: u8, kind: DismissalKind) -> Delivery {
        Delivery {
            is_wicket: true,
            dismissal_kind: Some(kind),
            player_dismissed: Some(batter.into()),
            ..ball(batter, bowler, over, 0)
        }
    }

    /// Renumbers `ball` so the slice is already in chronological order.
    pub fn sequence(mut balls: Vec<Delivery>) -> Vec<Delivery> {
        for (idx, d) in balls.iter_mut().enumerate() {
            d.ball = (idx + 1) as u8;
        }
        balls
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn phase_covers_every_over_once() {
        let mut counts = [0usize; 3];
        for over in 0..20u8 {
            counts[Phase::from_over(over).index()] += 1;
        }
        assert_eq!(counts, [6, 10, 4]);
        assert_eq!(Phase::from_over(5), Phase::Powerplay);
        assert_eq!(Phase::from_over(6), Phase::Middle);
        assert_eq!(Phase::from_over(15), Phase::Middle);
        assert_eq!(Phase::from_over(16), Phase::Death);
        assert_eq!(Phase::from_over(19), Phase::Death);
    }

    #[test]
    fn legbyes_are_not_charged_to_bowler() {
        let d = Delivery {
            total_runs: 5,
            extras_type: Some(ExtrasType::LegByes),
            extra_runs: 5,
            ..ball("A", "B", 3, 0)
        };
        assert_eq!(d.bowler_runs(), 0);
    }

    #[test]
    fn wides_stay_charged_to_bowler() {
        let d = wide("A", "B", 3);
        assert_eq!(d.total_runs, 1);
        assert_eq!(d.bowler_runs(), 1);
        assert!(!d.is_legal_for_batter());
    }

    #[test]
    fn run_out_is_not_a_bowler_wicket() {
        let d = wicket("A", "B", 10, DismissalKind::RunOut);
        assert!(d.is_wicket);
        assert!(!d.is_bowler_wicket());
        let d = wicket("A", "B", 10, DismissalKind::CaughtAndBowled);
        assert!(d.is_bowler_wicket());
    }

    #[test]
    fn parses_dataset_spellings() {
        assert_eq!(ExtrasType::parse("legbyes"), Some(ExtrasType::LegByes));
        assert_eq!(ExtrasType::parse("NA"), None);
        assert_eq!(ExtrasType::parse(""), None);
        assert_eq!(
            DismissalKind::parse("caught and bowled"),
            Some(DismissalKind::CaughtAndBowled)
        );
        assert_eq!(DismissalKind::parse("NA"), None);
        assert_eq!(
            DismissalKind::parse("handled the ball"),
            Some(DismissalKind::Other("handled the ball".into()))
        );
    }
}
