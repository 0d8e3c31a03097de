use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CricketError, Result};

/// Categorical inputs of the outcome model, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Venue,
    BattingTeam,
    BowlingTeam,
    InningsType,
    Striker,
    Bowler,
    NonStriker,
    SuperOver,
    BattingExperience,
    BowlingExperience,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Venue,
        Category::BattingTeam,
        Category::BowlingTeam,
        Category::InningsType,
        Category::Striker,
        Category::Bowler,
        Category::NonStriker,
        Category::SuperOver,
        Category::BattingExperience,
        Category::BowlingExperience,
    ];

    /// Binary-encoder width used at training time.
    pub fn width(self) -> usize {
        match self {
            Category::Venue => 8,
            Category::BattingTeam | Category::BowlingTeam => 7,
            Category::InningsType => 2,
            Category::Striker | Category::NonStriker => 12,
            Category::Bowler => 11,
            Category::SuperOver => 2,
            Category::BattingExperience | Category::BowlingExperience => 2,
        }
    }

    /// Column prefix of the vector in the wide training CSV.
    pub fn column(self) -> &'static str {
        match self {
            Category::Venue => "venue",
            Category::BattingTeam => "current_innings",
            Category::BowlingTeam => "bowling_team_name",
            Category::InningsType => "innings_type",
            Category::Striker => "batsman",
            Category::Bowler => "bowler",
            Category::NonStriker => "non_striker",
            Category::SuperOver => "super_over",
            Category::BattingExperience => "batting_experience",
            Category::BowlingExperience => "bowler_experience",
        }
    }

    /// Column holding the entity name the vector belongs to. Experience
    /// tiers are keyed by player.
    pub fn key_column(self) -> &'static str {
        match self {
            Category::BattingExperience => Category::Striker.column(),
            Category::BowlingExperience => Category::Bowler.column(),
            other => other.column(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Venue => "venue",
            Category::BattingTeam => "batting team",
            Category::BowlingTeam => "bowling team",
            Category::InningsType => "innings type",
            Category::Striker => "striker",
            Category::Bowler => "bowler",
            Category::NonStriker => "non-striker",
            Category::SuperOver => "super over flag",
            Category::BattingExperience => "batting experience",
            Category::BowlingExperience => "bowling experience",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const SCORE_SETTER: &str = "score_setter";
pub const CHASING: &str = "chasing";

/// Innings-type name for the 1-based innings number.
pub fn innings_type(innings: u8) -> &'static str {
    if innings <= 1 { SCORE_SETTER } else { CHASING }
}

pub fn super_over_flag(super_over: bool) -> &'static str {
    if super_over { "Yes" } else { "No" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingEntry {
    pub name: String,
    pub vector: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryArtifact {
    pub category: Category,
    pub width: usize,
    pub entries: Vec<EncodingEntry>,
}

/// Static per-player ratings fed to the model after the live numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatings {
    pub name: String,
    #[serde(default)]
    pub explosivity: f64,
    #[serde(default)]
    pub running_rating: f64,
    #[serde(default)]
    pub power_play_rating: f64,
    #[serde(default)]
    pub end_over_explosivity: f64,
    #[serde(default)]
    pub wicket_taking_rating: f64,
    #[serde(default)]
    pub bowling_consistency_rating: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingArtifact {
    #[serde(default)]
    pub generated_at: Option<String>,
    pub categories: Vec<CategoryArtifact>,
    #[serde(default)]
    pub players: Vec<PlayerRatings>,
    /// Team name to the players seen batting or bowling for it.
    #[serde(default)]
    pub rosters: BTreeMap<String, Vec<String>>,
}

/// Read-only lookup from categorical names to encoder vectors.
///
/// Names are matched exactly. A name with no row is an error, and so is a
/// name with more than one row; there is no default vector.
#[derive(Debug, Clone, Default)]
pub struct EncodingTable {
    vectors: HashMap<Category, HashMap<String, Vec<Vec<f64>>>>,
    players: HashMap<String, Vec<PlayerRatings>>,
    rosters: BTreeMap<String, Vec<String>>,
}

impl EncodingTable {
    pub fn from_artifact(artifact: EncodingArtifact) -> Result<Self> {
        let mut vectors: HashMap<Category, HashMap<String, Vec<Vec<f64>>>> = HashMap::new();
        for block in artifact.categories {
            let expected = block.category.width();
            if block.width != expected {
                return Err(CricketError::WidthMismatch {
                    category: block.category,
                    name: "<declared width>".to_string(),
                    expected,
                    actual: block.width,
                });
            }
            let slot = vectors.entry(block.category).or_default();
            for entry in block.entries {
                if entry.vector.len() != expected {
                    return Err(CricketError::WidthMismatch {
                        category: block.category,
                        name: entry.name,
                        expected,
                        actual: entry.vector.len(),
                    });
                }
                slot.entry(entry.name).or_default().push(entry.vector);
            }
        }

        let mut players: HashMap<String, Vec<PlayerRatings>> = HashMap::new();
        for p in artifact.players {
            players.entry(p.name.clone()).or_default().push(p);
        }

        Ok(Self {
            vectors,
            players,
            rosters: artifact.rosters,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let artifact: EncodingArtifact = serde_json::from_str(&raw)?;
        let table = Self::from_artifact(artifact)?;
        info!(
            path = %path.display(),
            venues = table.names(Category::Venue).len(),
            players = table.players.len(),
            "loaded encoding table"
        );
        Ok(table)
    }

    /// The unique vector for `name` in `category`.
    pub fn lookup(&self, category: Category, name: &str) -> Result<&[f64]> {
        let rows = self
            .vectors
            .get(&category)
            .and_then(|by_name| by_name.get(name));
        match rows.map(|r| r.as_slice()) {
            Some([only]) => Ok(only.as_slice()),
            Some(many) if many.len() > 1 => Err(CricketError::AmbiguousCategory {
                category,
                name: name.to_string(),
                rows: many.len(),
            }),
            _ => Err(CricketError::UnknownCategory {
                category,
                name: name.to_string(),
            }),
        }
    }

    /// Ratings for `name`; `role` only labels the error.
    pub fn ratings(&self, name: &str, role: Category) -> Result<&PlayerRatings> {
        match self.players.get(name).map(|r| r.as_slice()) {
            Some([only]) => Ok(only),
            Some(many) if many.len() > 1 => Err(CricketError::AmbiguousCategory {
                category: role,
                name: name.to_string(),
                rows: many.len(),
            }),
            _ => Err(CricketError::UnknownCategory {
                category: role,
                name: name.to_string(),
            }),
        }
    }

    /// Every name with at least one row in `category`, sorted.
    pub fn names(&self, category: Category) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .vectors
            .get(&category)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    pub fn venues(&self) -> Vec<&str> {
        self.names(Category::Venue)
    }

    /// Union of batting and bowling team names, sorted.
    pub fn teams(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .names(Category::BattingTeam)
            .into_iter()
            .chain(self.names(Category::BowlingTeam))
            .collect();
        set.into_iter().collect()
    }

    pub fn roster(&self, team: &str) -> &[String] {
        self.rosters.get(team).map(Vec::as_slice).unwrap_or(&[])
    }
}

const BATTING_RATINGS: [&str; 4] = [
    "explosivity",
    "running_rating",
    "power_play_rating",
    "end_over_explosivity",
];
const BOWLING_RATINGS: [&str; 2] = ["wicket_taking_rating", "bowling_consistency_rating"];

/// Converts the wide training CSV (`<column>` plus `<column>_0..width` per
/// category, rating columns per player) into an artifact.
///
/// Identical (name, vector) pairs collapse to one entry; differing vectors
/// for the same name are all kept so lookups on that name fail. Ratings
/// take the first row a player appears in, batting ratings from rows where
/// they bat and bowling ratings from rows where they bowl.
pub fn artifact_from_wide_csv(path: &Path) -> Result<EncodingArtifact> {
    if !path.exists() {
        return Err(CricketError::DatasetNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let col = |name: &str| headers.iter().position(|h| h.trim() == name);

    let mut layouts: Vec<(Category, usize, Vec<usize>)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for category in Category::ALL {
        let Some(key) = col(category.key_column()) else {
            let key = category.key_column().to_string();
            if !missing.contains(&key) {
                missing.push(key);
            }
            continue;
        };
        let mut cols = Vec::with_capacity(category.width());
        for bit in 0..category.width() {
            let name = format!("{}_{bit}", category.column());
            match col(&name) {
                Some(idx) => cols.push(idx),
                None => missing.push(name),
            }
        }
        if cols.len() == category.width() {
            layouts.push((category, key, cols));
        }
    }
    if !missing.is_empty() {
        return Err(CricketError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let batsman = col(Category::Striker.column());
    let bowler = col(Category::Bowler.column());
    let batting_team = col(Category::BattingTeam.column());
    let bowling_team = col(Category::BowlingTeam.column());
    let batting_cols: Vec<Option<usize>> = BATTING_RATINGS.iter().map(|c| col(c)).collect();
    let bowling_cols: Vec<Option<usize>> = BOWLING_RATINGS.iter().map(|c| col(c)).collect();

    let mut entries: BTreeMap<Category, Vec<EncodingEntry>> = BTreeMap::new();
    let mut seen: HashSet<(Category, String, Vec<u64>)> = HashSet::new();
    let mut batting: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut bowling: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut rosters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut rostered: HashSet<(String, String)> = HashSet::new();
    let mut skipped = 0usize;

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
        };

        for (category, key, cols) in &layouts {
            let Some(name) = cell(Some(*key)) else {
                continue;
            };
            let vector: Option<Vec<f64>> = cols
                .iter()
                .map(|&c| cell(Some(c)).and_then(|v| v.parse::<f64>().ok()))
                .collect();
            let Some(vector) = vector else {
                skipped += 1;
                warn!(row, %category, name, "unparseable encoding vector; skipped");
                continue;
            };
            let bits = vector.iter().map(|v| v.to_bits()).collect();
            if seen.insert((*category, name.to_string(), bits)) {
                entries.entry(*category).or_default().push(EncodingEntry {
                    name: name.to_string(),
                    vector,
                });
            }
        }

        let ratings = |cols: &[Option<usize>]| -> Vec<f64> {
            cols.iter()
                .map(|&c| cell(c).and_then(|v| v.parse().ok()).unwrap_or(0.0))
                .collect()
        };
        if let Some(name) = cell(batsman)
            && !batting.contains_key(name)
        {
            batting.insert(name.to_string(), ratings(&batting_cols));
        }
        if let Some(name) = cell(bowler)
            && !bowling.contains_key(name)
        {
            bowling.insert(name.to_string(), ratings(&bowling_cols));
        }

        for (team, player) in [(batting_team, batsman), (bowling_team, bowler)] {
            if let (Some(team), Some(player)) = (cell(team), cell(player))
                && rostered.insert((team.to_string(), player.to_string()))
            {
                rosters
                    .entry(team.to_string())
                    .or_default()
                    .push(player.to_string());
            }
        }
    }

    let names: BTreeSet<&String> = batting.keys().chain(bowling.keys()).collect();
    let players = names
        .into_iter()
        .map(|name| {
            let bat = batting.get(name);
            let bowl = bowling.get(name);
            let pick = |src: Option<&Vec<f64>>, i: usize| {
                src.and_then(|v| v.get(i)).copied().unwrap_or(0.0)
            };
            PlayerRatings {
                name: name.clone(),
                explosivity: pick(bat, 0),
                running_rating: pick(bat, 1),
                power_play_rating: pick(bat, 2),
                end_over_explosivity: pick(bat, 3),
                wicket_taking_rating: pick(bowl, 0),
                bowling_consistency_rating: pick(bowl, 1),
            }
        })
        .collect();

    info!(
        path = %path.display(),
        skipped,
        "read wide encoding csv"
    );

    Ok(EncodingArtifact {
        generated_at: Some(chrono::Utc::now().to_rfc3339()),
        categories: entries
            .into_iter()
            .map(|(category, entries)| CategoryArtifact {
                category,
                width: category.width(),
                entries,
            })
            .collect(),
        players,
        rosters,
    })
}

pub fn default_encodings_path() -> PathBuf {
    PathBuf::from("dataset/encodings.json")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Deterministic vector of the right width for `name`.
    pub fn vector(category: Category, seed: usize) -> Vec<f64> {
        (0..category.width())
            .map(|bit| ((seed >> (bit % 16)) & 1) as f64)
            .collect()
    }

    pub fn artifact(teams: &[(&str, Vec<&str>)], venue: &str) -> EncodingArtifact {
        let mut blocks: BTreeMap<Category, Vec<EncodingEntry>> = BTreeMap::new();
        let mut push = |category: Category, name: &str| {
            let entries = blocks.entry(category).or_default();
            let seed = entries.len() + 1;
            entries.push(EncodingEntry {
                name: name.to_string(),
                vector: vector(category, seed),
            });
        };
        push(Category::Venue, venue);
        push(Category::InningsType, SCORE_SETTER);
        push(Category::InningsType, CHASING);
        push(Category::SuperOver, "No");
        push(Category::SuperOver, "Yes");

        let mut players = Vec::new();
        let mut rosters = BTreeMap::new();
        for (team, squad) in teams {
            push(Category::BattingTeam, team);
            push(Category::BowlingTeam, team);
            for p in squad.iter() {
                for category in [
                    Category::Striker,
                    Category::NonStriker,
                    Category::Bowler,
                    Category::BattingExperience,
                    Category::BowlingExperience,
                ] {
                    push(category, p);
                }
                players.push(PlayerRatings {
                    name: p.to_string(),
                    explosivity: 0.5,
                    ..PlayerRatings::default()
                });
            }
            rosters.insert(
                team.to_string(),
                squad.iter().map(|p| p.to_string()).collect(),
            );
        }

        EncodingArtifact {
            generated_at: None,
            categories: blocks
                .into_iter()
                .map(|(category, entries)| CategoryArtifact {
                    category,
                    width: category.width(),
                    entries,
                })
                .collect(),
            players,
            rosters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn table() -> EncodingTable {
        EncodingTable::from_artifact(artifact(
            &[
                ("India", vec!["Rohit", "Bumrah"]),
                ("Australia", vec!["Head", "Starc"]),
            ],
            "Wankhede",
        ))
        .expect("table")
    }

    #[test]
    fn lookup_is_stable_for_unique_names() {
        let table = table();
        let first = table.lookup(Category::Striker, "Rohit").expect("rohit").to_vec();
        let again = table.lookup(Category::Striker, "Rohit").expect("rohit");
        assert_eq!(first.as_slice(), again);
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn unknown_name_fails() {
        let err = table().lookup(Category::Venue, "Lord's").unwrap_err();
        assert!(matches!(err, CricketError::UnknownCategory { .. }));
    }

    #[test]
    fn duplicate_rows_are_ambiguous() {
        let mut art = artifact(&[("India", vec!["Rohit"])], "Wankhede");
        let venue = art
            .categories
            .iter_mut()
            .find(|c| c.category == Category::Venue)
            .expect("venue block");
        venue.entries.push(EncodingEntry {
            name: "Wankhede".into(),
            vector: vec![1.0; 8],
        });
        let table = EncodingTable::from_artifact(art).expect("table");
        let err = table.lookup(Category::Venue, "Wankhede").unwrap_err();
        assert!(matches!(err, CricketError::AmbiguousCategory { rows: 2, .. }));
    }

    #[test]
    fn wrong_width_is_rejected_at_load() {
        let mut art = artifact(&[("India", vec!["Rohit"])], "Wankhede");
        art.categories[0].entries[0].vector.pop();
        let err = EncodingTable::from_artifact(art).unwrap_err();
        assert!(matches!(err, CricketError::WidthMismatch { .. }));
    }

    #[test]
    fn options_are_sorted() {
        let table = table();
        assert_eq!(table.teams(), vec!["Australia", "India"]);
        assert_eq!(table.venues(), vec!["Wankhede"]);
        assert_eq!(table.roster("India"), &["Rohit".to_string(), "Bumrah".to_string()]);
        assert!(table.roster("Nepal").is_empty());
        assert!(table.ratings("Head", Category::Striker).is_ok());
    }
}
