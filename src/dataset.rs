use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Row, RowAccessor};
use tracing::info;

use crate::delivery::{Delivery, DismissalKind, ExtrasType};
use crate::error::{CricketError, Result};

pub const REQUIRED_COLUMNS: [&str; 15] = [
    "match_id",
    "over",
    "ball",
    "batting_team",
    "bowling_team",
    "batter",
    "non_striker",
    "bowler",
    "batsman_runs",
    "total_runs",
    "extras_type",
    "extra_runs",
    "is_wicket",
    "dismissal_kind",
    "player_dismissed",
];

const COL_MATCH_ID: usize = 0;
const COL_OVER: usize = 1;
const COL_BALL: usize = 2;
const COL_BATTING_TEAM: usize = 3;
const COL_BOWLING_TEAM: usize = 4;
const COL_BATTER: usize = 5;
const COL_NON_STRIKER: usize = 6;
const COL_BOWLER: usize = 7;
const COL_BATSMAN_RUNS: usize = 8;
const COL_TOTAL_RUNS: usize = 9;
const COL_EXTRAS_TYPE: usize = 10;
const COL_EXTRA_RUNS: usize = 11;
const COL_IS_WICKET: usize = 12;
const COL_DISMISSAL_KIND: usize = 13;
const COL_PLAYER_DISMISSED: usize = 14;

/// Immutable, chronologically ordered delivery table.
///
/// Built once and passed by reference into every computation. The per-player
/// row indexes are built on first use and never invalidated.
#[derive(Debug, Default)]
pub struct DeliveryStore {
    deliveries: Vec<Delivery>,
    by_batter: OnceCell<HashMap<String, Vec<usize>>>,
    by_bowler: OnceCell<HashMap<String, Vec<usize>>>,
}

impl DeliveryStore {
    /// Stable-sorts by (match, over, ball); rows of the same ball keep file order.
    pub fn from_deliveries(mut deliveries: Vec<Delivery>) -> Self {
        deliveries.sort_by_key(Delivery::chrono_key);
        Self {
            deliveries,
            by_batter: OnceCell::new(),
            by_bowler: OnceCell::new(),
        }
    }

    /// Loads a CSV or Parquet file, picked by extension (CSV otherwise).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CricketError::DatasetNotFound(path.to_path_buf()));
        }
        let is_parquet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
        let rows = if is_parquet {
            read_parquet(path)?
        } else {
            read_csv(path)?
        };
        let store = Self::from_deliveries(rows);
        info!(
            path = %path.display(),
            deliveries = store.len(),
            matches = store.match_count(),
            "loaded delivery data"
        );
        Ok(store)
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.deliveries
            .iter()
            .map(|d| d.match_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Every delivery faced by `batter`, in chronological order.
    pub fn for_batter(&self, batter: &str) -> Vec<&Delivery> {
        let index = self
            .by_batter
            .get_or_init(|| build_index(&self.deliveries, |d| d.batter.as_str()));
        self.rows(index.get(batter))
    }

    /// Every delivery bowled by `bowler`, in chronological order.
    pub fn for_bowler(&self, bowler: &str) -> Vec<&Delivery> {
        let index = self
            .by_bowler
            .get_or_init(|| build_index(&self.deliveries, |d| d.bowler.as_str()));
        self.rows(index.get(bowler))
    }

    pub fn for_pair(&self, batter: &str, bowler: &str) -> Vec<&Delivery> {
        self.for_batter(batter)
            .into_iter()
            .filter(|d| d.bowler == bowler)
            .collect()
    }

    /// Batters ranked by career runs, highest first; ties by name.
    pub fn batters_by_runs(&self) -> Vec<(String, u32)> {
        let mut totals: HashMap<&str, u32> = HashMap::new();
        for d in &self.deliveries {
            *totals.entry(d.batter.as_str()).or_default() += d.batsman_runs;
        }
        let mut out: Vec<(String, u32)> = totals
            .into_iter()
            .map(|(name, runs)| (name.to_string(), runs))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Bowlers ranked by bowler-credited wickets, highest first; ties by name.
    pub fn bowlers_by_wickets(&self) -> Vec<(String, usize)> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for d in &self.deliveries {
            let entry = totals.entry(d.bowler.as_str()).or_default();
            if d.is_bowler_wicket() {
                *entry += 1;
            }
        }
        let mut out: Vec<(String, usize)> = totals
            .into_iter()
            .map(|(name, wkts)| (name.to_string(), wkts))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Bowlers `batter` has faced, sorted by name.
    pub fn opponents_of(&self, batter: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .for_batter(batter)
            .into_iter()
            .map(|d| d.bowler.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    fn rows(&self, idx: Option<&Vec<usize>>) -> Vec<&Delivery> {
        idx.map(|ids| ids.iter().map(|&i| &self.deliveries[i]).collect())
            .unwrap_or_default()
    }
}

fn build_index<F>(deliveries: &[Delivery], key: F) -> HashMap<String, Vec<usize>>
where
    F: Fn(&Delivery) -> &str,
{
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, d) in deliveries.iter().enumerate() {
        index.entry(key(d).to_string()).or_default().push(i);
    }
    index
}

/// Resolves `REQUIRED_COLUMNS` against a header, reporting every missing one.
fn resolve_columns<'a, I>(path: &Path, header: I) -> Result<[usize; 15]>
where
    I: IntoIterator<Item = &'a str>,
{
    let positions: HashMap<String, usize> = header
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
        .collect();
    let mut out = [0usize; 15];
    let mut missing = Vec::new();
    for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
        match positions.get(*name) {
            Some(&i) => out[slot] = i,
            None => missing.push((*name).to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(CricketError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    Ok(out)
}

fn read_csv(path: &Path) -> Result<Vec<Delivery>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let header = reader.headers()?.clone();
    let cols = resolve_columns(path, header.iter())?;

    let mut out = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |slot: usize| record.get(cols[slot]).unwrap_or("").trim();
        out.push(parse_delivery(row_idx + 1, cell)?);
    }
    Ok(out)
}

/// Columns resolve from the file schema, so a file with no row groups is still
/// checked.
fn read_parquet(path: &Path) -> Result<Vec<Delivery>> {
    let file = fs::File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let schema = reader.metadata().file_metadata().schema();
    let cols = resolve_columns(path, schema.get_fields().iter().map(|f| f.name()))?;

    let mut out = Vec::new();
    for (row_idx, row) in reader.get_row_iter(None)?.enumerate() {
        let row = row?;
        let cells: Vec<String> = cols.iter().map(|&i| parquet_cell(&row, i)).collect();
        out.push(parse_delivery(row_idx + 1, |slot| cells[slot].as_str())?);
    }
    Ok(out)
}

fn parquet_cell(row: &Row, idx: usize) -> String {
    if let Ok(s) = row.get_string(idx) {
        return s.trim().to_string();
    }
    if let Ok(v) = row.get_long(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.get_int(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.get_double(idx) {
        return format!("{v}");
    }
    if let Ok(v) = row.get_bool(idx) {
        return if v { "1".into() } else { "0".into() };
    }
    String::new()
}

fn parse_delivery<'a, F>(row: usize, cell: F) -> Result<Delivery>
where
    F: Fn(usize) -> &'a str,
{
    Ok(Delivery {
        match_id: parse_num(row, "match_id", cell(COL_MATCH_ID))?,
        over: parse_num(row, "over", cell(COL_OVER))?,
        ball: parse_num(row, "ball", cell(COL_BALL))?,
        batting_team: cell(COL_BATTING_TEAM).to_string(),
        bowling_team: cell(COL_BOWLING_TEAM).to_string(),
        batter: cell(COL_BATTER).to_string(),
        non_striker: cell(COL_NON_STRIKER).to_string(),
        bowler: cell(COL_BOWLER).to_string(),
        batsman_runs: parse_num(row, "batsman_runs", cell(COL_BATSMAN_RUNS))?,
        total_runs: parse_num(row, "total_runs", cell(COL_TOTAL_RUNS))?,
        extras_type: ExtrasType::parse(cell(COL_EXTRAS_TYPE)),
        extra_runs: parse_num(row, "extra_runs", cell(COL_EXTRA_RUNS))?,
        is_wicket: parse_flag(row, cell(COL_IS_WICKET))?,
        dismissal_kind: DismissalKind::parse(cell(COL_DISMISSAL_KIND)),
        player_dismissed: optional_name(cell(COL_PLAYER_DISMISSED)),
    })
}

fn parse_num<T: std::str::FromStr>(row: usize, column: &'static str, raw: &str) -> Result<T> {
    // pandas exports integer columns with NaNs as floats ("3.0")
    let trimmed = raw.strip_suffix(".0").unwrap_or(raw);
    trimmed.parse::<T>().map_err(|_| CricketError::BadRow {
        row,
        column,
        value: raw.to_string(),
    })
}

fn parse_flag(row: usize, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Ok(true),
        "0" | "0.0" | "false" | "no" | "" => Ok(false),
        _ => Err(CricketError::BadRow {
            row,
            column: "is_wicket",
            value: raw.to_string(),
        }),
    }
}

fn optional_name(raw: &str) -> Option<String> {
    match raw.to_ascii_lowercase().as_str() {
        "" | "na" | "nan" | "none" => None,
        _ => Some(raw.to_string()),
    }
}

/// Default location of the delivery table when nothing is configured.
pub fn default_deliveries_path() -> PathBuf {
    PathBuf::from("dataset/deliveries.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::fixtures::*;

    #[test]
    fn store_sorts_chronologically() {
        let mut late = ball("A", "X", 7, 4);
        late.ball = 2;
        let mut early = ball("A", "X", 2, 1);
        early.ball = 5;
        let mut other_match = ball("A", "X", 0, 6);
        other_match.match_id = 0;
        let store = DeliveryStore::from_deliveries(vec![late, early, other_match]);
        let runs: Vec<u32> = store.deliveries().iter().map(|d| d.batsman_runs).collect();
        assert_eq!(runs, vec![6, 1, 4]);
    }

    #[test]
    fn indexes_filter_by_player() {
        let store = DeliveryStore::from_deliveries(vec![
            ball("A", "X", 0, 1),
            ball("B", "X", 0, 2),
            ball("A", "Y", 1, 3),
        ]);
        assert_eq!(store.for_batter("A").len(), 2);
        assert_eq!(store.for_bowler("X").len(), 2);
        assert_eq!(store.for_pair("A", "Y").len(), 1);
        assert!(store.for_batter("nobody").is_empty());
        assert_eq!(store.opponents_of("A"), vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(store.batters_by_runs()[0], ("A".to_string(), 4));
    }

    #[test]
    fn missing_columns_are_reported_together() {
        let err = resolve_columns(Path::new("x.csv"), ["match_id", "over", "ball"]).unwrap_err();
        match err {
            CricketError::MissingColumns { columns, .. } => {
                assert_eq!(columns.len(), 12);
                assert!(columns.contains(&"player_dismissed".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parse_num_accepts_float_exports() {
        assert_eq!(parse_num::<u8>(1, "over", "3.0").unwrap(), 3);
        assert!(parse_num::<u8>(1, "over", "three").is_err());
    }
}
