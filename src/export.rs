use std::path::Path;

use anyhow::{Context, Result, bail};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::batting::BattingProfile;
use crate::bowling::BowlingProfile;
use crate::dataset::DeliveryStore;
use crate::sequence::IntervalBucket;
use crate::stats::{Analysis, Tally};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub sheets: Vec<String>,
    pub rows: usize,
}

/// Writes every profile `player` has (batting, bowling or both) to one workbook.
pub fn export_player(
    store: &DeliveryStore,
    player: &str,
    analysis: &Analysis,
    path: &Path,
) -> Result<ExportReport> {
    let batting = store.batting_profile(player, analysis);
    let bowling = store.bowling_profile(player, analysis);
    if batting.is_none() && bowling.is_none() {
        bail!("no deliveries found for {player}");
    }

    let mut sheets: Vec<(String, Vec<Vec<String>>)> = Vec::new();
    if let Some(p) = &batting {
        sheets.extend(batting_sheets(p));
    }
    if let Some(p) = &bowling {
        sheets.extend(bowling_sheets(p));
    }

    let mut workbook = Workbook::new();
    let mut report = ExportReport::default();
    for (name, rows) in &sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rows(sheet, rows)?;
        report.sheets.push(name.clone());
        report.rows += rows.len().saturating_sub(1);
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(report)
}

fn batting_sheets(p: &BattingProfile) -> Vec<(String, Vec<Vec<String>>)> {
    let s = &p.summary;
    let summary = vec![
        header(&["Metric", "Value"]),
        kv("Batter", &p.batter),
        kv("Matches", s.matches),
        kv("Runs", s.runs),
        kv("Balls", s.legal_balls),
        kv("Dismissals", s.dismissals),
        kv("Fours", s.fours),
        kv("Sixes", s.sixes),
        kv("Strike Rate", fmt2(s.strike_rate)),
        kv("Average", fmt2(s.average)),
        kv("Dot %", fmt2(s.dot_pct)),
        kv("Boundary %", fmt2(s.boundary_pct)),
        kv("Frustration Index", fmt2(p.insights.frustration_index)),
        kv(
            &format!("Boundary in next {}", p.insights.horizon),
            fmt2(p.insights.boundary_probability),
        ),
        kv(
            &format!("Dismissal in next {}", p.insights.horizon),
            fmt2(p.insights.wicket_probability),
        ),
    ];

    let mut phases = vec![header(&[
        "Phase", "Runs", "Balls", "Fours", "Sixes", "Strike Rate", "Dot %", "Boundary %",
    ])];
    for ph in &p.phases {
        phases.push(vec![
            ph.phase.to_string(),
            ph.runs.to_string(),
            ph.legal_balls.to_string(),
            ph.fours.to_string(),
            ph.sixes.to_string(),
            fmt2(ph.strike_rate),
            fmt2(ph.dot_pct),
            fmt2(ph.boundary_pct),
        ]);
    }

    let mut matchups = vec![header(&["List", "Name", "Value"])];
    matchups.extend(tally_rows("Favourite bowler (runs)", &p.favourite_bowlers));
    matchups.extend(tally_rows("Kryptonite (dismissals)", &p.kryptonite));
    matchups.extend(tally_rows("Favourite team (runs)", &p.favourite_teams));

    vec![
        ("BattingSummary".to_string(), summary),
        ("BattingPhases".to_string(), phases),
        ("BattingMatchups".to_string(), matchups),
        ("BattingPacing".to_string(), bucket_rows("Strike Rate", &p.pacing)),
    ]
}

fn bowling_sheets(p: &BowlingProfile) -> Vec<(String, Vec<Vec<String>>)> {
    let s = &p.summary;
    let summary = vec![
        header(&["Metric", "Value"]),
        kv("Bowler", &p.bowler),
        kv("Matches", s.matches),
        kv("Overs", s.overs_label()),
        kv("Runs Conceded", s.runs_conceded),
        kv("Wickets", s.wickets),
        kv("Economy", fmt2(s.economy)),
        kv("Average", fmt2(s.average)),
        kv("Strike Rate", fmt2(s.strike_rate)),
        kv("Dot %", fmt2(s.dot_pct)),
        kv("Setup Index", fmt2(p.insights.setup_index)),
        kv(
            &format!("Wicket in next {}", p.insights.horizon),
            fmt2(p.insights.wicket_probability),
        ),
        kv(
            &format!("Boundary in next {}", p.insights.horizon),
            fmt2(p.insights.boundary_probability),
        ),
    ];

    let mut phases = vec![header(&[
        "Phase", "Balls", "Runs", "Wickets", "Economy", "Dot %", "Wicket %",
    ])];
    for ph in &p.phases {
        phases.push(vec![
            ph.phase.to_string(),
            ph.legal_balls.to_string(),
            ph.runs_conceded.to_string(),
            ph.wickets.to_string(),
            fmt2(ph.economy),
            fmt2(ph.dot_pct),
            fmt2(ph.wicket_pct),
        ]);
    }

    let mut matchups = vec![header(&["List", "Name", "Value"])];
    matchups.extend(tally_rows("Bunny (dismissals)", &p.bunnies));
    matchups.extend(tally_rows("Smasher (runs)", &p.smashers));
    matchups.extend(tally_rows("Favourite opponent (wickets)", &p.favourite_opponents));
    for (method, count) in &p.dismissal_methods {
        matchups.push(vec![
            "Dismissal method".to_string(),
            method.clone(),
            count.to_string(),
        ]);
    }

    let mut overs = vec![header(&["Over", "Runs", "Wickets", "Matches"])];
    for o in &p.by_over {
        overs.push(vec![
            o.over.to_string(),
            o.runs_conceded.to_string(),
            o.wickets.to_string(),
            o.matches.to_string(),
        ]);
    }

    vec![
        ("BowlingSummary".to_string(), summary),
        ("BowlingPhases".to_string(), phases),
        ("BowlingMatchups".to_string(), matchups),
        ("BowlingOvers".to_string(), overs),
        ("BowlingSpell".to_string(), bucket_rows("Economy", &p.spell)),
    ]
}

fn bucket_rows(rate: &str, buckets: &[IntervalBucket]) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Balls", "Count", "Runs", "Boundaries", "Wickets", rate, "Momentum", "Aggression", "Risk",
    ])];
    for b in buckets {
        rows.push(vec![
            format!("{}-{}", b.first_ball, b.last_ball),
            b.balls.to_string(),
            b.runs.to_string(),
            b.boundaries.to_string(),
            b.wickets.to_string(),
            fmt2(b.rate),
            fmt2(b.momentum),
            fmt2(b.aggression),
            fmt2(b.risk),
        ]);
    }
    rows
}

fn tally_rows(list: &str, tallies: &[Tally]) -> Vec<Vec<String>> {
    tallies
        .iter()
        .map(|t| vec![list.to_string(), t.name.clone(), t.value.to_string()])
        .collect()
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn kv<T: std::fmt::Display>(key: &str, value: T) -> Vec<String> {
    vec![key.to_string(), value.to_string()]
}

fn fmt2(v: f64) -> String {
    format!("{v:.2}")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;
    use crate::delivery::fixtures::*;

    #[test]
    fn all_rounder_gets_both_sheet_sets() {
        let store = DeliveryStore::from_deliveries(sequence(vec![
            ball("Jadeja", "Starc", 0, 4),
            ball("Head", "Jadeja", 1, 1),
            wicket("Head", "Jadeja", 1, DismissalKind::Lbw),
        ]));
        let analysis = Analysis::default();
        let bat = store.batting_profile("Jadeja", &analysis).expect("batting");
        let bowl = store.bowling_profile("Jadeja", &analysis).expect("bowling");
        let names: Vec<String> = batting_sheets(&bat)
            .into_iter()
            .chain(bowling_sheets(&bowl))
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names.len(), 9);
        assert!(names.iter().all(|n| n.len() <= 31));
    }

    #[test]
    fn unknown_player_is_an_error() {
        let store = DeliveryStore::from_deliveries(vec![ball("A", "B", 0, 1)]);
        let path = std::env::temp_dir().join("cricket_insights_unknown.xlsx");
        assert!(export_player(&store, "Nobody", &Analysis::default(), &path).is_err());
    }
}
