use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use cricket_insights::{CricketError, DeliveryStore};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

#[test]
fn loads_csv_fixture() {
    let store = DeliveryStore::load(&fixture_path("deliveries.csv")).expect("fixture should load");
    assert_eq!(store.len(), 14);
    assert_eq!(store.match_count(), 2);

    let first = &store.deliveries()[0];
    assert_eq!(first.match_id, 1);
    assert_eq!(first.over, 0);
    assert_eq!(first.batter, "RG Sharma");
    assert!(first.extras_type.is_none());
    assert!(first.player_dismissed.is_none());
}

#[test]
fn rows_of_the_same_ball_keep_file_order() {
    let store = DeliveryStore::load(&fixture_path("deliveries.csv")).expect("fixture should load");
    let third: Vec<_> = store
        .deliveries()
        .iter()
        .filter(|d| d.match_id == 1 && d.over == 0 && d.ball == 3)
        .collect();
    assert_eq!(third.len(), 2);
    assert!(third[0].is_wide());
    assert!(!third[1].is_wide());
}

#[test]
fn missing_file_is_reported() {
    let err = DeliveryStore::load(&fixture_path("no_such_file.csv")).unwrap_err();
    assert!(matches!(err, CricketError::DatasetNotFound(_)));
}

#[test]
fn every_missing_column_is_listed() {
    let err = DeliveryStore::load(&fixture_path("deliveries_missing_columns.csv")).unwrap_err();
    match err {
        CricketError::MissingColumns { columns, .. } => {
            assert!(columns.contains(&"batting_team".to_string()));
            assert!(columns.contains(&"is_wicket".to_string()));
            assert!(!columns.contains(&"bowler".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unparseable_number_names_row_and_column() {
    let raw = fs::read_to_string(fixture_path("deliveries.csv")).expect("fixture should be readable");
    let broken = raw.replacen(",0,1,RG Sharma,", ",zero,1,RG Sharma,", 1);
    let path = std::env::temp_dir().join("cricket_insights_bad_row.csv");
    fs::write(&path, broken).expect("temp file should be writable");

    let err = DeliveryStore::load(&path).unwrap_err();
    assert!(matches!(
        err,
        CricketError::BadRow {
            row: 1,
            column: "over",
            ..
        }
    ));
    fs::remove_file(&path).ok();
}

/// Integer columns of the fixture; everything else is written as UTF8.
const INT_COLUMNS: [&str; 8] = [
    "match_id",
    "inning",
    "over",
    "ball",
    "batsman_runs",
    "extra_runs",
    "total_runs",
    "is_wicket",
];

fn message_type(columns: &[String]) -> String {
    let fields: Vec<String> = columns
        .iter()
        .map(|name| {
            if INT_COLUMNS.contains(&name.as_str()) {
                format!("REQUIRED INT64 {name};")
            } else {
                format!("REQUIRED BINARY {name} (UTF8);")
            }
        })
        .collect();
    format!("message deliveries {{ {} }}", fields.join(" "))
}

/// Writes `rows` column by column into a single row group; no row group at all
/// when `rows` is empty.
fn write_parquet(path: &Path, columns: &[String], rows: &[Vec<String>]) {
    let schema = Arc::new(parse_message_type(&message_type(columns)).expect("schema should parse"));
    let props = Arc::new(WriterProperties::builder().build());
    let file = fs::File::create(path).expect("temp file should be writable");
    let mut writer = SerializedFileWriter::new(file, schema, props).expect("writer");
    if !rows.is_empty() {
        let mut group = writer.next_row_group().expect("row group");
        let mut idx = 0;
        while let Some(mut column) = group.next_column().expect("column") {
            let name = columns[idx].as_str();
            if INT_COLUMNS.contains(&name) {
                let values: Vec<i64> = rows
                    .iter()
                    .map(|r| r[idx].parse().expect("integer cell"))
                    .collect();
                column
                    .typed::<Int64Type>()
                    .write_batch(&values, None, None)
                    .expect("write ints");
            } else {
                let values: Vec<ByteArray> = rows
                    .iter()
                    .map(|r| ByteArray::from(r[idx].as_str()))
                    .collect();
                column
                    .typed::<ByteArrayType>()
                    .write_batch(&values, None, None)
                    .expect("write strings");
            }
            column.close().expect("close column");
            idx += 1;
        }
        group.close().expect("close row group");
    }
    writer.close().expect("close file");
}

fn csv_fixture_table() -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(fixture_path("deliveries.csv")).expect("fixture");
    let header = reader
        .headers()
        .expect("header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("record").iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[test]
fn parquet_copy_loads_the_same_deliveries() {
    let (columns, rows) = csv_fixture_table();
    let path = std::env::temp_dir().join("cricket_insights_deliveries.parquet");
    write_parquet(&path, &columns, &rows);

    let from_parquet = DeliveryStore::load(&path).expect("parquet should load");
    fs::remove_file(&path).ok();
    let from_csv = DeliveryStore::load(&fixture_path("deliveries.csv")).expect("fixture should load");

    assert_eq!(from_parquet.len(), 14);
    assert_eq!(from_parquet.match_count(), 2);
    assert_eq!(from_parquet.deliveries(), from_csv.deliveries());
}

#[test]
fn parquet_missing_columns_are_listed() {
    let (columns, rows) = csv_fixture_table();
    let keep: Vec<usize> = (0..columns.len())
        .filter(|&i| !matches!(columns[i].as_str(), "batting_team" | "is_wicket"))
        .collect();
    let narrow_cols: Vec<String> = keep.iter().map(|&i| columns[i].clone()).collect();
    let narrow_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
        .collect();
    let path = std::env::temp_dir().join("cricket_insights_narrow.parquet");
    write_parquet(&path, &narrow_cols, &narrow_rows);

    let err = DeliveryStore::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    match err {
        CricketError::MissingColumns { columns, .. } => {
            assert_eq!(columns, vec!["batting_team".to_string(), "is_wicket".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_parquet_is_still_checked_against_the_schema() {
    let path = std::env::temp_dir().join("cricket_insights_empty_wrong.parquet");
    write_parquet(&path, &["match_id".to_string(), "venue".to_string()], &[]);
    let err = DeliveryStore::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    match err {
        CricketError::MissingColumns { columns, .. } => assert_eq!(columns.len(), 14),
        other => panic!("unexpected error: {other}"),
    }

    let (columns, _) = csv_fixture_table();
    let path = std::env::temp_dir().join("cricket_insights_empty.parquet");
    write_parquet(&path, &columns, &[]);
    let store = DeliveryStore::load(&path).expect("an empty table with every column loads");
    fs::remove_file(&path).ok();
    assert!(store.is_empty());
}
