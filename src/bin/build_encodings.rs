use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use cricket_insights::config::Config;
use cricket_insights::encoding::{self, EncodingTable};
use cricket_insights::logging;

const DEFAULT_INPUT: &str = "dataset/categories_with_encoding.csv";

fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::init_logging(cfg.log_filter.as_deref());

    let input = parse_path_arg("--input").unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let out_path = parse_path_arg("--out").unwrap_or(cfg.encodings_path);

    let artifact = encoding::artifact_from_wide_csv(&input)
        .with_context(|| format!("read wide encoding csv {}", input.display()))?;

    // Fail here rather than at simulation time if a width is off.
    let table = EncodingTable::from_artifact(artifact.clone()).context("validate artifact")?;
    for category in encoding::Category::ALL {
        let names = table.names(category);
        if names.is_empty() {
            eprintln!("[WARN] no {category} entries in {}", input.display());
        } else {
            println!("{category}: {} names", names.len());
        }
    }
    println!(
        "players with ratings: {}, teams with rosters: {}",
        artifact.players.len(),
        artifact.rosters.len()
    );

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let raw = serde_json::to_string_pretty(&artifact).context("serialize encodings")?;
    fs::write(&out_path, raw).with_context(|| format!("write {}", out_path.display()))?;

    println!("encoding artifact written: {}", out_path.display());
    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix)
            && !v.trim().is_empty()
        {
            return Some(PathBuf::from(v.trim()));
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}
