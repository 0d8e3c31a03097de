//! Cricket analytics CLI: player profiles, matchups and match simulation.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use cricket_insights::batting::BattingProfile;
use cricket_insights::bowling::BowlingProfile;
use cricket_insights::config::Config;
use cricket_insights::encoding::EncodingTable;
use cricket_insights::head_to_head::HeadToHead;
use cricket_insights::predictor::{OutcomeModel, SampledSoftmax, SoftmaxModel};
use cricket_insights::sequence::{IntervalBucket, SetupWindow};
use cricket_insights::simulator::{
    self, InningsResult, MatchResult, MatchSetup, SimulationSetup, Squad,
};
use cricket_insights::stats::Tally;
use cricket_insights::{DeliveryStore, export, logging};

#[derive(Parser)]
#[command(name = "cricket_insights")]
#[command(about = "Ball-by-ball cricket analytics and match simulation", long_about = None)]
struct Cli {
    /// Delivery dataset (CSV or Parquet)
    #[arg(long, global = true, env = "CRICKET_DELIVERIES_PATH")]
    data: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Balls ahead for event probabilities
    #[arg(long, global = true)]
    horizon: Option<u32>,

    /// Stop the setup-index lookback at match boundaries
    #[arg(long, global = true)]
    within_match: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Batting profile of one player
    Batter { name: String },
    /// Bowling profile of one player
    Bowler { name: String },
    /// Batter against bowler
    H2h { batter: String, bowler: String },
    /// Leading run scorers and wicket takers
    Players {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Simulate an innings or a full match
    Simulate {
        /// Match setup file (JSON); otherwise squads come from the encoding rosters
        #[arg(long)]
        setup: Option<PathBuf>,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        away: Option<String>,
        #[arg(long)]
        venue: Option<String>,
        /// Encoding artifact
        #[arg(long, env = "CRICKET_ENCODINGS_PATH")]
        encodings: Option<PathBuf>,
        /// Outcome model artifact
        #[arg(long, env = "CRICKET_MODEL_PATH")]
        model: Option<PathBuf>,
        /// Sample outcomes from the class probabilities instead of argmax
        #[arg(long)]
        sampled: bool,
        #[arg(long, env = "CRICKET_SEED")]
        seed: Option<u64>,
        /// Only the home side's innings
        #[arg(long)]
        innings_only: bool,
        #[arg(long)]
        super_over: bool,
    },
    /// Write a player's profiles to an xlsx workbook
    Export {
        name: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // dotenv files load before clap and the subscriber so both see them
    let cfg = Config::from_env();
    logging::init_logging(cfg.log_filter.as_deref());
    let cli = Cli::parse();
    match run(cli, cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut cfg: Config) -> Result<()> {
    if let Some(path) = cli.data {
        cfg.deliveries_path = path;
    }
    if let Some(h) = cli.horizon {
        cfg.set_horizon(h);
    }
    if cli.within_match {
        cfg.analysis.setup_window = SetupWindow::WithinMatch;
    }
    let analysis = cfg.analysis;

    match cli.command {
        Commands::Batter { name } => {
            let store = load_store(&cfg)?;
            let profile = store
                .batting_profile(&name, &analysis)
                .ok_or_else(|| anyhow!("{name} has not faced a ball in the dataset"))?;
            emit(cli.json, &profile, print_batting)
        }
        Commands::Bowler { name } => {
            let store = load_store(&cfg)?;
            let profile = store
                .bowling_profile(&name, &analysis)
                .ok_or_else(|| anyhow!("{name} has not bowled a ball in the dataset"))?;
            emit(cli.json, &profile, print_bowling)
        }
        Commands::H2h { batter, bowler } => {
            let store = load_store(&cfg)?;
            let h2h = store.head_to_head(&batter, &bowler, &analysis);
            emit(cli.json, &h2h, print_head_to_head)
        }
        Commands::Players { limit } => {
            let store = load_store(&cfg)?;
            let rankings = Rankings {
                batters: store
                    .batters_by_runs()
                    .into_iter()
                    .take(limit)
                    .map(|(name, runs)| Tally {
                        name,
                        value: runs as usize,
                    })
                    .collect(),
                bowlers: store
                    .bowlers_by_wickets()
                    .into_iter()
                    .take(limit)
                    .map(|(name, value)| Tally { name, value })
                    .collect(),
            };
            emit(cli.json, &rankings, print_rankings)
        }
        Commands::Simulate {
            setup,
            home,
            away,
            venue,
            encodings,
            model,
            sampled,
            seed,
            innings_only,
            super_over,
        } => {
            let encodings = encodings.unwrap_or_else(|| cfg.encodings_path.clone());
            let table = EncodingTable::load(&encodings)
                .with_context(|| format!("load encodings {}", encodings.display()))?;
            let model_path = model.unwrap_or_else(|| cfg.model_path.clone());
            let softmax = SoftmaxModel::load(&model_path)
                .with_context(|| format!("load outcome model {}", model_path.display()))?;
            let seed = seed.or(cfg.seed).unwrap_or_else(rand::random);
            let model: Box<dyn OutcomeModel> = if sampled {
                Box::new(SampledSoftmax::new(softmax, seed))
            } else {
                Box::new(softmax)
            };

            let mut match_setup = match setup {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .with_context(|| format!("read match setup {}", path.display()))?;
                    serde_json::from_str::<MatchSetup>(&raw)
                        .with_context(|| format!("parse match setup {}", path.display()))?
                }
                None => roster_setup(&table, home, away, venue)?,
            };
            match_setup.super_over |= super_over;

            if innings_only {
                let innings = SimulationSetup {
                    venue: match_setup.venue.clone(),
                    batting: match_setup.home.clone(),
                    bowling: match_setup.away.clone(),
                    innings: 1,
                    super_over: match_setup.super_over,
                    target: None,
                };
                let result = simulator::simulate_innings(&table, model.as_ref(), &innings)?;
                emit(cli.json, &result, print_innings)
            } else {
                let mut rng = StdRng::seed_from_u64(seed);
                let result =
                    simulator::simulate_match(&table, model.as_ref(), &match_setup, &mut rng)?;
                emit(cli.json, &result, print_match)
            }
        }
        Commands::Export { name, out } => {
            let store = load_store(&cfg)?;
            let path = out.unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", file_stem(&name))));
            let report = export::export_player(&store, &name, &analysis, &path)?;
            println!(
                "wrote {} ({} sheets, {} rows)",
                path.display(),
                report.sheets.len(),
                report.rows
            );
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct Rankings {
    batters: Vec<Tally>,
    bowlers: Vec<Tally>,
}

fn load_store(cfg: &Config) -> Result<DeliveryStore> {
    DeliveryStore::load(&cfg.deliveries_path)
        .with_context(|| format!("load deliveries {}", cfg.deliveries_path.display()))
}

fn emit<T: Serialize>(json: bool, value: &T, text: fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

/// First eleven of each roster bat in listed order; the last five bowl.
fn roster_setup(
    table: &EncodingTable,
    home: Option<String>,
    away: Option<String>,
    venue: Option<String>,
) -> Result<MatchSetup> {
    let (Some(home), Some(away)) = (home, away) else {
        bail!("simulate needs --setup or both --home and --away");
    };
    let venue = match venue {
        Some(v) => v,
        None => table
            .venues()
            .first()
            .map(|v| v.to_string())
            .ok_or_else(|| anyhow!("encoding table has no venues; pass --venue"))?,
    };
    let squad = |team: &str| -> Result<Squad> {
        let roster = table.roster(team);
        if roster.len() < 2 {
            bail!("no roster for {team} in the encoding table");
        }
        let xi: Vec<String> = roster.iter().take(11).cloned().collect();
        let bowlers: Vec<String> = xi.iter().rev().take(5).rev().cloned().collect();
        Ok(Squad {
            team: team.to_string(),
            batting_order: xi,
            bowlers,
        })
    };
    Ok(MatchSetup {
        home: squad(&home)?,
        away: squad(&away)?,
        venue,
        super_over: false,
    })
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn print_tallies(title: &str, rows: &[Tally]) {
    if rows.is_empty() {
        return;
    }
    println!("{title}:");
    for t in rows {
        println!("  {:<28} {}", t.name, t.value);
    }
}

fn print_buckets(title: &str, rate: &str, rows: &[IntervalBucket]) {
    if rows.is_empty() {
        return;
    }
    println!("{title}:");
    println!(
        "  {:<9} {:>5} {:>5} {:>8} {:>9} {:>6}",
        "balls", "runs", "wkts", rate, "momentum", "risk"
    );
    for b in rows {
        println!(
            "  {:<9} {:>5} {:>5} {:>8.1} {:>+9.1} {:>6.2}",
            format!("{}-{}", b.first_ball, b.last_ball),
            b.runs,
            b.wickets,
            b.rate,
            b.momentum,
            b.risk
        );
    }
}

fn print_batting(p: &BattingProfile) {
    let s = &p.summary;
    println!("{} (batting)", p.batter);
    println!(
        "  matches {}  runs {}  balls {}  outs {}  SR {:.1}  avg {:.1}",
        s.matches, s.runs, s.legal_balls, s.dismissals, s.strike_rate, s.average
    );
    println!(
        "  4s {}  6s {}  dot% {:.1}  boundary% {:.1}",
        s.fours, s.sixes, s.dot_pct, s.boundary_pct
    );
    for ph in &p.phases {
        println!(
            "  {:<10} runs {:>5}  balls {:>5}  SR {:>6.1}  dot% {:>5.1}",
            ph.phase.label(),
            ph.runs,
            ph.legal_balls,
            ph.strike_rate,
            ph.dot_pct
        );
    }
    let i = &p.insights;
    println!(
        "  frustration index {:.2}  boundary in next {} {:.1}%  dismissal in next {} {:.1}%",
        i.frustration_index, i.horizon, i.boundary_probability, i.horizon, i.wicket_probability
    );
    print_tallies("favourite bowlers", &p.favourite_bowlers);
    print_tallies("kryptonite", &p.kryptonite);
    print_tallies("favourite teams", &p.favourite_teams);
    print_buckets("pacing", "SR", &p.pacing);
}

fn print_bowling(p: &BowlingProfile) {
    let s = &p.summary;
    println!("{} (bowling)", p.bowler);
    println!(
        "  matches {}  overs {}  runs {}  wkts {}  econ {:.2}  avg {:.1}  SR {:.1}  dot% {:.1}",
        s.matches,
        s.overs_label(),
        s.runs_conceded,
        s.wickets,
        s.economy,
        s.average,
        s.strike_rate,
        s.dot_pct
    );
    for ph in &p.phases {
        println!(
            "  {:<10} balls {:>5}  wkts {:>3}  econ {:>5.2}  dot% {:>5.1}",
            ph.phase.label(),
            ph.legal_balls,
            ph.wickets,
            ph.economy,
            ph.dot_pct
        );
    }
    let i = &p.insights;
    println!(
        "  setup index {:.2}  wicket in next {} {:.1}%  boundary in next {} {:.1}%",
        i.setup_index, i.horizon, i.wicket_probability, i.horizon, i.boundary_probability
    );
    print_tallies("bunnies", &p.bunnies);
    print_tallies("smashers", &p.smashers);
    print_tallies("favourite opponents", &p.favourite_opponents);
    if !p.dismissal_methods.is_empty() {
        println!("dismissal methods:");
        for (kind, n) in &p.dismissal_methods {
            println!("  {kind:<28} {n}");
        }
    }
    print_buckets("spell", "econ", &p.spell);
}

fn print_head_to_head(h2h: &HeadToHead) {
    let report = match h2h {
        HeadToHead::NoData { batter, bowler, .. } => {
            println!("no deliveries between {batter} and {bowler}");
            return;
        }
        HeadToHead::Found(report) => report,
    };
    let s = &report.summary;
    println!("{} vs {}", report.batter, report.bowler);
    println!("  {}", report.verdict.describe(&report.batter, &report.bowler));
    println!(
        "  runs {}  balls {}  outs {}  SR {:.1}  dot% {:.1}",
        s.runs, s.legal_balls, s.dismissals, s.strike_rate, s.dot_pct
    );
    let grid: Vec<String> = report
        .outcome_grid
        .iter()
        .map(|o| format!("{}:{:.1}%", o.outcome, o.pct))
        .collect();
    println!("  outcomes {}", grid.join("  "));
    for m in &report.consistency {
        println!(
            "  meeting {:>2} (match {}) {} off {} SR {:.1}",
            m.seq, m.match_id, m.runs, m.legal_balls, m.strike_rate
        );
    }
    let sc = &report.scatter;
    if !sc.points.is_empty() {
        println!(
            "  vs {} bowlers: mean boundary% {:.1}  mean wicket% {:.1}",
            sc.points.len(),
            sc.mean_boundary_pct,
            sc.mean_wicket_pct
        );
    }
}

fn print_rankings(r: &Rankings) {
    print_tallies("runs", &r.batters);
    print_tallies("wickets", &r.bowlers);
}

fn print_innings(r: &InningsResult) {
    for ball in &r.log {
        println!("{ball}");
    }
    println!(
        "{} {}/{} ({} ov) vs {}",
        r.batting_team,
        r.score,
        r.wickets,
        r.overs_label(),
        r.bowling_team
    );
    for b in &r.batting {
        let status = if b.out { "" } else { "*" };
        println!("  {:<24} {}{} ({})", b.name, b.runs, status, b.balls);
    }
    for b in &r.bowling {
        println!(
            "  {:<24} {}-{}-{} econ {:.2}",
            b.name, b.overs, b.runs, b.wickets, b.economy
        );
    }
}

fn print_match(m: &MatchResult) {
    println!("{}", m.toss);
    print_innings(&m.first);
    print_innings(&m.second);
    println!("{}", m.outcome);
}
