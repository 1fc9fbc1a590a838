#![deny(warnings)]

//! Headless CLI: reads an empire export and tech assignments, prints the
//! payback of every next mine level.

use anyhow::{bail, Context, Result};
use roi_catalog::BonusCatalog;
use roi_core::input::sites_from_json;
use roi_core::{Resource, ResourceTriple, TechAssignmentConfig};
use roi_engine::{AccountReport, Engine, EngineConfig, Payback, RoiResult};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    sites: Option<PathBuf>,
    techs: Option<PathBuf>,
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
    speed: Option<f64>,
    research: Option<u32>,
    top: usize,
    json: bool,
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T> {
    let Some(value) = value else {
        bail!("{flag} needs a value");
    };
    match value.parse() {
        Ok(v) => Ok(v),
        Err(_) => bail!("invalid value for {flag}: {value:?}"),
    }
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        top: 5,
        ..Args::default()
    };
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--sites" => args.sites = it.next().map(PathBuf::from),
            "--techs" => args.techs = it.next().map(PathBuf::from),
            "--catalog" => args.catalog = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--speed" => args.speed = Some(parse_value("--speed", it.next())?),
            "--research" => args.research = Some(parse_value("--research", it.next())?),
            "--top" => args.top = parse_value("--top", it.next())?,
            "--json" => args.json = true,
            _ => {}
        }
    }
    Ok(args)
}

fn load_engine(args: &Args) -> Result<Engine> {
    let catalog = match &args.catalog {
        Some(path) => BonusCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => BonusCatalog::standard(),
    };
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(level) = args.research {
        config.research_level = Some(level);
    }
    Ok(Engine::new(catalog, config)?)
}

fn payback_days(p: &Payback) -> String {
    match p.days() {
        Some(d) => format!("{d:.1}d"),
        None => "never".to_string(),
    }
}

fn pct(t: &ResourceTriple<f64>) -> String {
    format!("{:>7.2}% {:>7.2}% {:>7.2}%", t.metal, t.crystal, t.deuterium)
}

fn print_mines(report: &AccountReport) {
    println!("== Mines ==");
    println!(
        "{:<24} {:<10} {:>14} {:>14} {:>14}",
        "Planet", "Coords", "Metal", "Crystal", "Deuterium"
    );
    for row in report.results.chunks(Resource::ALL.len()) {
        let first = &row[0];
        let cells: Vec<String> = row
            .iter()
            .map(|r| format!("{} ({})", r.current_level, payback_days(&r.payback)))
            .collect();
        println!(
            "{:<24} {:<10} {:>14} {:>14} {:>14}",
            first.site_name,
            first.coordinates.to_string(),
            cells[0],
            cells[1],
            cells[2]
        );
    }
    println!(
        "Total per hour: metal {:.0} | crystal {:.0} | deuterium {:.0}",
        report.totals.current.metal, report.totals.current.crystal, report.totals.current.deuterium
    );
}

fn print_bonuses(report: &AccountReport, names: &[(String, String)]) {
    let b = &report.bonuses;
    println!();
    println!("== Research ==");
    println!("Plasma level {} -> {}", b.research_level, pct(&b.research));

    println!();
    println!("== LF Buildings ==");
    for (id, name) in names {
        if let Some(s) = b.sites.get(&roi_core::SiteId(id.clone())) {
            let lifeform = s
                .lifeform
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<24} {:<8} {}", name, lifeform, pct(&s.buildings));
        }
    }
    println!("{:<24} {:<8} {}", "Total", "", pct(&b.buildings_total));

    println!();
    println!("== LF Techs ==");
    for (id, name) in names {
        if let Some(s) = b.sites.get(&roi_core::SiteId(id.clone())) {
            println!("{:<24} {}", name, pct(&s.technologies));
        }
    }
    println!("{:<24} {}", "Total", pct(&b.technologies_total));
}

fn print_ranking(ranked: &[&RoiResult], top: usize) {
    println!();
    println!("== Best next upgrades ==");
    for (i, r) in ranked.iter().take(top).enumerate() {
        println!(
            "{:>2}. {:<24} {:<10} {:<9} {:>3} -> {:<3} cost {:>12.0}  +{:.1}/h  {}",
            i + 1,
            r.site_name,
            r.coordinates.to_string(),
            r.resource.to_string(),
            r.current_level,
            r.next_level,
            r.cost_comparable,
            r.production_delta,
            payback_days(&r.payback)
        );
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");
    let Some(sites_path) = args.sites.as_ref() else {
        bail!("usage: roi-advisor --sites FILE [--techs FILE] [--catalog FILE] [--config FILE] [--speed X] [--research N] [--top N] [--json]");
    };

    let text = std::fs::read_to_string(sites_path)
        .with_context(|| format!("reading {}", sites_path.display()))?;
    let sites = sites_from_json(&text)?;
    let techs = match &args.techs {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            TechAssignmentConfig::from_json_str(&text)?
        }
        None => TechAssignmentConfig::default(),
    };
    let engine = load_engine(&args)?;
    let report = engine.evaluate(&sites, &techs)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let names: Vec<(String, String)> = sites
        .iter()
        .filter(|s| s.is_primary())
        .map(|s| (s.id.0.clone(), s.name.clone()))
        .collect();
    print_mines(&report);
    print_bonuses(&report, &names);
    print_ranking(&report.ranked(), args.top);
    Ok(())
}
