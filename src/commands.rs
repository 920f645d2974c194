//! Subcommand handlers for batch use.

use crate::app::App;
use crate::cli::{EpsCommand, EpsSetArgs, RecordAddArgs, RecordCommand, StockCommand};
use crate::config::Config;
use crate::error::StoreError;
use crate::export::{export_file_name, export_records, read_snapshot_file, write_snapshot_file};
use crate::extract::{ExtractedFields, Extractor};
use crate::models::EpsProfile;
use crate::ocr::{OcrOutcome, TesseractEngine, scan_image};
use crate::store::{NewRecord, normalize_quarter, normalize_ticker};
use crate::ui::{format_price, format_ratio};
use crate::valuation::{quarter_sort_key, ttm_eps};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Handle `stock` subcommands.
pub fn run_stock(app: &mut App, command: StockCommand) -> Result<()> {
    match command {
        StockCommand::Add { ticker, name } => {
            let stock = app.add_stock(&ticker, &name)?;
            println!("Registered {} ({})", stock.ticker, stock.name);
        }
        StockCommand::List => {
            let store = app.store();
            if store.stocks().is_empty() {
                println!("No stocks registered yet. Add one with `stonklog stock add <TICKER> <NAME>`.");
                return Ok(());
            }
            println!("{:<10} {:<30} {:<10} {:>10}", "TICKER", "NAME", "EPS MODE", "EPS");
            for stock in store.stocks() {
                let profile = store.peek_eps_profile(&stock.ticker).cloned().unwrap_or_default();
                println!(
                    "{:<10} {:<30} {:<10} {:>10}",
                    stock.ticker,
                    stock.name,
                    profile.mode.to_string(),
                    format_ratio(profile.resolve())
                );
            }
        }
    }
    Ok(())
}

/// Run OCR with the configured engine.
async fn scan(config: &Config, image: &Path) -> Result<OcrOutcome> {
    let extractor = Extractor::new(&config.ocr.price_patterns)?;
    let engine = TesseractEngine::new(config.ocr.command.clone());
    Ok(scan_image(&engine, &extractor, image, &config.ocr.language).await)
}

/// Handle `record` subcommands.
pub async fn run_record(app: &mut App, config: &Config, command: RecordCommand) -> Result<()> {
    match command {
        RecordCommand::Add(add) => add_record(app, config, add).await,
        RecordCommand::List { ticker, format } => {
            let ticker = ticker.map(|t| normalize_ticker(&t));
            let records = app.store().records_for(ticker.as_deref());
            print!("{}", export_records(&records, format.into())?);
            Ok(())
        }
        RecordCommand::Remove { id } => {
            let record = app.remove_record(&id)?;
            println!("Removed {} {} {}", record.id, record.date, record.ticker);
            Ok(())
        }
    }
}

/// Values read from an image that a record has no place for.
fn unstored_fields_note(fields: &ExtractedFields) -> Option<String> {
    let found: Vec<String> = [("EPS", fields.eps), ("PER", fields.per), ("PBR", fields.pbr)]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{} {}", label, v)))
        .collect();
    if found.is_empty() {
        return None;
    }
    Some(format!(
        "Also read {} from the image. Records keep price and BPS only; \
         PER and PBR are derived from the EPS profile (`stonklog eps set`).",
        found.join(", ")
    ))
}

async fn add_record(app: &mut App, config: &Config, add: RecordAddArgs) -> Result<()> {
    let mut price = add.price;
    let mut bps = add.bps;

    if let Some(ref image) = add.image {
        if price.is_none() || bps.is_none() {
            let outcome = scan(config, image).await?;
            eprintln!("{}", outcome.status);
            if price.is_none() {
                if let Some(found) = outcome.fields.price {
                    if !found.confirmed {
                        eprintln!(
                            "Warning: price {} was not next to a label; check it before relying on it.",
                            found.value
                        );
                    }
                    price = Some(found.value);
                }
            }
            bps = bps.or(outcome.fields.bps);
            if let Some(note) = unstored_fields_note(&outcome.fields) {
                eprintln!("{}", note);
            }
        }
    }

    let Some(price) = price else {
        if let Some(image) = add.image {
            bail!("No price found in {}; pass --price", image.display());
        }
        bail!("Ticker, date and price are required: pass --price or --image");
    };

    let record = app.add_record(NewRecord {
        ticker: add.ticker,
        date: add.date,
        price,
        bps,
        memo: add.memo,
    })?;

    println!(
        "Added {}: {} {} price {} EPS {} ({}) PER {}",
        record.id,
        record.ticker,
        record.date,
        format_price(record.price),
        format_ratio(record.eps_used),
        record.eps_mode,
        format_ratio(record.per)
    );
    Ok(())
}

fn require_stock(app: &App, ticker: &str) -> Result<String> {
    let ticker = normalize_ticker(ticker);
    if !app.store().has_stock(&ticker) {
        return Err(StoreError::UnknownTicker(ticker).into());
    }
    Ok(ticker)
}

fn print_profile(ticker: &str, profile: &EpsProfile) {
    println!("{} EPS profile", ticker);
    println!("  Mode:      {}", profile.mode);
    println!("  Fixed:     {}", format_ratio(profile.fixed_eps));
    println!("  Forward:   {}", format_ratio(profile.forward_eps));

    let mut quarters: Vec<_> = profile.quarterly.iter().collect();
    quarters.sort_by_key(|q| quarter_sort_key(&q.quarter));
    if quarters.is_empty() {
        println!("  Quarters:  (none)");
    } else {
        println!("  Quarters:");
        for q in quarters {
            println!("    {:<8} {:>10.2}", q.quarter, q.eps);
        }
    }
    println!("  TTM:       {}", format_ratio(ttm_eps(&profile.quarterly)));
    println!("  Resolved:  {}", format_ratio(profile.resolve()));
}

fn apply_set(mut profile: EpsProfile, set: &EpsSetArgs) -> EpsProfile {
    if let Some(mode) = set.mode {
        profile.mode = mode.into();
    }
    if set.clear_fixed {
        profile.fixed_eps = None;
    }
    if let Some(v) = set.fixed {
        profile.fixed_eps = Some(v);
    }
    if set.clear_forward {
        profile.forward_eps = None;
    }
    if let Some(v) = set.forward {
        profile.forward_eps = Some(v);
    }
    profile
}

/// Handle `eps` subcommands.
pub fn run_eps(app: &mut App, command: EpsCommand) -> Result<()> {
    match command {
        EpsCommand::Show { ticker } => {
            let ticker = require_stock(app, &ticker)?;
            let profile = app.eps_profile(&ticker);
            print_profile(&ticker, &profile);
        }
        EpsCommand::Set(set) => {
            let ticker = require_stock(app, &set.ticker)?;
            let profile = apply_set(app.eps_profile(&ticker), &set);
            let touched = app.set_eps_profile(&ticker, profile)?;
            let resolved = app.eps_profile(&ticker).resolve();
            println!(
                "Updated {}: EPS {}, recomputed {} record(s)",
                ticker,
                format_ratio(resolved),
                touched
            );
        }
        EpsCommand::Quarter { ticker, quarter, eps } => {
            let touched = app.add_or_update_quarter(&ticker, &quarter, eps)?;
            let ticker = normalize_ticker(&ticker);
            let resolved = app.eps_profile(&ticker).resolve();
            println!(
                "Recorded {} {} = {}; EPS {}, recomputed {} record(s)",
                ticker,
                normalize_quarter(&quarter),
                eps,
                format_ratio(resolved),
                touched
            );
        }
        EpsCommand::RemoveQuarter { ticker, quarter } => {
            let touched = app.remove_quarter(&ticker, &quarter)?;
            println!(
                "Removed {} {}; recomputed {} record(s)",
                normalize_ticker(&ticker),
                normalize_quarter(&quarter),
                touched
            );
        }
    }
    Ok(())
}

/// Handle `export`.
pub async fn run_export(app: &App, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now().date_naive())));
    let written = write_snapshot_file(&app.snapshot(), &path).await?;
    println!("Exported to {}", written.display());
    Ok(())
}

/// Handle `import`. A bad file leaves the current data untouched.
pub async fn run_import(app: &mut App, file: &Path) -> Result<()> {
    let snapshot = read_snapshot_file(file).await?;
    app.import(snapshot)?;
    println!(
        "Imported {} stock(s) and {} record(s)",
        app.store().stocks().len(),
        app.store().records().len()
    );
    Ok(())
}

/// Handle `ocr`.
pub async fn run_ocr(config: &Config, image: &Path) -> Result<()> {
    let outcome = scan(config, image).await?;
    println!("{}", outcome.status);

    let fields = outcome.fields;
    if let Some(price) = fields.price {
        let note = if price.confirmed { "" } else { " (unlabeled, verify)" };
        println!("  Price: {}{}", price.value, note);
    }
    for (label, value) in [
        ("EPS", fields.eps),
        ("BPS", fields.bps),
        ("PER", fields.per),
        ("PBR", fields.pbr),
    ] {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }
    Ok(())
}

/// Handle `config`.
pub fn run_config(explicit: Option<&Path>, config: &Config, init: bool) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(Config::default_config_path)
        .context("Could not determine a config directory; pass --config")?;

    if init {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(&path, crate::config::sample_config())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        println!("Wrote sample config to {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config).context("Failed to serialize configuration")?);
    Ok(())
}
