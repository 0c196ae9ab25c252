use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use console::style;
use mockenv_migrate::document::read_marker;
use mockenv_migrate::{
    MigrationEngine, MigrationOutcome, MigrationRegistry, MigrationReport, HIGHEST_MIGRATION_ID,
};
use serde_json::{json, Value};
use tracing::info;

use crate::template;

type Result<T = ()> = anyhow::Result<T>;

fn load(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn save(path: &Path, doc: &Value) -> Result {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}

/// The environments held by a file: an array of them, or a single one.
fn environments_mut(doc: &mut Value) -> Vec<&mut Value> {
    match doc {
        Value::Array(envs) => envs.iter_mut().collect(),
        env => vec![env],
    }
}

fn environments(doc: &Value) -> Vec<&Value> {
    match doc {
        Value::Array(envs) => envs.iter().collect(),
        env => vec![env],
    }
}

fn display_name(env: &Value, index: usize) -> String {
    env.get("name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("#{index}"), str::to_string)
}

/// Status of one environment in a file.
fn env_status(env: &Value, index: usize) -> Result<Value> {
    let engine = MigrationEngine::default();
    let map = env
        .as_object()
        .with_context(|| format!("environment #{index} is not an object"))?;
    let marker = read_marker(map).with_context(|| format!("environment #{index}"))?;
    let pending: Vec<u32> = engine.pending_steps(marker).iter().map(|s| s.id).collect();

    Ok(json!({
        "name": display_name(env, index),
        "lastMigration": marker,
        "highest": engine.highest_id(),
        "pending": pending,
        "newer": marker.map_or(false, |m| m > engine.highest_id()),
    }))
}

/// `mockenv status <file>` — Show schema versions and pending migrations.
pub fn status(path: &Path, as_json: bool) -> Result {
    let doc = load(path)?;
    let statuses = environments(&doc)
        .into_iter()
        .enumerate()
        .map(|(i, env)| env_status(env, i))
        .collect::<Result<Vec<_>>>()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("File: {}", path.display());
    println!("Current schema: migration {HIGHEST_MIGRATION_ID}");
    println!();
    println!("  {:<30} {:>8}  {}", "Environment", "Version", "Pending");
    println!("  {}", "-".repeat(60));

    for status in &statuses {
        let version = status["lastMigration"]
            .as_u64()
            .map_or_else(|| "-".to_string(), |m| m.to_string());
        let pending = status["pending"].as_array().map_or(0, Vec::len);
        let state = if status["newer"].as_bool() == Some(true) {
            style("newer release".to_string()).yellow()
        } else if pending == 0 {
            style("up to date".to_string()).green()
        } else {
            style(format!("{pending} pending")).cyan()
        };
        println!(
            "  {:<30} {:>8}  {}",
            truncate(status["name"].as_str().unwrap_or_default(), 30),
            version,
            state
        );
    }
    println!();

    Ok(())
}

/// Migrate every environment in `doc`, reporting per environment.
fn migrate_document(doc: &mut Value, to: Option<u32>) -> Result<Vec<MigrationReport>> {
    let engine = MigrationEngine::default();
    environments_mut(doc)
        .into_iter()
        .enumerate()
        .map(|(i, env)| {
            let name = display_name(env, i);
            let result = match to {
                Some(target) => engine.migrate_to(env, target),
                None => engine.migrate(env),
            };
            result.with_context(|| format!("environment '{name}'"))
        })
        .collect()
}

/// `mockenv migrate <file>` — Upgrade every environment to the current schema.
pub fn migrate(path: &Path, output: Option<&Path>, to: Option<u32>, dry_run: bool) -> Result {
    let mut doc = load(path)?;
    let reports = migrate_document(&mut doc, to)?;

    for (i, report) in reports.iter().enumerate() {
        let label = match report.outcome {
            MigrationOutcome::Migrated => style("migrated").green(),
            MigrationOutcome::UpToDate => style("up to date").dim(),
            MigrationOutcome::AheadOfRegistry { .. } => style("newer release, skipped").yellow(),
        };
        eprintln!(
            "  #{i}: {} -> {} ({label}, {} steps)",
            report.from,
            report.to,
            report.applied.len()
        );
    }

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let target = output.unwrap_or(path);
    let changed = reports
        .iter()
        .any(|r| r.outcome == MigrationOutcome::Migrated);
    if changed || output.is_some() {
        save(target, &doc)?;
        info!(path = %target.display(), "wrote migrated environments");
        println!("Wrote {}", target.display());
    } else {
        println!("Nothing to migrate");
    }

    Ok(())
}

/// `mockenv steps` — List every registered migration.
pub fn steps() -> Result {
    let registry = MigrationRegistry::global();

    println!("  {:>4}  {:<24} {}", "Id", "Name", "Description");
    println!("  {}", "-".repeat(72));
    for step in registry.steps() {
        println!("  {:>4}  {:<24} {}", step.id, step.name, step.description);
    }
    println!();
    println!("{} migrations, highest id {}", registry.len(), registry.highest_id());

    Ok(())
}

/// `mockenv new <file>` — Create an environment in the current schema.
pub fn new_environment(path: &Path, name: &str, port: u16, force: bool) -> Result {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    save(path, &template::new_environment(name, port))?;
    println!("Created {} at migration {HIGHEST_MIGRATION_ID}", path.display());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
