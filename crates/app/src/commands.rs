use anyhow::Context;
use einzug_api::{upload, BudgetService, Client};
use einzug_import::{dedup, parser::effective_filename, Parser, Registry};
use std::path::Path;

use crate::config::Config;

fn load_registry(config: &Config) -> anyhow::Result<Registry> {
    match &config.dialects {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read dialect snapshot '{}'", path.display()))?;
            Ok(Registry::from_toml(&content)?)
        }
        None => Ok(Registry::bundled().clone()),
    }
}

fn client(config: &Config) -> anyhow::Result<Client> {
    let token = config.require_token()?;
    Ok(match &config.base_url {
        Some(url) => Client::with_base_url(token, url),
        None => Client::new(token),
    })
}

pub async fn import(
    config: &Config,
    file: &Path,
    original_name: Option<&str>,
    budget: Option<String>,
    account: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    let outcome = Parser::new(&registry).parse(file, original_name)?;

    let dialect = outcome.dialect.as_deref().unwrap_or("generic");
    println!(
        "{}: {} transactions ({} rows skipped, dialect: {dialect})",
        file.display(),
        outcome.transactions.len(),
        outcome.rows_skipped,
    );

    if dry_run {
        for tx in &outcome.transactions {
            println!(
                "  {} {:>12}  {:<30} {}  [{}]",
                tx.date,
                tx.amount,
                tx.payee_name.as_deref().unwrap_or("-"),
                tx.memo.as_deref().unwrap_or(""),
                dedup::import_id(tx),
            );
        }
        return Ok(());
    }

    let budget = budget.or_else(|| config.budget_id.clone());
    let account = account.or_else(|| config.account_id.clone());
    let result = upload(
        &client(config)?,
        &outcome.transactions,
        budget.as_deref(),
        account.as_deref(),
    )
    .await?;

    println!(
        "imported {} new, {} duplicates skipped by the service",
        result.imported, result.duplicates
    );
    Ok(())
}

pub fn check(config: &Config, file: &Path, original_name: Option<&str>) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    Parser::new(&registry).validate_structure(file, original_name)?;
    println!("{}: ok", file.display());
    Ok(())
}

pub async fn budgets(config: &Config) -> anyhow::Result<()> {
    let budgets = client(config)?.budgets().await?;
    if budgets.is_empty() {
        println!("no budgets visible to this token");
        return Ok(());
    }
    for b in budgets {
        let currency = b
            .currency_format
            .map(|c| c.iso_code)
            .unwrap_or_else(|| "?".to_string());
        println!("{}  {} ({currency})", b.id, b.name);
    }
    Ok(())
}

pub async fn accounts(config: &Config, budget: Option<String>) -> anyhow::Result<()> {
    let client = client(config)?;
    let budget = match budget.or_else(|| config.budget_id.clone()) {
        Some(b) => b,
        None => {
            // Mirror the upload orchestrator: a sole budget needs no selector.
            let mut budgets = client.budgets().await?;
            anyhow::ensure!(!budgets.is_empty(), "no budgets visible to this token");
            anyhow::ensure!(
                budgets.len() == 1,
                "several budgets available, pass --budget: {}",
                budgets
                    .iter()
                    .map(|b| b.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            budgets.remove(0).id
        }
    };
    for a in client.accounts(&budget).await? {
        if a.closed {
            continue;
        }
        println!("{}  {} ({})", a.id, a.name, a.kind);
    }
    Ok(())
}

pub fn dialects(config: &Config, matches: Option<&str>) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    match matches {
        Some(filename) => {
            let effective = effective_filename(Path::new(filename), None);
            match registry.match_filename(&effective) {
                Some(d) => println!("{filename} -> {}", d.name),
                None => println!("{filename} -> generic fallback"),
            }
        }
        None => {
            for d in registry.iter() {
                let kind = if d.use_regex { "regex" } else { "substring" };
                println!("{:<24} {kind}: {}", d.name, d.filename_pattern);
            }
        }
    }
    Ok(())
}
