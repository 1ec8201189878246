mod cli;
mod shell;
mod terminal_speech;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::info;
use std::sync::Arc;

use nexretail_core::ai::assistant;
use nexretail_core::transfer::{self, INVENTORY_EXPORT_FILE, LEDGER_EXPORT_FILE};
use nexretail_core::{get_config_path, summarize, AiClient, Config, RecordStore};

use crate::cli::{Cli, Command};
use crate::shell::Shell;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(locale) = &cli.locale {
        config.locale = locale.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }

    let store = load_store(&cli)?;
    let client = AiClient::from_config(&config);
    info!("Assistant mode: {}", client.mode_description());

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let ai_mode = client.mode_description();
            let mut shell = Shell::new(
                config,
                config_path,
                store,
                Arc::new(client),
                ai_mode,
                cli.voice,
            );
            shell.run()?;
        }
        Command::Summary { view, json } => {
            let digest = summarize(&store, view.into(), &config.summary_options());
            if json {
                println!("{}", serde_json::to_string_pretty(&digest)?);
            } else {
                print!("{}", digest);
            }
        }
        Command::Ask { question, view } => {
            let digest = summarize(&store, view.into(), &config.summary_options());
            let answer = assistant::ask(&client, &question, &digest.to_string(), &config.locale);
            println!("{}", answer);
        }
        Command::Forecast => {
            let results = assistant::forecast(&client, store.products(), &config.locale);
            shell::print_products(store.products(), &results);
        }
        Command::Audit => {
            let results = assistant::audit(
                &client,
                store.transactions(),
                config.anomaly_transaction_limit,
                &config.locale,
            );
            shell::print_anomalies(&results);
        }
        Command::Export { dir } => {
            let products_path = dir.join(INVENTORY_EXPORT_FILE);
            let ledger_path = dir.join(LEDGER_EXPORT_FILE);
            transfer::export_products(store.products(), &products_path)
                .with_context(|| format!("Failed to export to {}", products_path.display()))?;
            transfer::export_transactions(store.transactions(), &ledger_path)
                .with_context(|| format!("Failed to export to {}", ledger_path.display()))?;
            println!(
                "{} Wrote {} and {}",
                "✓".green(),
                products_path.display(),
                ledger_path.display()
            );
        }
        Command::InitConfig => {
            config.save(&config_path)?;
            println!("{} Config written to {}", "✓".green(), config_path.display());
        }
    }

    Ok(())
}

/// Build the starting store: demo data unless `--empty`, plus any CSV preloads
fn load_store(cli: &Cli) -> Result<RecordStore> {
    let mut store = if cli.empty {
        RecordStore::new()
    } else {
        RecordStore::with_demo_data()
    };

    if let Some(path) = &cli.products {
        let rows = transfer::import_products_file(path)
            .with_context(|| format!("Failed to import products from {}", path.display()))?;
        let report = store.import(rows);
        info!("Preloaded {} product(s)", report.count());
    }
    if let Some(path) = &cli.transactions {
        let rows = transfer::import_transactions_file(path)
            .with_context(|| format!("Failed to import transactions from {}", path.display()))?;
        let report = store.import(rows);
        info!("Preloaded {} transaction(s)", report.count());
    }

    Ok(store)
}
