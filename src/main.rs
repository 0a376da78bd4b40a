use anyhow::Context;
use clap::Parser;
use mini_crm::domain::model::{listing_header, listing_row};
use mini_crm::utils::logger;
use mini_crm::{CliConfig, Command, CrmEngine, CrmError, JsonLeadRepository, Lead, Stage};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 日誌等級取決於設定檔，所以先載入配置；此時尚無 subscriber
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    logger::init_cli_logger(config.verbose());
    if let Some(path) = &cli.config {
        tracing::debug!("Loaded configuration from {}", path);
    }
    tracing::debug!("Resolved config: {:?}", config);

    let repository = JsonLeadRepository::new(config.data_dir())
        .with_context(|| format!("cannot open data directory {}", config.data_dir()))?;
    let engine = CrmEngine::new(repository);

    match run(&engine, cli.command, config.export_path()) {
        Ok(()) => Ok(()),
        Err(e @ CrmError::ValidationError { .. }) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(2);
        }
        Err(e) => Err(e).context("mini-crm command failed"),
    }
}

fn run(
    engine: &CrmEngine<JsonLeadRepository>,
    command: Command,
    configured_export: Option<&str>,
) -> mini_crm::Result<()> {
    match command {
        Command::Add {
            name,
            company,
            email,
            stage,
        } => {
            let mut lead = Lead::new(name.trim(), company.trim(), email.trim());
            if let Some(stage) = stage {
                lead = lead.with_stage(stage.parse::<Stage>()?);
            }
            engine.add_lead(&lead)?;
            println!("✅ Lead added");
            println!("   {}", lead);
        }
        Command::List => {
            let leads = engine.list()?;
            if leads.is_empty() {
                println!("No leads yet.");
                return Ok(());
            }
            print_table(leads.iter().enumerate());
            println!("\nTotal: {} lead(s)", leads.len());
        }
        Command::Search { query } => {
            let results = engine.search(&query)?;
            if results.is_empty() {
                println!("No results for '{}'", query.trim());
                return Ok(());
            }
            print_table(results.iter().map(|(index, lead)| (*index, lead)));
            println!("\nFound: {} lead(s)", results.len());
        }
        Command::Export { output } => {
            let target = output.or_else(|| configured_export.map(str::to_string));
            match engine.export(target.map(PathBuf::from).as_deref())? {
                Some(path) => println!("✅ Leads exported to {}", path.display()),
                None => {
                    eprintln!("❌ Could not write the CSV file.");
                    eprintln!("   Check that it is not open in another program.");
                }
            }
        }
        Command::Stats => {
            for line in engine.statistics()?.summary_lines() {
                println!("{}", line);
            }
        }
        Command::Stage { index, stage } => {
            if engine.change_stage(index, &stage)? {
                println!("✅ Lead {:02} moved to {}", index, stage);
            } else {
                eprintln!("❌ No lead at index {}", index);
            }
        }
        Command::Delete { index } => {
            if engine.remove(index)? {
                println!("✅ Lead {:02} deleted", index);
            } else {
                eprintln!("❌ No lead at index {}", index);
            }
        }
        Command::Check => match engine.store().verify() {
            Ok(count) => println!("✅ Lead database OK ({} record(s))", count),
            Err(e @ CrmError::CorruptStore { .. }) => {
                tracing::warn!("{}", e);
                eprintln!("⚠️ {}", e.user_friendly_message());
                eprintln!("   The next change will replace it with a fresh list.");
            }
            Err(e) => return Err(e),
        },
    }
    Ok(())
}

fn print_table<'a>(rows: impl Iterator<Item = (usize, &'a Lead)>) {
    let header = listing_header();
    println!("{}", header);
    println!("{}", "-".repeat(header.len() + 10));
    for (index, lead) in rows {
        println!("{}", listing_row(index, lead));
    }
}
