//! knack-cli: diagnostic command line for the records API.
//!
//! Usage:
//!   knack-cli get <object> <id>                        Fetch one record
//!   knack-cli list <object> [--filter <json>] [--all]  List records
//!   knack-cli version
//!   knack-cli help

use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vespa_knack::records::{Filter, RecordQuery};
use vespa_knack::{KnackClient, KnackConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "get" => cmd_get(&args[2..]).await,
        "list" => cmd_list(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"knack-cli: records API diagnostics

USAGE:
    knack-cli <COMMAND> [OPTIONS]

COMMANDS:
    get <object> <id>                       Fetch a single record
    list <object> [--filter <json>] [--all] List records (first page unless --all)
    version                                 Show version information
    help                                    Show this help message

OPTIONS:
    --config <path>                         YAML configuration file

ENVIRONMENT:
    VESPA_KNACK_CONFIG                      Configuration file path
    VESPA_KNACK_APP_ID / VESPA_KNACK_API_KEY / VESPA_KNACK_USER_TOKEN
    RUST_LOG                                Log filter (e.g. vespa_knack=debug)"#
    );
}

fn cmd_version() {
    println!("knack-cli {}", env!("CARGO_PKG_VERSION"));
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Positional arguments with `--flag value` pairs and bare `--all` removed.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "--filter" => {
                iter.next();
            }
            "--all" => {}
            other => out.push(other),
        }
    }
    out
}

fn load_config(args: &[String]) -> anyhow::Result<KnackConfig> {
    let path = match flag_value(args, "--config") {
        Some(p) => PathBuf::from(p),
        None => match std::env::var("VESPA_KNACK_CONFIG") {
            Ok(p) => PathBuf::from(p),
            Err(_) => bail!("no configuration: pass --config <path> or set VESPA_KNACK_CONFIG"),
        },
    };
    KnackConfig::from_file(&path).with_context(|| format!("loading {}", path.display()))
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let pos = positionals(args);
    let [object, id] = pos.as_slice() else {
        bail!("usage: knack-cli get <object> <id>");
    };
    let client = KnackClient::new(load_config(args)?)?;
    let record = client.get_record(object, id).await?;
    println!("{}", serde_json::to_string_pretty(&record.into_value())?);
    Ok(())
}

async fn cmd_list(args: &[String]) -> anyhow::Result<()> {
    let pos = positionals(args);
    let [object] = pos.as_slice() else {
        bail!("usage: knack-cli list <object> [--filter <json>] [--all]");
    };
    let filter: Option<Filter> = flag_value(args, "--filter")
        .map(serde_json::from_str)
        .transpose()
        .context("--filter must be a JSON filter object")?;
    let client = KnackClient::new(load_config(args)?)?;

    if args.iter().any(|a| a == "--all") {
        let records = client.list_all_records(object, filter).await?;
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        eprintln!("{} record(s)", records.len());
    } else {
        let mut query = RecordQuery::new();
        query.filter = filter;
        let page = client.list_records(object, &query).await?;
        for record in &page.records {
            println!("{}", serde_json::to_string(record)?);
        }
        eprintln!(
            "page {}/{} ({} total)",
            page.current_page, page.total_pages, page.total_records
        );
    }
    Ok(())
}
