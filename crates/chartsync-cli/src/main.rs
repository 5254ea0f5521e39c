//! # ChartSync CLI
//!
//! Command-line utilities for replaying and checking recorded change streams.

use anyhow::{Context, Result};
use chartsync_adapter_file::read_batches;
use chartsync_charts::{Activity, Collection, Dish, Employee, Expense};
use chartsync_core::CollectionSynchronizer;
use chartsync_proto::{ChangeBatch, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::convert::Infallible;
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "replay" => {
            if args.len() < 3 {
                eprintln!("Usage: chartsync replay <file> [collection]");
                std::process::exit(1);
            }
            let batches = load(&args[2])?;
            let collection = match args.get(3) {
                Some(name) => name.parse().context("Invalid collection")?,
                None => first_collection(&batches)?,
            };
            let output = replay(&batches, collection)?;
            println!("{output}");
        }
        "validate" => {
            if args.len() < 3 {
                eprintln!("Usage: chartsync validate <file>");
                std::process::exit(1);
            }
            let batches = load(&args[2])?;
            let rejected = validate(&batches)?;
            println!("{} batches, {rejected} rejected changes", batches.len());
            if rejected > 0 {
                std::process::exit(1);
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn load(path: &str) -> Result<Vec<ChangeBatch>> {
    read_batches(Path::new(path)).with_context(|| format!("Failed to read {path}"))
}

fn first_collection(batches: &[ChangeBatch]) -> Result<Collection> {
    let first = batches.first().context("Change stream is empty")?;
    first
        .collection
        .parse()
        .context("Invalid collection in change stream")
}

/// Apply every batch of `collection` and return the final snapshot as JSON.
fn replay(batches: &[ChangeBatch], collection: Collection) -> Result<String> {
    match collection {
        Collection::Expenses => replay_as::<Expense>(batches, collection),
        Collection::Activities => replay_as::<Activity>(batches, collection),
        Collection::Employees => replay_as::<Employee>(batches, collection),
        Collection::Dishes => replay_as::<Dish>(batches, collection),
    }
}

fn replay_as<T>(batches: &[ChangeBatch], collection: Collection) -> Result<String>
where
    T: DeserializeOwned + Serialize + Clone,
{
    let mut sync = CollectionSynchronizer::new(|_: &[Document<T>]| Ok::<(), Infallible>(()))
        .with_name(collection.as_str());

    for batch in batches
        .iter()
        .filter(|batch| batch.collection == collection.as_str())
    {
        let decoded = batch.decode::<T>();
        for (index, err) in &decoded.rejected {
            eprintln!("warning: change {index} rejected: {err}");
        }
        let report = match sync.apply_batch(decoded.events) {
            Ok(report) => report,
            Err(never) => match never {},
        };
        for anomaly in &report.anomalies {
            eprintln!("warning: {anomaly}");
        }
    }

    serde_json::to_string_pretty(sync.snapshot()).context("Failed to encode snapshot")
}

/// Decode every batch with its collection's payload type.
///
/// Returns the number of rejected changes.
fn validate(batches: &[ChangeBatch]) -> Result<usize> {
    let mut rejected = 0;
    for (line, batch) in batches.iter().enumerate() {
        let collection: Collection = batch
            .collection
            .parse()
            .with_context(|| format!("Batch {}", line + 1))?;
        let errors: Vec<String> = match collection {
            Collection::Expenses => rejections::<Expense>(batch),
            Collection::Activities => rejections::<Activity>(batch),
            Collection::Employees => rejections::<Employee>(batch),
            Collection::Dishes => rejections::<Dish>(batch),
        };
        for err in &errors {
            eprintln!("batch {}: {err}", line + 1);
        }
        rejected += errors.len();
    }
    Ok(rejected)
}

fn rejections<T: DeserializeOwned>(batch: &ChangeBatch) -> Vec<String> {
    batch
        .decode::<T>()
        .rejected
        .into_iter()
        .map(|(index, err)| format!("change {index}: {err}"))
        .collect()
}

fn print_help() {
    println!(
        r#"ChartSync CLI

USAGE:
    chartsync <COMMAND> [OPTIONS]

COMMANDS:
    replay <file> [collection]  Apply a JSON-lines change stream, print the final snapshot
    validate <file>             Decode every change and report rejected ones
    help                        Show this help message

COLLECTIONS:
    expenses, activities, employees, dishes

EXAMPLES:
    chartsync replay changes.jsonl expenses
    chartsync validate changes.jsonl
"#
    );
}
