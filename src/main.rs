//! sieve - filter JSON records with SQL WHERE clauses, query strings or rule files

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser as ClapParser};
use std::io::Read;
use std::path::PathBuf;
use sieve::access::Value;
use sieve::condition::{Condition, FilterGroup, FilterIter};
use sieve::definition::load_rule;
use sieve::query::parse_query;

/// Filter a JSON array of records and print the ones that match
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["where_clause", "query", "rule"])
))]
struct Args {
    /// SQL WHERE clause; a full SELECT statement is accepted too
    #[arg(short, long = "where", value_name = "SQL")]
    where_clause: Option<String>,

    /// URL query string, e.g. "price:gt=100&item=laptop"
    #[arg(short, long, value_name = "QS")]
    query: Option<String>,

    /// JSON rule definition file
    #[arg(short, long, value_name = "FILE")]
    rule: Option<PathBuf>,

    /// Field the query string should ignore (repeatable)
    #[arg(long, value_name = "FIELD")]
    except: Vec<String>,

    /// JSON input file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print the number of selected records instead of the records
    #[arg(short, long)]
    count: bool,

    /// Select the records that do not match
    #[arg(long)]
    invert: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let condition = build_condition(&args)?;
    log::debug!("condition: {:?}", condition);

    let records = read_records(args.input.as_ref())?;
    let condition = if args.invert {
        condition.negated()
    } else {
        condition
    };

    let mut selected = FilterIter::new(records.iter(), &condition);
    let matched: Vec<&Value> = selected.by_ref().collect();
    log::info!("{} of {} record(s) selected", matched.len(), selected.scanned());

    if args.count {
        println!("{}", matched.len());
    } else {
        let output = serde_json::to_string_pretty(&matched).context("Failed to encode output")?;
        println!("{}", output);
    }

    Ok(())
}

fn build_condition(args: &Args) -> Result<Condition> {
    if let Some(clause) = &args.where_clause {
        let rule = sieve::sql::parse(clause).context("Failed to parse WHERE clause")?;
        return Ok(rule.into());
    }

    if let Some(qs) = &args.query {
        let except: Vec<&str> = args.except.iter().map(String::as_str).collect();
        let filters = parse_query(qs, &except).context("Failed to parse query string")?;
        let group = FilterGroup::and(filters.into_iter().map(Condition::from).collect());
        return Ok(group.into());
    }

    let path = args
        .rule
        .as_ref()
        .context("One of --where, --query or --rule is required")?;
    let application = load_rule(path)
        .with_context(|| format!("Failed to load rule file {}", path.display()))?;
    let rule = application
        .build(None)
        .with_context(|| format!("Failed to build rule from {}", path.display()))?;
    Ok(rule.into())
}

/// Read a JSON array of records, or a single record
fn read_records(input: Option<&PathBuf>) -> Result<Vec<Value>> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let json: serde_json::Value = serde_json::from_str(&text).context("Input is not valid JSON")?;
    Ok(match json {
        serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
        other => vec![Value::from(other)],
    })
}
