//! Integration Test Harness
//!
//! Runs the scenario categories one `cargo test` target at a time, prints a
//! line per category as it finishes, and replays the output of the failed
//! ones at the end.
//!
//! # Usage
//!
//! Run all categories:
//! ```text
//! cargo run -p integration-tests
//! ```
//!
//! Run some categories, showing their output even when they pass:
//! ```text
//! cargo run -p integration-tests -- off over --verbose
//! ```
//!
//! Run one category directly:
//! ```text
//! cargo test -p integration-tests --test listener_tests
//! ```
//!
//! Run with increased logging:
//! ```text
//! RUST_LOG=spin=trace cargo run -p integration-tests
//! ```

use std::process::{Command, ExitCode};
use std::time::{Duration, Instant};

use clap::Parser;

/// Test targets and what they cover, keyed by short name
const CATEGORIES: &[(&str, &str)] = &[
    ("off", "calls from the loop thread evaluated on workers"),
    ("over", "calls from workers evaluated on the loop thread"),
    ("equality", "proxy identity and equality"),
    ("listener", "automatic over-wrapping of registered listeners"),
    ("dispatcher", "concealed and revealed dialog pumps"),
    ("registry", "defaults, configuration and global entry points"),
];

#[derive(Parser, Debug)]
#[command(name = "integration-tests")]
#[command(about = "Run the spin scenario categories")]
struct Args {
    /// Categories to run (all when empty)
    categories: Vec<String>,

    /// Print captured output of passing categories too
    #[arg(short, long)]
    verbose: bool,

    /// List the categories and exit
    #[arg(short, long)]
    list: bool,
}

/// Outcome of one category's test target
struct CategoryRun {
    name: &'static str,
    elapsed: Duration,
    /// `None` when the target passed
    failure: Option<String>,
    output: String,
}

impl CategoryRun {
    fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Resolve requested names against the table, keeping table order
fn select(requested: &[String]) -> Result<Vec<&'static str>, String> {
    if let Some(unknown) = requested
        .iter()
        .find(|name| !CATEGORIES.iter().any(|(known, _)| *known == name.as_str()))
    {
        return Err(format!("unknown category '{}'", unknown));
    }

    Ok(CATEGORIES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| requested.is_empty() || requested.iter().any(|r| r.as_str() == *name))
        .collect())
}

fn run_category(name: &'static str) -> CategoryRun {
    let target = format!("{}_tests", name);
    let started = Instant::now();
    let output = Command::new("cargo")
        .args(["test", "-p", "integration-tests", "--test", &target])
        .output();
    let elapsed = started.elapsed();

    match output {
        Ok(output) => CategoryRun {
            name,
            elapsed,
            failure: (!output.status.success())
                .then(|| format!("exit status {}", output.status)),
            output: format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        },
        Err(e) => CategoryRun {
            name,
            elapsed,
            failure: Some(format!("could not run cargo: {}", e)),
            output: String::new(),
        },
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list {
        for (name, description) in CATEGORIES {
            println!("{:<12} {}", name, description);
        }
        return ExitCode::SUCCESS;
    }

    let selected = match select(&args.categories) {
        Ok(selected) => selected,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut runs = Vec::with_capacity(selected.len());
    for name in selected {
        let run = run_category(name);
        let mark = if run.passed() { "ok  " } else { "FAIL" };
        println!("[{}] {:<12} {:>8.2?}", mark, run.name, run.elapsed);
        if args.verbose && run.passed() {
            println!("{}", run.output);
        }
        runs.push(run);
    }

    let failed: Vec<&CategoryRun> = runs.iter().filter(|run| !run.passed()).collect();
    for run in &failed {
        println!("\n--- {} ({}) ---", run.name, run.failure.as_deref().unwrap_or_default());
        println!("{}", run.output);
    }

    let total: Duration = runs.iter().map(|run| run.elapsed).sum();
    println!(
        "\n{} of {} categories passed in {:.2?}",
        runs.len() - failed.len(),
        runs.len(),
        total
    );

    if failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_when_empty() {
        assert_eq!(select(&[]).unwrap().len(), CATEGORIES.len());
    }

    #[test]
    fn test_select_keeps_table_order() {
        let requested = vec!["registry".to_string(), "off".to_string()];
        assert_eq!(select(&requested).unwrap(), vec!["off", "registry"]);
    }

    #[test]
    fn test_select_rejects_unknown() {
        let requested = vec!["nested".to_string()];
        assert!(select(&requested).unwrap_err().contains("nested"));
    }
}
