/// scenariostats - Statistics for pavscan scenario assignment tables
///
/// Prints per-scenario gene and group counts for one table, or the per-gene
/// label changes between two runs.
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::{BTreeMap, HashMap};

use pavscan::gene::Side;
use pavscan::report::{format_count, parse_assignments, AssignmentRecord, ScenarioSummary};
use pavscan::table_io::open_table_input;
use pavscan::ScenarioLabel;

#[derive(Parser)]
#[clap(
    name = "scenariostats",
    about = "Statistics for scenario assignment tables"
)]
struct Args {
    /// First assignment table
    file1: String,

    /// Optional second table for comparison
    file2: Option<String>,

    /// List every gene whose label changed
    #[clap(short = 'd', long)]
    detailed: bool,
}

fn load(path: &str) -> Result<Vec<AssignmentRecord>> {
    let reader = open_table_input(path).with_context(|| format!("Failed to open {path}"))?;
    let records =
        parse_assignments(reader, path).with_context(|| format!("Failed to parse {path}"))?;
    Ok(records)
}

fn summarize(records: &[AssignmentRecord]) -> ScenarioSummary {
    ScenarioSummary::from_records(records.iter().map(|r| (r.side, r.label, r.group_id)))
}

fn print_stats(path: &str, records: &[AssignmentRecord]) {
    let summary = summarize(records);

    println!("\nScenarios in {path}:");
    println!("{}", "=".repeat(60));
    println!(
        "{:10} {:>12} {:>12} {:>12}",
        "Scenario", "Ref genes", "Query genes", "Groups"
    );
    for label in ScenarioLabel::ALL {
        let (r, q) = summary.count(label);
        let groups = if label.is_unmapped() {
            "-".to_string()
        } else {
            format_count(summary.group_count(label))
        };
        println!(
            "{:10} {:>12} {:>12} {:>12}",
            label.as_str(),
            format_count(r),
            format_count(q),
            groups
        );
    }
    let (r, q) = summary.total();
    println!("{}", "-".repeat(60));
    println!(
        "{:10} {:>12} {:>12}",
        "Total",
        format_count(r),
        format_count(q)
    );
}

/// Label transitions between two runs, keyed by (side, gene)
struct Comparison {
    transitions: BTreeMap<(ScenarioLabel, ScenarioLabel), usize>,
    changed: Vec<(Side, String, ScenarioLabel, ScenarioLabel)>,
    only_first: usize,
    only_second: usize,
}

fn compare(first: &[AssignmentRecord], second: &[AssignmentRecord]) -> Comparison {
    let index: HashMap<(Side, &str), ScenarioLabel> = second
        .iter()
        .map(|r| ((r.side, r.gene_id.as_str()), r.label))
        .collect();

    let mut transitions = BTreeMap::new();
    let mut changed = Vec::new();
    let mut matched = 0usize;
    for r in first {
        let Some(&new) = index.get(&(r.side, r.gene_id.as_str())) else {
            continue;
        };
        matched += 1;
        if new != r.label {
            *transitions.entry((r.label, new)).or_insert(0) += 1;
            changed.push((r.side, r.gene_id.clone(), r.label, new));
        }
    }

    Comparison {
        transitions,
        changed,
        only_first: first.len().saturating_sub(matched),
        only_second: second.len().saturating_sub(matched),
    }
}

fn print_comparison(file1: &str, file2: &str, cmp: &Comparison, detailed: bool) {
    println!("\nComparison: {file1} vs {file2}");
    println!("{}", "=".repeat(60));
    println!("Genes only in first:   {:>12}", format_count(cmp.only_first));
    println!("Genes only in second:  {:>12}", format_count(cmp.only_second));
    println!("Genes relabelled:      {:>12}", format_count(cmp.changed.len()));

    if !cmp.transitions.is_empty() {
        println!("\nTransitions:");
        for ((old, new), n) in &cmp.transitions {
            println!("  {:>3} -> {:<3} {:>12}", old.as_str(), new.as_str(), format_count(*n));
        }
    }

    if detailed && !cmp.changed.is_empty() {
        println!("\nRelabelled genes:");
        println!("{}", "-".repeat(60));
        for (side, gene, old, new) in &cmp.changed {
            println!("{gene:30} {side:6} {old:>3} -> {new}");
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let first = load(&args.file1)?;

    if let Some(file2) = args.file2 {
        let second = load(&file2)?;
        print_comparison(&args.file1, &file2, &compare(&first, &second), args.detailed);
    } else {
        print_stats(&args.file1, &first);
    }

    Ok(())
}
