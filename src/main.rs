use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use pavscan::bbh::BestHits;
use pavscan::config::{parse_class_codes, ClassifyConfig, ColumnConfig};
use pavscan::gene::GeneUniverse;
use pavscan::report::{format_count, write_assignments, ScenarioFilter, ScenarioSummary};
use pavscan::table_io::{read_best_hits, read_correspondence, read_gene_list};
use pavscan::AlignmentEvidence;

/// pavscan - Gene mapping scenario classification between two annotations
///
/// Assigns every reference and query gene one scenario (E, A, J, B, CDI, G, H)
/// from gene-level transcript tracking correspondences, annotating multi-gene
/// groups with reciprocal best hits when alignment tables are given.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Correspondence table (TSV with header; .gz/.bgz accepted)
    #[clap(short = 'c', long = "correspondence", value_name = "TSV")]
    correspondence: String,

    /// Exhaustive reference gene id list (enables scenario G)
    #[clap(long = "ref-genes")]
    ref_genes: Option<String>,

    /// Exhaustive query gene id list (enables scenario H)
    #[clap(long = "query-genes")]
    query_genes: Option<String>,

    /// Best hits of reference proteins against query proteins
    #[clap(long = "ref-vs-query", requires = "query_vs_ref")]
    ref_vs_query: Option<String>,

    /// Best hits of query proteins against reference proteins
    #[clap(long = "query-vs-ref", requires = "ref_vs_query")]
    query_vs_ref: Option<String>,

    /// Output assignment table (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Write per-scenario counts to this file
    #[clap(long = "summary")]
    summary: Option<String>,

    /// Scenarios to report: comma list of E,A,B,J,CDI,G,H or "all"
    #[clap(long = "scenarios", default_value = "all")]
    scenarios: ScenarioFilter,

    /// Only transcript rows with these class codes form edges, e.g. "=,c,k,j"
    #[clap(long = "class-codes", value_parser = parse_class_codes)]
    class_codes: Option<BTreeSet<String>>,

    /// Reference gene column name
    #[clap(long = "ref-gene-col", default_value = "ref_gene_id")]
    ref_gene_col: String,

    /// Reference transcript column name
    #[clap(long = "ref-transcript-col", default_value = "ref_transcript_id")]
    ref_transcript_col: String,

    /// Query gene column name
    #[clap(long = "query-gene-col", default_value = "query_gene_id")]
    query_gene_col: String,

    /// Query transcript column name
    #[clap(long = "query-transcript-col", default_value = "query_transcript_id")]
    query_transcript_col: String,

    /// Class code column name
    #[clap(long = "class-code-col", default_value = "class_code")]
    class_code_col: String,

    /// Exon count column name
    #[clap(long = "exon-col", default_value = "exons")]
    exon_col: String,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,

    /// Quiet mode (warnings and errors only)
    #[clap(long = "quiet", conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose logging
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn columns(&self) -> ColumnConfig {
        ColumnConfig {
            ref_gene: self.ref_gene_col.clone(),
            ref_transcript: self.ref_transcript_col.clone(),
            query_gene: self.query_gene_col.clone(),
            query_transcript: self.query_transcript_col.clone(),
            class_code: self.class_code_col.clone(),
            exon_count: self.exon_col.clone(),
        }
    }

    fn classify_config(&self) -> ClassifyConfig {
        ClassifyConfig {
            threads: self.threads,
            class_codes: self.class_codes.clone(),
            scenarios: self.scenarios.clone(),
        }
    }

    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn load_universe(args: &Args) -> Result<GeneUniverse> {
    let mut universe = GeneUniverse::new();
    if let Some(path) = &args.ref_genes {
        universe.reference =
            Some(read_gene_list(path).with_context(|| format!("Reading reference gene list {path}"))?);
    }
    if let Some(path) = &args.query_genes {
        universe.query =
            Some(read_gene_list(path).with_context(|| format!("Reading query gene list {path}"))?);
    }
    Ok(universe)
}

fn load_hits(args: &Args) -> Result<Option<(BestHits, BestHits)>> {
    match (&args.ref_vs_query, &args.query_vs_ref) {
        (Some(rq), Some(qr)) => {
            let rq_hits =
                read_best_hits(rq).with_context(|| format!("Reading alignment table {rq}"))?;
            let qr_hits =
                read_best_hits(qr).with_context(|| format!("Reading alignment table {qr}"))?;
            Ok(Some((rq_hits, qr_hits)))
        }
        _ => Ok(None),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    let config = args.classify_config();

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()?;

    // Load every table before classifying so bad input fails early
    let table = read_correspondence(&args.correspondence, &args.columns(), &config)
        .with_context(|| format!("Reading correspondence table {}", args.correspondence))?;
    let universe = load_universe(&args)?;
    let hits = load_hits(&args)?;

    let evidence = hits.as_ref().map(|(rq, qr)| AlignmentEvidence {
        ref_vs_query: rq,
        query_vs_ref: qr,
    });
    let classification = pavscan::run(&table, &universe, evidence)?;

    // Nothing is written until the whole classification has succeeded
    let written = {
        let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
            Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("Creating {path}"))?,
            ))
        } else {
            Box::new(BufWriter::new(io::stdout()))
        };
        write_assignments(&mut output, &classification, &config.scenarios)?
    };
    if !config.scenarios.is_all() {
        info!(
            "Wrote {written} of {} assignments (scenarios {})",
            classification.assignments.len(),
            config.scenarios
        );
    }

    let summary = ScenarioSummary::from_classification(&classification);
    for label in pavscan::ScenarioLabel::ALL {
        let (r, q) = summary.count(label);
        info!("  {label:>3}: {} ref, {} query", format_count(r), format_count(q));
    }
    if let Some(path) = &args.summary {
        let mut file =
            BufWriter::new(File::create(path).with_context(|| format!("Creating {path}"))?);
        summary.write(&mut file)?;
    }

    Ok(())
}
