/// Readers for the boundary tables: tracking correspondences, gene id lists
/// and best-hit alignment tables
///
/// Files ending in .gz or .bgz are read through the BGZF decoder.
use log::debug;
use noodles::bgzf;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::bbh::{AlignmentHit, BestHits};
use crate::config::{ClassifyConfig, ColumnConfig};
use crate::correspondence::{CorrespondenceTable, TrackingRow};
use crate::error::{PavError, Result};

/// Open a file and auto-detect bgzip compression, returning a boxed BufRead
pub fn open_table_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn parse_error(source: &str, line: usize, message: impl Into<String>) -> PavError {
    PavError::Parse {
        path: source.to_string(),
        line,
        message: message.into(),
    }
}

/// Column positions resolved from the header row
struct ColumnIndex {
    ref_gene: usize,
    query_gene: usize,
    ref_transcript: Option<usize>,
    query_transcript: Option<usize>,
    class_code: Option<usize>,
    exon_count: Option<usize>,
    width: usize,
}

impl ColumnIndex {
    fn resolve(header: &str, columns: &ColumnConfig, source: &str) -> Result<Self> {
        let names: Vec<&str> = header
            .trim_start_matches('#')
            .trim_end()
            .split('\t')
            .map(|s| s.trim())
            .collect();
        let find = |name: &str| names.iter().position(|n| *n == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| PavError::MissingColumn {
                column: name.to_string(),
                path: source.to_string(),
            })
        };

        let index = ColumnIndex {
            ref_gene: require(columns.ref_gene.as_str())?,
            query_gene: require(columns.query_gene.as_str())?,
            ref_transcript: find(columns.ref_transcript.as_str()),
            query_transcript: find(columns.query_transcript.as_str()),
            class_code: find(columns.class_code.as_str()),
            exon_count: find(columns.exon_count.as_str()),
            width: 0,
        };
        let width = [
            Some(index.ref_gene),
            Some(index.query_gene),
            index.ref_transcript,
            index.query_transcript,
            index.class_code,
            index.exon_count,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
            + 1;
        Ok(ColumnIndex { width, ..index })
    }

    fn row(&self, line: &str, source: &str, line_no: usize) -> Result<TrackingRow> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < self.width {
            return Err(parse_error(
                source,
                line_no,
                format!("expected at least {} fields, found {}", self.width, fields.len()),
            ));
        }

        let field = |i: Option<usize>| -> Option<String> {
            i.map(|i| fields[i].trim())
                .filter(|s| !s.is_empty() && *s != "-")
                .map(|s| s.to_string())
        };

        let exon_count = match field(self.exon_count) {
            Some(s) => Some(s.parse::<u32>().map_err(|e| {
                parse_error(source, line_no, format!("invalid exon count '{s}': {e}"))
            })?),
            None => None,
        };

        Ok(TrackingRow {
            ref_gene: field(Some(self.ref_gene)),
            ref_transcript: field(self.ref_transcript),
            query_gene: field(Some(self.query_gene)),
            query_transcript: field(self.query_transcript),
            class_code: field(self.class_code),
            exon_count,
        })
    }
}

/// A `#` line is a commented header only if it names both gene columns
fn names_gene_columns(line: &str, columns: &ColumnConfig) -> bool {
    let fields: Vec<&str> = line
        .trim_start_matches('#')
        .trim_end()
        .split('\t')
        .map(|s| s.trim())
        .collect();
    fields.contains(&columns.ref_gene.as_str()) && fields.contains(&columns.query_gene.as_str())
}

/// Parse a tab-separated correspondence table with a header row
///
/// Leading `#` comment lines are skipped until the header.
pub fn parse_correspondence<R: BufRead>(
    reader: R,
    source: &str,
    columns: &ColumnConfig,
    config: &ClassifyConfig,
) -> Result<CorrespondenceTable> {
    let mut index: Option<ColumnIndex> = None;
    let mut table = CorrespondenceTable::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let Some(cols) = index.as_ref() else {
            if line.starts_with('#') && !names_gene_columns(&line, columns) {
                continue;
            }
            index = Some(ColumnIndex::resolve(&line, columns, source)?);
            continue;
        };
        if line.starts_with('#') {
            continue;
        }
        let row = cols.row(&line, source, line_no)?;
        table.add_row(&row, config);
    }

    if table.rows_seen() == 0 {
        return Err(PavError::EmptyTable {
            path: source.to_string(),
        });
    }
    debug!(
        "{source}: {} rows, {} gene pairs",
        table.rows_seen(),
        table.num_edges()
    );
    Ok(table)
}

pub fn read_correspondence<P: AsRef<Path>>(
    path: P,
    columns: &ColumnConfig,
    config: &ClassifyConfig,
) -> Result<CorrespondenceTable> {
    let source = path.as_ref().display().to_string();
    let reader = open_table_input(&path)?;
    parse_correspondence(reader, &source, columns, config)
}

/// One gene id per line; only the first whitespace-separated token counts
pub fn parse_gene_list<R: BufRead>(reader: R, source: &str) -> Result<BTreeSet<String>> {
    let mut genes = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(id) = line.split_whitespace().next() {
            genes.insert(id.to_string());
        }
    }
    if genes.is_empty() {
        return Err(PavError::EmptyTable {
            path: source.to_string(),
        });
    }
    debug!("{source}: {} gene ids", genes.len());
    Ok(genes)
}

pub fn read_gene_list<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
    let source = path.as_ref().display().to_string();
    parse_gene_list(open_table_input(&path)?, &source)
}

/// Column of the score in a best-hit row: 3-column form or BLAST outfmt 6 bitscore
fn score_column(n_fields: usize) -> Option<usize> {
    match n_fields {
        3 => Some(2),
        n if n >= 12 => Some(11),
        _ => None,
    }
}

/// Parse best-hit rows (`query subject score`, or 12-column outfmt 6)
pub fn parse_best_hits<R: BufRead>(reader: R, source: &str) -> Result<BestHits> {
    let mut best = BestHits::new();
    let mut rows = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let col = score_column(fields.len()).ok_or_else(|| {
            parse_error(
                source,
                line_no,
                format!(
                    "expected 3 or at least 12 fields, found {}",
                    fields.len()
                ),
            )
        })?;
        let score: f64 = fields[col].parse().map_err(|e| {
            parse_error(source, line_no, format!("invalid score '{}': {e}", fields[col]))
        })?;
        if score.is_nan() {
            return Err(parse_error(source, line_no, "score is NaN"));
        }
        best.add(AlignmentHit::new(fields[0], fields[1], score));
        rows += 1;
    }

    if rows == 0 {
        return Err(PavError::EmptyTable {
            path: source.to_string(),
        });
    }
    debug!("{source}: {rows} hits for {} query proteins", best.len());
    Ok(best)
}

pub fn read_best_hits<P: AsRef<Path>>(path: P) -> Result<BestHits> {
    let source = path.as_ref().display().to_string();
    parse_best_hits(open_table_input(&path)?, &source)
}
