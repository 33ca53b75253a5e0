/// Explicit configuration handed to the table loaders and the classifier
use std::collections::BTreeSet;

use crate::report::ScenarioFilter;

/// Column names of the correspondence (transcript tracking) table
///
/// Only `ref_gene` and `query_gene` are required; the other columns are used
/// when present in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub ref_gene: String,
    pub ref_transcript: String,
    pub query_gene: String,
    pub query_transcript: String,
    pub class_code: String,
    pub exon_count: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            ref_gene: "ref_gene_id".to_string(),
            ref_transcript: "ref_transcript_id".to_string(),
            query_gene: "query_gene_id".to_string(),
            query_transcript: "query_transcript_id".to_string(),
            class_code: "class_code".to_string(),
            exon_count: "exons".to_string(),
        }
    }
}

/// Run-level settings
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub threads: usize,
    /// Transcript class codes allowed to form an edge; `None` keeps every row
    pub class_codes: Option<BTreeSet<String>>,
    pub scenarios: ScenarioFilter,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        ClassifyConfig {
            threads: 8,
            class_codes: None,
            scenarios: ScenarioFilter::all(),
        }
    }
}

impl ClassifyConfig {
    /// Does a row carrying `code` survive the class-code whitelist?
    ///
    /// Rows without a class code are only kept when no whitelist is set.
    pub fn accepts_class_code(&self, code: Option<&str>) -> bool {
        match (&self.class_codes, code) {
            (None, _) => true,
            (Some(allowed), Some(code)) => allowed.contains(code),
            (Some(_), None) => false,
        }
    }
}

/// Parse a comma separated class code list such as "=,c,k,j"
pub fn parse_class_codes(s: &str) -> Result<BTreeSet<String>, String> {
    let codes: BTreeSet<String> = s
        .split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    if codes.is_empty() {
        return Err("Empty class code list".to_string());
    }
    Ok(codes)
}
