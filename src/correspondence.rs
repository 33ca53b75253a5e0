/// Gene-level correspondence records collapsed from transcript tracking rows
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::ClassifyConfig;
use crate::gene::Side;

/// One transcript-level row of the tracking table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingRow {
    pub ref_gene: Option<String>,
    pub ref_transcript: Option<String>,
    pub query_gene: Option<String>,
    pub query_transcript: Option<String>,
    pub class_code: Option<String>,
    pub exon_count: Option<u32>,
}

impl TrackingRow {
    pub fn pair(ref_gene: &str, query_gene: &str) -> Self {
        TrackingRow {
            ref_gene: Some(ref_gene.to_string()),
            query_gene: Some(query_gene.to_string()),
            ..Default::default()
        }
    }

    pub fn with_class_code(mut self, code: &str) -> Self {
        self.class_code = Some(code.to_string());
        self
    }
}

/// An observed reference <-> query gene link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrespondenceEdge {
    pub ref_gene: String,
    pub query_gene: String,
    /// Distinct transcript class codes seen for this pair
    pub class_codes: BTreeSet<String>,
    /// Largest exon count among the collapsed rows
    pub exon_count: Option<u32>,
    /// Number of transcript rows collapsed into this edge
    pub support: u32,
}

impl CorrespondenceEdge {
    pub fn new(ref_gene: &str, query_gene: &str) -> Self {
        CorrespondenceEdge {
            ref_gene: ref_gene.to_string(),
            query_gene: query_gene.to_string(),
            class_codes: BTreeSet::new(),
            exon_count: None,
            support: 0,
        }
    }

    fn absorb(&mut self, row: &TrackingRow) {
        if let Some(code) = &row.class_code {
            self.class_codes.insert(code.clone());
        }
        self.exon_count = match (self.exon_count, row.exon_count) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.support += 1;
    }
}

/// Deduplicated gene pairs plus everything else the loader saw
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceTable {
    edges: BTreeMap<(String, String), CorrespondenceEdge>,
    observed_ref: BTreeSet<String>,
    observed_query: BTreeSet<String>,
    ref_transcripts: HashMap<String, String>,
    query_transcripts: HashMap<String, String>,
    rows_seen: usize,
    rows_filtered: usize,
}

/// Tracking tables write "-" for a missing partner
fn present(field: &Option<String>) -> Option<&str> {
    match field.as_deref() {
        None | Some("") | Some("-") => None,
        Some(s) => Some(s),
    }
}

impl CorrespondenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse rows into edges, dropping rows outside the class-code whitelist
    pub fn from_rows<I>(rows: I, config: &ClassifyConfig) -> Self
    where
        I: IntoIterator<Item = TrackingRow>,
    {
        let mut table = Self::new();
        for row in rows {
            table.add_row(&row, config);
        }
        debug!(
            "Collapsed {} tracking rows ({} filtered by class code) into {} gene pairs",
            table.rows_seen,
            table.rows_filtered,
            table.edges.len()
        );
        table
    }

    pub fn add_row(&mut self, row: &TrackingRow, config: &ClassifyConfig) {
        self.rows_seen += 1;
        let ref_gene = present(&row.ref_gene);
        let query_gene = present(&row.query_gene);

        // Genes count as observed even when the row is filtered or unpaired
        if let Some(gene) = ref_gene {
            self.observed_ref.insert(gene.to_string());
            if let Some(tx) = present(&row.ref_transcript) {
                self.ref_transcripts.insert(tx.to_string(), gene.to_string());
            }
        }
        if let Some(gene) = query_gene {
            self.observed_query.insert(gene.to_string());
            if let Some(tx) = present(&row.query_transcript) {
                self.query_transcripts.insert(tx.to_string(), gene.to_string());
            }
        }

        if !config.accepts_class_code(row.class_code.as_deref()) {
            self.rows_filtered += 1;
            return;
        }

        if let (Some(r), Some(q)) = (ref_gene, query_gene) {
            self.edges
                .entry((r.to_string(), q.to_string()))
                .or_insert_with(|| CorrespondenceEdge::new(r, q))
                .absorb(row);
        }
    }

    /// Edges ordered by (ref gene, query gene)
    pub fn edges(&self) -> impl Iterator<Item = &CorrespondenceEdge> {
        self.edges.values()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub fn observed(&self, side: Side) -> &BTreeSet<String> {
        match side {
            Side::Reference => &self.observed_ref,
            Side::Query => &self.observed_query,
        }
    }

    /// Map a transcript (or protein) id to its gene on the given side
    pub fn gene_for_transcript(&self, side: Side, transcript: &str) -> Option<&str> {
        let map = match side {
            Side::Reference => &self.ref_transcripts,
            Side::Query => &self.query_transcripts,
        };
        map.get(transcript).map(|s| s.as_str())
    }
}
