/// Bidirectional best hits between reference and query proteins
///
/// Each alignment direction is reduced to its top-scoring subject per query
/// protein. Two proteins form a pair only when each is the other's unique top
/// hit; a tied top score on either side yields no pair.
use log::{debug, warn};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

use crate::correspondence::CorrespondenceTable;
use crate::gene::Side;
use crate::multiplicity::BipartiteGraph;

/// One alignment row: query protein, subject protein, score (bitscore)
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_id: String,
    pub subject_id: String,
    pub score: f64,
}

impl AlignmentHit {
    pub fn new(query_id: &str, subject_id: &str, score: f64) -> Self {
        AlignmentHit {
            query_id: query_id.to_string(),
            subject_id: subject_id.to_string(),
            score,
        }
    }
}

#[derive(Debug, Clone)]
struct TopHit {
    score: OrderedFloat<f64>,
    subjects: Vec<String>,
}

/// Top-scoring subjects per query protein for one alignment direction
#[derive(Debug, Clone, Default)]
pub struct BestHits {
    top: HashMap<String, TopHit>,
}

impl BestHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hits<I: IntoIterator<Item = AlignmentHit>>(hits: I) -> Self {
        let mut best = Self::new();
        for hit in hits {
            best.add(hit);
        }
        best
    }

    pub fn add(&mut self, hit: AlignmentHit) {
        let score = OrderedFloat(hit.score);
        let top = self.top.entry(hit.query_id).or_insert_with(|| TopHit {
            score,
            subjects: Vec::new(),
        });
        if top.subjects.is_empty() || score > top.score {
            top.score = score;
            top.subjects = vec![hit.subject_id];
        } else if score == top.score && !top.subjects.contains(&hit.subject_id) {
            // Repeated HSPs against the same subject are not a tie
            top.subjects.push(hit.subject_id);
        }
    }

    /// The single top-scoring subject, or None if absent or tied
    pub fn unique_top(&self, query: &str) -> Option<&str> {
        match self.top.get(query) {
            Some(top) if top.subjects.len() == 1 => Some(top.subjects[0].as_str()),
            _ => None,
        }
    }

    pub fn is_tied(&self, query: &str) -> bool {
        self.top.get(query).is_some_and(|t| t.subjects.len() > 1)
    }

    pub fn len(&self) -> usize {
        self.top.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    fn queries(&self) -> impl Iterator<Item = &str> {
        self.top.keys().map(|k| k.as_str())
    }
}

/// A reciprocal best hit between a reference and a query protein
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbhPair {
    pub ref_protein: String,
    pub query_protein: String,
}

/// Intersect "A's top hit is B" with "B's top hit is A", sorted by ref protein
pub fn reciprocal_best_hits(ref_vs_query: &BestHits, query_vs_ref: &BestHits) -> Vec<BbhPair> {
    let mut pairs: Vec<BbhPair> = ref_vs_query
        .queries()
        .filter_map(|ref_protein| {
            let query_protein = ref_vs_query.unique_top(ref_protein)?;
            (query_vs_ref.unique_top(query_protein) == Some(ref_protein)).then(|| BbhPair {
                ref_protein: ref_protein.to_string(),
                query_protein: query_protein.to_string(),
            })
        })
        .collect();
    pairs.sort();

    let ties = ref_vs_query.queries().filter(|q| ref_vs_query.is_tied(q)).count()
        + query_vs_ref.queries().filter(|q| query_vs_ref.is_tied(q)).count();
    debug!(
        "{} reciprocal best hits from {} ref and {} query proteins ({} tied top hits)",
        pairs.len(),
        ref_vs_query.len(),
        query_vs_ref.len(),
        ties
    );
    pairs
}

/// Resolve a protein id to a gene index: transcript map first, then gene id
fn protein_gene(
    side: Side,
    protein: &str,
    table: &CorrespondenceTable,
    graph: &BipartiteGraph,
) -> Option<u32> {
    let registry = graph.registry();
    table
        .gene_for_transcript(side, protein)
        .and_then(|gene| registry.index_of(side, gene))
        .or_else(|| registry.index_of(side, protein))
}

/// Project protein pairs onto (ref gene, query gene) index pairs, sorted and unique
pub fn project_to_genes(
    pairs: &[BbhPair],
    table: &CorrespondenceTable,
    graph: &BipartiteGraph,
) -> Vec<(u32, u32)> {
    let mut unresolved = 0usize;
    let mut gene_pairs: Vec<(u32, u32)> = pairs
        .iter()
        .filter_map(|pair| {
            let r = protein_gene(Side::Reference, &pair.ref_protein, table, graph);
            let q = protein_gene(Side::Query, &pair.query_protein, table, graph);
            match (r, q) {
                (Some(r), Some(q)) => Some((r, q)),
                _ => {
                    debug!(
                        "No gene for BBH pair {} / {}",
                        pair.ref_protein, pair.query_protein
                    );
                    unresolved += 1;
                    None
                }
            }
        })
        .collect();
    gene_pairs.sort_unstable();
    gene_pairs.dedup();

    if unresolved > 0 {
        warn!("{unresolved} BBH pairs name proteins that resolve to no known gene; ignored");
    }
    gene_pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifyConfig;
    use crate::correspondence::TrackingRow;
    use crate::gene::GeneUniverse;

    #[test]
    fn test_reciprocal_pair_found() {
        let rq = BestHits::from_hits(vec![AlignmentHit::new("P1", "P2", 250.0)]);
        let qr = BestHits::from_hits(vec![AlignmentHit::new("P2", "P1", 248.0)]);
        let pairs = reciprocal_best_hits(&rq, &qr);
        assert_eq!(
            pairs,
            vec![BbhPair {
                ref_protein: "P1".into(),
                query_protein: "P2".into()
            }]
        );
    }

    #[test]
    fn test_non_reciprocal_hit_yields_no_pair() {
        let rq = BestHits::from_hits(vec![AlignmentHit::new("P1", "P2", 250.0)]);
        let qr = BestHits::from_hits(vec![AlignmentHit::new("P2", "P3", 300.0)]);
        assert!(reciprocal_best_hits(&rq, &qr).is_empty());
    }

    #[test]
    fn test_lower_scoring_hits_are_ignored() {
        let rq = BestHits::from_hits(vec![
            AlignmentHit::new("P1", "X", 50.0),
            AlignmentHit::new("P1", "P2", 250.0),
            AlignmentHit::new("P1", "Y", 100.0),
        ]);
        assert_eq!(rq.unique_top("P1"), Some("P2"));
        assert_eq!(rq.unique_top("missing"), None);
    }

    #[test]
    fn test_tied_top_hit_is_ambiguous() {
        let rq = BestHits::from_hits(vec![
            AlignmentHit::new("P1", "P2", 250.0),
            AlignmentHit::new("P1", "P4", 250.0),
        ]);
        let qr = BestHits::from_hits(vec![
            AlignmentHit::new("P2", "P1", 250.0),
            AlignmentHit::new("P4", "P1", 250.0),
        ]);
        assert!(rq.is_tied("P1"));
        assert!(reciprocal_best_hits(&rq, &qr).is_empty());

        // A later strictly better hit breaks the tie
        let mut rq = rq;
        rq.add(AlignmentHit::new("P1", "P2", 251.0));
        assert_eq!(reciprocal_best_hits(&rq, &qr).len(), 1);
    }

    #[test]
    fn test_tie_in_reverse_direction_is_ambiguous() {
        let rq = BestHits::from_hits(vec![AlignmentHit::new("P1", "P2", 250.0)]);
        let qr = BestHits::from_hits(vec![
            AlignmentHit::new("P2", "P1", 240.0),
            AlignmentHit::new("P2", "P5", 240.0),
        ]);
        assert!(!rq.is_tied("P1"));
        assert!(qr.is_tied("P2"));
        assert!(reciprocal_best_hits(&rq, &qr).is_empty());

        let mut qr = qr;
        qr.add(AlignmentHit::new("P2", "P1", 260.0));
        assert_eq!(
            reciprocal_best_hits(&rq, &qr),
            vec![BbhPair {
                ref_protein: "P1".into(),
                query_protein: "P2".into()
            }]
        );
    }

    #[test]
    fn test_repeated_subject_is_not_a_tie() {
        let rq = BestHits::from_hits(vec![
            AlignmentHit::new("P1", "P2", 90.0),
            AlignmentHit::new("P1", "P2", 90.0),
        ]);
        assert!(!rq.is_tied("P1"));
        assert_eq!(rq.unique_top("P1"), Some("P2"));
    }

    #[test]
    fn test_projection_through_transcripts() {
        let rows = vec![TrackingRow {
            ref_gene: Some("R1".into()),
            ref_transcript: Some("R1.t1".into()),
            query_gene: Some("Q1".into()),
            query_transcript: Some("Q1.t1".into()),
            ..Default::default()
        }];
        let table = CorrespondenceTable::from_rows(rows, &ClassifyConfig::default());
        let graph = BipartiteGraph::build(&table, &GeneUniverse::new()).unwrap();

        let pairs = vec![
            BbhPair {
                ref_protein: "R1.t1".into(),
                query_protein: "Q1".into(),
            },
            BbhPair {
                ref_protein: "unknown".into(),
                query_protein: "Q1.t1".into(),
            },
        ];
        assert_eq!(project_to_genes(&pairs, &table, &graph), vec![(0, 0)]);
    }
}
