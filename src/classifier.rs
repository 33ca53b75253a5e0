/// Per-gene scenario assignment over a whole correspondence graph
///
/// Groups are classified independently on the rayon pool and merged; the
/// merged list is sorted by (side, gene id) so output never depends on
/// scheduling or input row order.
use log::info;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::bbh::{project_to_genes, reciprocal_best_hits, BestHits};
use crate::components::{MappingGroup, Partition};
use crate::correspondence::CorrespondenceTable;
use crate::error::Result;
use crate::gene::{GeneUniverse, Side};
use crate::multiplicity::BipartiteGraph;
use crate::scenario::{classify_group, GroupShape, ScenarioLabel};

/// The scenario of a single gene and the evidence behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioAssignment {
    pub gene_id: String,
    pub side: Side,
    pub label: ScenarioLabel,
    /// None for unmapped (G/H) genes
    pub group_id: Option<usize>,
    pub group_shape: Option<GroupShape>,
    /// Distinct genes on the other side this gene maps to
    pub degree: usize,
    /// Reciprocal best hit partners inside the same group, sorted
    pub bbh_partners: Vec<String>,
}

/// Both alignment directions, as best-hit tables
#[derive(Debug, Clone, Copy)]
pub struct AlignmentEvidence<'a> {
    pub ref_vs_query: &'a BestHits,
    pub query_vs_ref: &'a BestHits,
}

/// Output of a full classification run
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub assignments: Vec<ScenarioAssignment>,
    pub num_groups: usize,
}

impl Classification {
    pub fn get(&self, side: Side, gene: &str) -> Option<&ScenarioAssignment> {
        self.assignments
            .binary_search_by(|a| (a.side, a.gene_id.as_str()).cmp(&(side, gene)))
            .ok()
            .map(|i| &self.assignments[i])
    }

    /// Label of a gene, looked up on whichever side carries it
    pub fn label_of(&self, gene: &str) -> Option<ScenarioLabel> {
        self.get(Side::Reference, gene)
            .or_else(|| self.get(Side::Query, gene))
            .map(|a| a.label)
    }

    /// Gene counts per (label, side)
    pub fn counts(&self) -> BTreeMap<(ScenarioLabel, Side), usize> {
        let mut counts = BTreeMap::new();
        for a in &self.assignments {
            *counts.entry((a.label, a.side)).or_insert(0) += 1;
        }
        counts
    }
}

/// BBH partners keyed by gene, kept only for pairs inside one group of more than two genes
fn group_bbh_partners(
    gene_pairs: &[(u32, u32)],
    graph: &BipartiteGraph,
    partition: &Partition,
) -> HashMap<(Side, u32), Vec<String>> {
    let registry = graph.registry();
    let mut partners: HashMap<(Side, u32), Vec<String>> = HashMap::new();

    for &(r, q) in gene_pairs {
        let (Some(rg), Some(qg)) = (
            partition.group_of(Side::Reference, r),
            partition.group_of(Side::Query, q),
        ) else {
            continue;
        };
        if rg.id != qg.id || rg.size() <= 2 {
            continue;
        }
        if let (Some(rn), Some(qn)) = (
            registry.name(Side::Reference, r),
            registry.name(Side::Query, q),
        ) {
            partners
                .entry((Side::Reference, r))
                .or_default()
                .push(qn.to_string());
            partners
                .entry((Side::Query, q))
                .or_default()
                .push(rn.to_string());
        }
    }

    for list in partners.values_mut() {
        list.sort();
        list.dedup();
    }
    partners
}

fn group_assignments(
    group: &MappingGroup,
    label: ScenarioLabel,
    graph: &BipartiteGraph,
    partners: &HashMap<(Side, u32), Vec<String>>,
) -> Vec<ScenarioAssignment> {
    let shape = group.shape();
    let registry = graph.registry();
    [Side::Reference, Side::Query]
        .into_iter()
        .flat_map(move |side| group.genes(side).iter().map(move |&g| (side, g)))
        .filter_map(|(side, g)| {
            Some(ScenarioAssignment {
                gene_id: registry.name(side, g)?.to_string(),
                side,
                label,
                group_id: Some(group.id),
                group_shape: Some(shape),
                degree: graph.degree(side, g),
                bbh_partners: partners.get(&(side, g)).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

/// Classify every group and every unmapped gene
///
/// Fails with the first unclassifiable group; no partial result is returned.
pub fn classify(
    graph: &BipartiteGraph,
    partition: &Partition,
    bbh_gene_pairs: &[(u32, u32)],
) -> Result<Classification> {
    let partners = group_bbh_partners(bbh_gene_pairs, graph, partition);

    let per_group: Vec<Vec<ScenarioAssignment>> = partition
        .groups
        .par_iter()
        .map(|group| -> Result<Vec<ScenarioAssignment>> {
            let label = classify_group(group, graph)?;
            Ok(group_assignments(group, label, graph, &partners))
        })
        .collect::<Result<_>>()?;

    let mut assignments: Vec<ScenarioAssignment> = per_group.into_iter().flatten().collect();

    let registry = graph.registry();
    for side in [Side::Reference, Side::Query] {
        for &g in partition.unmapped(side) {
            if let Some(name) = registry.name(side, g) {
                assignments.push(ScenarioAssignment {
                    gene_id: name.to_string(),
                    side,
                    label: ScenarioLabel::unmapped(side),
                    group_id: None,
                    group_shape: None,
                    degree: 0,
                    bbh_partners: Vec::new(),
                });
            }
        }
    }

    assignments.sort_by(|a, b| (a.side, &a.gene_id).cmp(&(b.side, &b.gene_id)));

    Ok(Classification {
        assignments,
        num_groups: partition.groups.len(),
    })
}

/// Full pipeline: graph, degrees, components, BBH evidence, scenarios
pub fn run(
    table: &CorrespondenceTable,
    universe: &GeneUniverse,
    evidence: Option<AlignmentEvidence<'_>>,
) -> Result<Classification> {
    let graph = BipartiteGraph::build(table, universe)?;
    let (multi_ref, multi_query) = graph.multiplicity().multi_mapped();
    info!(
        "{} ref and {} query genes, {} gene pairs ({} ref and {} query genes map to several partners)",
        graph.num_genes(Side::Reference),
        graph.num_genes(Side::Query),
        graph.edges().len(),
        multi_ref,
        multi_query
    );

    let partition = Partition::of(&graph);

    let gene_pairs = match evidence {
        Some(ev) => {
            let pairs = reciprocal_best_hits(ev.ref_vs_query, ev.query_vs_ref);
            info!("{} reciprocal best hit protein pairs", pairs.len());
            project_to_genes(&pairs, table, &graph)
        }
        None => Vec::new(),
    };

    let classification = classify(&graph, &partition, &gene_pairs)?;
    info!(
        "Classified {} genes in {} mapping groups",
        classification.assignments.len(),
        classification.num_groups
    );
    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbh::AlignmentHit;
    use crate::config::ClassifyConfig;
    use crate::correspondence::TrackingRow;

    fn table(pairs: &[(&str, &str)]) -> CorrespondenceTable {
        CorrespondenceTable::from_rows(
            pairs.iter().map(|(r, q)| TrackingRow::pair(r, q)),
            &ClassifyConfig::default(),
        )
    }

    #[test]
    fn test_mixed_graph_labels() {
        let t = table(&[
            ("R1", "Q1"),
            ("R2", "Q2"),
            ("R2", "Q3"),
            ("R3", "Q4"),
            ("R4", "Q4"),
        ]);
        let universe = GeneUniverse::new()
            .with_reference(["R1", "R2", "R3", "R4", "R5"].map(String::from))
            .with_query(["Q1", "Q2", "Q3", "Q4", "Q9"].map(String::from));
        let result = run(&t, &universe, None).unwrap();

        assert_eq!(result.assignments.len(), 10);
        assert_eq!(result.num_groups, 3);
        assert_eq!(result.label_of("R1"), Some(ScenarioLabel::E));
        assert_eq!(result.label_of("Q3"), Some(ScenarioLabel::A));
        assert_eq!(result.label_of("R4"), Some(ScenarioLabel::B));
        assert_eq!(result.label_of("R5"), Some(ScenarioLabel::G));
        assert_eq!(result.label_of("Q9"), Some(ScenarioLabel::H));

        let r2 = result.get(Side::Reference, "R2").unwrap();
        assert_eq!(r2.degree, 2);
        assert_eq!(r2.group_shape, Some(GroupShape::new(1, 2)));
        assert!(result.get(Side::Reference, "R5").unwrap().group_id.is_none());
    }

    #[test]
    fn test_bbh_annotates_only_multi_gene_groups() {
        let t = table(&[("R1", "Q1"), ("R1", "Q2"), ("R9", "Q9")]);
        let rq = BestHits::from_hits(vec![
            AlignmentHit::new("R1", "Q2", 400.0),
            AlignmentHit::new("R9", "Q9", 100.0),
        ]);
        let qr = BestHits::from_hits(vec![
            AlignmentHit::new("Q2", "R1", 390.0),
            AlignmentHit::new("Q1", "R1", 120.0),
            AlignmentHit::new("Q9", "R9", 100.0),
        ]);
        let evidence = AlignmentEvidence {
            ref_vs_query: &rq,
            query_vs_ref: &qr,
        };
        let result = run(&t, &GeneUniverse::new(), Some(evidence)).unwrap();

        let r1 = result.get(Side::Reference, "R1").unwrap();
        assert_eq!(r1.label, ScenarioLabel::A);
        assert_eq!(r1.bbh_partners, vec!["Q2"]);
        assert_eq!(
            result.get(Side::Query, "Q2").unwrap().bbh_partners,
            vec!["R1"]
        );
        assert!(result.get(Side::Query, "Q1").unwrap().bbh_partners.is_empty());
        // 1:1 groups carry no BBH annotation
        assert!(result.get(Side::Reference, "R9").unwrap().bbh_partners.is_empty());
    }

    #[test]
    fn test_bbh_across_groups_is_discarded() {
        let t = table(&[("R1", "Q1"), ("R1", "Q2"), ("R2", "Q3"), ("R2", "Q4")]);
        let rq = BestHits::from_hits(vec![AlignmentHit::new("R1", "Q3", 400.0)]);
        let qr = BestHits::from_hits(vec![AlignmentHit::new("Q3", "R1", 400.0)]);
        let evidence = AlignmentEvidence {
            ref_vs_query: &rq,
            query_vs_ref: &qr,
        };
        let result = run(&t, &GeneUniverse::new(), Some(evidence)).unwrap();
        assert!(result.assignments.iter().all(|a| a.bbh_partners.is_empty()));
    }

    #[test]
    fn test_counts_by_label_and_side() {
        let t = table(&[("R1", "Q1"), ("R2", "Q2"), ("R3", "Q2")]);
        let result = run(&t, &GeneUniverse::new(), None).unwrap();
        let counts = result.counts();
        assert_eq!(counts[&(ScenarioLabel::E, Side::Reference)], 1);
        assert_eq!(counts[&(ScenarioLabel::B, Side::Reference)], 2);
        assert_eq!(counts[&(ScenarioLabel::B, Side::Query)], 1);
    }
}
