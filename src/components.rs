/// Partition of the correspondence graph into connected mapping groups
///
/// Reference gene `r` is union-find node `r`, query gene `q` is node
/// `n_ref + q`. Genes without an incident edge form no group and are
/// reported as unmapped.
use log::debug;

use crate::gene::Side;
use crate::multiplicity::BipartiteGraph;
use crate::scenario::GroupShape;
use crate::union_find::UnionFind;

/// A maximal connected set of reference and query genes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingGroup {
    /// 1-based, assigned in order of the group's smallest reference gene id
    pub id: usize,
    pub ref_genes: Vec<u32>,
    pub query_genes: Vec<u32>,
    /// Indices into `BipartiteGraph::edges`
    pub edges: Vec<usize>,
}

/// Degree multiset of a group, recomputed from its induced edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeProfile {
    /// Sorted descending
    pub ref_degrees: Vec<usize>,
    /// Sorted descending
    pub query_degrees: Vec<usize>,
}

impl DegreeProfile {
    pub fn max_ref_degree(&self) -> usize {
        self.ref_degrees.first().copied().unwrap_or(0)
    }

    pub fn max_query_degree(&self) -> usize {
        self.query_degrees.first().copied().unwrap_or(0)
    }
}

impl MappingGroup {
    pub fn shape(&self) -> GroupShape {
        GroupShape {
            ref_count: self.ref_genes.len(),
            query_count: self.query_genes.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.ref_genes.len() + self.query_genes.len()
    }

    pub fn genes(&self, side: Side) -> &[u32] {
        match side {
            Side::Reference => &self.ref_genes,
            Side::Query => &self.query_genes,
        }
    }

    pub fn contains(&self, side: Side, index: u32) -> bool {
        self.genes(side).binary_search(&index).is_ok()
    }

    pub fn degree_profile(&self, graph: &BipartiteGraph) -> DegreeProfile {
        let mut ref_degrees = vec![0usize; self.ref_genes.len()];
        let mut query_degrees = vec![0usize; self.query_genes.len()];
        for &e in &self.edges {
            let (r, q) = graph.edges()[e];
            if let Ok(i) = self.ref_genes.binary_search(&r) {
                ref_degrees[i] += 1;
            }
            if let Ok(j) = self.query_genes.binary_search(&q) {
                query_degrees[j] += 1;
            }
        }
        ref_degrees.sort_unstable_by(|a, b| b.cmp(a));
        query_degrees.sort_unstable_by(|a, b| b.cmp(a));
        DegreeProfile {
            ref_degrees,
            query_degrees,
        }
    }

    /// Gene ids of one side, in index (= lexical) order
    pub fn names<'a>(&self, graph: &'a BipartiteGraph, side: Side) -> Vec<&'a str> {
        self.genes(side)
            .iter()
            .filter_map(|&i| graph.registry().name(side, i))
            .collect()
    }
}

/// Every group plus the genes left out of all groups
#[derive(Debug, Clone)]
pub struct Partition {
    pub groups: Vec<MappingGroup>,
    pub unmapped_ref: Vec<u32>,
    pub unmapped_query: Vec<u32>,
    ref_group: Vec<Option<usize>>,
    query_group: Vec<Option<usize>>,
}

impl Partition {
    /// Connected components of the graph, numbered deterministically
    pub fn of(graph: &BipartiteGraph) -> Self {
        let n_ref = graph.num_genes(Side::Reference);
        let n_query = graph.num_genes(Side::Query);

        let mut uf = UnionFind::new(n_ref + n_query);
        for &(r, q) in graph.edges() {
            uf.union(r as usize, n_ref + q as usize);
        }

        let mut ref_group = vec![None; n_ref];
        let mut query_group = vec![None; n_query];
        let mut groups: Vec<MappingGroup> = uf
            .merged_sets()
            .into_iter()
            .enumerate()
            .map(|(slot, members)| {
                let mut group = MappingGroup {
                    id: slot + 1,
                    ref_genes: Vec::new(),
                    query_genes: Vec::new(),
                    edges: Vec::new(),
                };
                for node in members {
                    if node < n_ref {
                        ref_group[node] = Some(slot);
                        group.ref_genes.push(node as u32);
                    } else {
                        query_group[node - n_ref] = Some(slot);
                        group.query_genes.push((node - n_ref) as u32);
                    }
                }
                group
            })
            .collect();

        for (e, &(r, _)) in graph.edges().iter().enumerate() {
            if let Some(slot) = ref_group[r as usize] {
                groups[slot].edges.push(e);
            }
        }

        let unmapped_ref: Vec<u32> = (0..n_ref as u32)
            .filter(|&r| ref_group[r as usize].is_none())
            .collect();
        let unmapped_query: Vec<u32> = (0..n_query as u32)
            .filter(|&q| query_group[q as usize].is_none())
            .collect();

        debug!(
            "Partitioned into {} mapping groups; {} ref and {} query genes unmapped",
            groups.len(),
            unmapped_ref.len(),
            unmapped_query.len()
        );

        Partition {
            groups,
            unmapped_ref,
            unmapped_query,
            ref_group,
            query_group,
        }
    }

    /// The group a gene belongs to, if it is mapped
    pub fn group_of(&self, side: Side, index: u32) -> Option<&MappingGroup> {
        let slot = match side {
            Side::Reference => self.ref_group[index as usize],
            Side::Query => self.query_group[index as usize],
        };
        slot.map(|s| &self.groups[s])
    }

    pub fn unmapped(&self, side: Side) -> &[u32] {
        match side {
            Side::Reference => &self.unmapped_ref,
            Side::Query => &self.unmapped_query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifyConfig;
    use crate::correspondence::{CorrespondenceTable, TrackingRow};
    use crate::gene::GeneUniverse;

    fn graph(pairs: &[(&str, &str)], universe: &GeneUniverse) -> BipartiteGraph {
        let table = CorrespondenceTable::from_rows(
            pairs.iter().map(|(r, q)| TrackingRow::pair(r, q)),
            &ClassifyConfig::default(),
        );
        BipartiteGraph::build(&table, universe).unwrap()
    }

    #[test]
    fn test_components_split_disjoint_structures() {
        let g = graph(
            &[("R1", "Q1"), ("R2", "Q2"), ("R2", "Q3"), ("R3", "Q3")],
            &GeneUniverse::new(),
        );
        let partition = Partition::of(&g);

        assert_eq!(partition.groups.len(), 2);
        let first = &partition.groups[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.names(&g, Side::Reference), vec!["R1"]);
        assert_eq!(first.names(&g, Side::Query), vec!["Q1"]);

        let second = &partition.groups[1];
        assert_eq!(second.names(&g, Side::Reference), vec!["R2", "R3"]);
        assert_eq!(second.names(&g, Side::Query), vec!["Q2", "Q3"]);
        assert_eq!(second.edges.len(), 3);

        let profile = second.degree_profile(&g);
        assert_eq!(profile.ref_degrees, vec![2, 1]);
        assert_eq!(profile.query_degrees, vec![2, 1]);
    }

    #[test]
    fn test_isolated_genes_are_unmapped() {
        let universe = GeneUniverse::new()
            .with_reference(vec!["R1".to_string(), "R3".to_string()])
            .with_query(vec!["Q1".to_string(), "Q5".to_string()]);
        let g = graph(&[("R1", "Q1")], &universe);
        let partition = Partition::of(&g);

        assert_eq!(partition.groups.len(), 1);
        assert_eq!(partition.unmapped(Side::Reference), &[1]);
        assert_eq!(partition.unmapped(Side::Query), &[1]);
        assert!(partition.group_of(Side::Reference, 1).is_none());
        assert_eq!(partition.group_of(Side::Query, 0).map(|g| g.id), Some(1));
    }
}
