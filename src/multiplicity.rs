/// Bipartite correspondence graph and per-gene fan-out
///
/// Reference genes and query genes are the two node sets; every deduplicated
/// correspondence edge links one of each. A gene's degree is the number of
/// distinct genes on the other side it maps to.
use log::{debug, warn};
use std::collections::BTreeSet;

use crate::correspondence::{CorrespondenceEdge, CorrespondenceTable};
use crate::error::{PavError, Result};
use crate::gene::{GeneRegistry, GeneUniverse, Side};

/// Index-addressed bipartite graph over both gene sides
#[derive(Debug, Clone)]
pub struct BipartiteGraph {
    registry: GeneRegistry,
    /// (ref index, query index), sorted and unique
    edges: Vec<(u32, u32)>,
    /// Edge metadata, parallel to `edges`
    edge_meta: Vec<CorrespondenceEdge>,
    ref_adj: Vec<Vec<u32>>,
    query_adj: Vec<Vec<u32>>,
}

fn endpoint(edge: &CorrespondenceEdge, side: Side) -> &String {
    match side {
        Side::Reference => &edge.ref_gene,
        Side::Query => &edge.query_gene,
    }
}

/// Collect the id set for one side and check every edge endpoint against it
///
/// Without a gene list a side holds only edge endpoints, so it never yields
/// an unmapped (G/H) gene.
fn side_ids(
    side: Side,
    table: &CorrespondenceTable,
    universe: &GeneUniverse,
) -> Result<BTreeSet<String>> {
    let Some(declared) = universe.side(side) else {
        let ids: BTreeSet<String> = table.edges().map(|e| endpoint(e, side).clone()).collect();
        let skipped = table.observed(side).len().saturating_sub(ids.len());
        if skipped > 0 {
            debug!("{skipped} {side} genes have no gene pair and no {side} gene list; not classified");
        }
        return Ok(ids);
    };

    for edge in table.edges() {
        let gene = endpoint(edge, side);
        if !declared.contains(gene) {
            return Err(PavError::MalformedEdge {
                gene: gene.clone(),
                side,
            });
        }
    }

    let undeclared = table
        .observed(side)
        .iter()
        .filter(|g| !declared.contains(*g))
        .count();
    if undeclared > 0 {
        warn!(
            "{undeclared} unpaired {side} genes in the correspondence table are not in the {side} gene list; ignoring them"
        );
    }

    Ok(declared.clone())
}

impl BipartiteGraph {
    /// Build the graph, validating edges against the universe where one is given
    pub fn build(table: &CorrespondenceTable, universe: &GeneUniverse) -> Result<Self> {
        universe.validate()?;
        let ref_ids = side_ids(Side::Reference, table, universe)?;
        let query_ids = side_ids(Side::Query, table, universe)?;
        let registry = GeneRegistry::from_sorted(ref_ids, query_ids)?;

        let mut ref_adj = vec![Vec::new(); registry.len(Side::Reference)];
        let mut query_adj = vec![Vec::new(); registry.len(Side::Query)];
        let mut edges = Vec::with_capacity(table.num_edges());
        let mut edge_meta = Vec::with_capacity(table.num_edges());

        // Table edges come out sorted by name, and indices follow name order
        for edge in table.edges() {
            let r = registry
                .index_of(Side::Reference, &edge.ref_gene)
                .ok_or_else(|| PavError::MalformedEdge {
                    gene: edge.ref_gene.clone(),
                    side: Side::Reference,
                })?;
            let q = registry
                .index_of(Side::Query, &edge.query_gene)
                .ok_or_else(|| PavError::MalformedEdge {
                    gene: edge.query_gene.clone(),
                    side: Side::Query,
                })?;
            edges.push((r, q));
            edge_meta.push(edge.clone());
            ref_adj[r as usize].push(q);
            query_adj[q as usize].push(r);
        }

        debug!(
            "Correspondence graph: {} ref genes, {} query genes, {} edges",
            registry.len(Side::Reference),
            registry.len(Side::Query),
            edges.len()
        );

        Ok(BipartiteGraph {
            registry,
            edges,
            edge_meta,
            ref_adj,
            query_adj,
        })
    }

    pub fn registry(&self) -> &GeneRegistry {
        &self.registry
    }

    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    pub fn edge_meta(&self, edge: usize) -> &CorrespondenceEdge {
        &self.edge_meta[edge]
    }

    pub fn num_genes(&self, side: Side) -> usize {
        self.registry.len(side)
    }

    /// Opposite-side neighbours of a gene
    pub fn neighbors(&self, side: Side, index: u32) -> &[u32] {
        match side {
            Side::Reference => &self.ref_adj[index as usize],
            Side::Query => &self.query_adj[index as usize],
        }
    }

    pub fn degree(&self, side: Side, index: u32) -> usize {
        self.neighbors(side, index).len()
    }

    pub fn multiplicity(&self) -> Multiplicity {
        Multiplicity::of(self)
    }
}

/// Fan-out of every gene on both sides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiplicity {
    pub ref_degree: Vec<usize>,
    pub query_degree: Vec<usize>,
}

impl Multiplicity {
    /// Count distinct partners from the edge list alone
    pub fn of(graph: &BipartiteGraph) -> Self {
        let mut ref_degree = vec![0; graph.num_genes(Side::Reference)];
        let mut query_degree = vec![0; graph.num_genes(Side::Query)];
        for &(r, q) in graph.edges() {
            ref_degree[r as usize] += 1;
            query_degree[q as usize] += 1;
        }
        Multiplicity {
            ref_degree,
            query_degree,
        }
    }

    pub fn degree(&self, side: Side, index: u32) -> usize {
        match side {
            Side::Reference => self.ref_degree[index as usize],
            Side::Query => self.query_degree[index as usize],
        }
    }

    /// Genes mapping to more than one partner, per side
    pub fn multi_mapped(&self) -> (usize, usize) {
        (
            self.ref_degree.iter().filter(|&&d| d > 1).count(),
            self.query_degree.iter().filter(|&&d| d > 1).count(),
        )
    }
}
