/// Gene identifiers for both annotation sides
///
/// Genes are addressed by dense integer indices per side. Indices follow the
/// lexical order of gene ids so that everything derived from them is stable
/// regardless of input row order.
use indexmap::IndexSet;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{PavError, Result};

/// Which annotation a gene belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Reference,
    Query,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Reference => "ref",
            Side::Query => "query",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Reference => Side::Query,
            Side::Query => Side::Reference,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ref" | "reference" => Ok(Side::Reference),
            "query" | "qry" => Ok(Side::Query),
            _ => Err(format!("Invalid side '{s}'. Use ref or query")),
        }
    }
}

/// Exhaustive gene id lists, one optional list per side
///
/// A side without a list falls back to the genes observed in the
/// correspondence table.
#[derive(Debug, Clone, Default)]
pub struct GeneUniverse {
    pub reference: Option<BTreeSet<String>>,
    pub query: Option<BTreeSet<String>>,
}

impl GeneUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference<I: IntoIterator<Item = String>>(mut self, genes: I) -> Self {
        self.reference = Some(genes.into_iter().collect());
        self
    }

    pub fn with_query<I: IntoIterator<Item = String>>(mut self, genes: I) -> Self {
        self.query = Some(genes.into_iter().collect());
        self
    }

    pub fn side(&self, side: Side) -> Option<&BTreeSet<String>> {
        match side {
            Side::Reference => self.reference.as_ref(),
            Side::Query => self.query.as_ref(),
        }
    }

    /// Is `gene` allowed on `side`? Always true for an undeclared side.
    pub fn admits(&self, side: Side, gene: &str) -> bool {
        self.side(side).map_or(true, |genes| genes.contains(gene))
    }

    /// Reject ids that are declared on both sides
    pub fn validate(&self) -> Result<()> {
        if let (Some(r), Some(q)) = (&self.reference, &self.query) {
            if let Some(gene) = r.intersection(q).next() {
                return Err(PavError::ConflictingSide { gene: gene.clone() });
            }
        }
        Ok(())
    }
}

/// Index <-> name registry for the genes of both sides
#[derive(Debug, Clone, Default)]
pub struct GeneRegistry {
    reference: IndexSet<String>,
    query: IndexSet<String>,
}

impl GeneRegistry {
    /// Build from two id sets; ids are indexed in sorted order
    pub fn from_sorted(reference: BTreeSet<String>, query: BTreeSet<String>) -> Result<Self> {
        if let Some(gene) = reference.intersection(&query).next() {
            return Err(PavError::ConflictingSide { gene: gene.clone() });
        }
        Ok(GeneRegistry {
            reference: reference.into_iter().collect(),
            query: query.into_iter().collect(),
        })
    }

    pub fn len(&self, side: Side) -> usize {
        self.ids(side).len()
    }

    pub fn total(&self) -> usize {
        self.reference.len() + self.query.len()
    }

    pub fn index_of(&self, side: Side, gene: &str) -> Option<u32> {
        self.ids(side).get_index_of(gene).map(|i| i as u32)
    }

    pub fn name(&self, side: Side, index: u32) -> Option<&str> {
        self.ids(side).get_index(index as usize).map(|s| s.as_str())
    }

    /// Which side, if any, carries this id
    pub fn side_of(&self, gene: &str) -> Option<Side> {
        if self.reference.contains(gene) {
            Some(Side::Reference)
        } else if self.query.contains(gene) {
            Some(Side::Query)
        } else {
            None
        }
    }

    fn ids(&self, side: Side) -> &IndexSet<String> {
        match side {
            Side::Reference => &self.reference,
            Side::Query => &self.query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_registry_sorted_indices() {
        let registry = GeneRegistry::from_sorted(set(&["R2", "R1"]), set(&["Q1"])).unwrap();
        assert_eq!(registry.index_of(Side::Reference, "R1"), Some(0));
        assert_eq!(registry.index_of(Side::Reference, "R2"), Some(1));
        assert_eq!(registry.name(Side::Query, 0), Some("Q1"));
        assert_eq!(registry.side_of("Q1"), Some(Side::Query));
        assert_eq!(registry.side_of("Q9"), None);
        assert_eq!(registry.total(), 3);
    }

    #[test]
    fn test_registry_rejects_shared_id() {
        let err = GeneRegistry::from_sorted(set(&["X"]), set(&["X"])).unwrap_err();
        assert!(matches!(err, PavError::ConflictingSide { gene } if gene == "X"));
    }

    #[test]
    fn test_universe_admits_undeclared_side() {
        let universe = GeneUniverse::new().with_reference(vec!["R1".to_string()]);
        assert!(universe.admits(Side::Reference, "R1"));
        assert!(!universe.admits(Side::Reference, "R2"));
        assert!(universe.admits(Side::Query, "anything"));
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("ref".parse::<Side>().unwrap(), Side::Reference);
        assert_eq!("Query".parse::<Side>().unwrap(), Side::Query);
        assert!("both".parse::<Side>().is_err());
        assert_eq!(Side::Reference.opposite(), Side::Query);
    }
}
