/// Scenario labels and the priority-ordered rule cascade
///
/// Positional swap (F) is not detected, so it has no variant here and can
/// never be emitted.
use std::fmt;
use std::str::FromStr;

use crate::components::{DegreeProfile, MappingGroup};
use crate::error::{PavError, Result};
use crate::gene::Side;
use crate::multiplicity::BipartiteGraph;

/// Mapping scenario of a gene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioLabel {
    /// 1:1 ortholog
    E,
    /// One ref gene split into two query genes
    A,
    /// One ref gene split into three or more query genes
    J,
    /// Several ref genes merged into one query gene
    B,
    /// Cross-mapping: fan-out on both sides of one group
    Cdi,
    /// Reference gene without a query counterpart
    G,
    /// Query gene without a reference counterpart
    H,
}

impl ScenarioLabel {
    /// Every emittable label, in report order
    pub const ALL: [ScenarioLabel; 7] = [
        ScenarioLabel::E,
        ScenarioLabel::A,
        ScenarioLabel::B,
        ScenarioLabel::J,
        ScenarioLabel::Cdi,
        ScenarioLabel::G,
        ScenarioLabel::H,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioLabel::E => "E",
            ScenarioLabel::A => "A",
            ScenarioLabel::J => "J",
            ScenarioLabel::B => "B",
            ScenarioLabel::Cdi => "CDI",
            ScenarioLabel::G => "G",
            ScenarioLabel::H => "H",
        }
    }

    /// Label for a gene with no incident edge
    pub fn unmapped(side: Side) -> Self {
        match side {
            Side::Reference => ScenarioLabel::G,
            Side::Query => ScenarioLabel::H,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        matches!(self, ScenarioLabel::G | ScenarioLabel::H)
    }
}

impl fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScenarioLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "E" => Ok(ScenarioLabel::E),
            "A" => Ok(ScenarioLabel::A),
            "J" => Ok(ScenarioLabel::J),
            "B" => Ok(ScenarioLabel::B),
            "CDI" => Ok(ScenarioLabel::Cdi),
            "G" => Ok(ScenarioLabel::G),
            "H" => Ok(ScenarioLabel::H),
            "F" => Err("Scenario F (positional swap) is disabled and never emitted".to_string()),
            other => Err(format!(
                "Unknown scenario '{other}'. Use E, A, B, J, CDI, G or H"
            )),
        }
    }
}

/// Gene counts per side of a mapping group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupShape {
    pub ref_count: usize,
    pub query_count: usize,
}

impl GroupShape {
    pub fn new(ref_count: usize, query_count: usize) -> Self {
        GroupShape {
            ref_count,
            query_count,
        }
    }

    /// First matching rule wins: CDI, E, A, J, B
    pub fn label(&self) -> Option<ScenarioLabel> {
        match (self.ref_count, self.query_count) {
            (r, q) if r >= 2 && q >= 2 => Some(ScenarioLabel::Cdi),
            (1, 1) => Some(ScenarioLabel::E),
            (1, 2) => Some(ScenarioLabel::A),
            (1, q) if q >= 3 => Some(ScenarioLabel::J),
            (r, 1) if r >= 2 => Some(ScenarioLabel::B),
            _ => None,
        }
    }
}

impl fmt::Display for GroupShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ref_count, self.query_count)
    }
}

/// Does the degree profile agree with the label picked from the shape?
///
/// A connected group always agrees; disagreement means the group was not
/// built from its own induced edges.
fn profile_consistent(label: ScenarioLabel, shape: GroupShape, profile: &DegreeProfile) -> bool {
    let all_one = |d: &[usize]| d.iter().all(|&x| x == 1);
    match label {
        ScenarioLabel::Cdi => profile.max_ref_degree() > 1 && profile.max_query_degree() > 1,
        ScenarioLabel::E | ScenarioLabel::A | ScenarioLabel::J => {
            profile.ref_degrees == [shape.query_count] && all_one(&profile.query_degrees)
        }
        ScenarioLabel::B => {
            profile.query_degrees == [shape.ref_count] && all_one(&profile.ref_degrees)
        }
        ScenarioLabel::G | ScenarioLabel::H => false,
    }
}

/// Resolve a mapping group to exactly one scenario
pub fn classify_group(group: &MappingGroup, graph: &BipartiteGraph) -> Result<ScenarioLabel> {
    let shape = group.shape();
    let profile = group.degree_profile(graph);

    match shape.label() {
        Some(label) if profile_consistent(label, shape, &profile) => Ok(label),
        _ => Err(PavError::UnclassifiableGroup {
            group_id: group.id,
            ref_genes: group
                .names(graph, Side::Reference)
                .into_iter()
                .map(String::from)
                .collect(),
            query_genes: group
                .names(graph, Side::Query)
                .into_iter()
                .map(String::from)
                .collect(),
        }),
    }
}
