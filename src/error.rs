/// Typed errors raised while loading tables and classifying mapping groups
///
/// Any of these aborts a run before a single assignment is emitted.
use thiserror::Error;

use crate::gene::Side;

#[derive(Debug, Error)]
pub enum PavError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An edge names a gene that the supplied gene universe does not declare
    #[error("correspondence edge references {side} gene '{gene}' which is absent from the {side} gene universe")]
    MalformedEdge { gene: String, side: Side },

    /// The same identifier was seen on both the reference and the query side
    #[error("gene '{gene}' is declared on both the reference and the query side")]
    ConflictingSide { gene: String },

    /// A connected group whose shape matches no scenario rule.
    /// This is a graph construction bug, not bad input.
    #[error(
        "mapping group {group_id} matches no scenario rule (ref genes: [{}], query genes: [{}])",
        .ref_genes.join(", "),
        .query_genes.join(", ")
    )]
    UnclassifiableGroup {
        group_id: usize,
        ref_genes: Vec<String>,
        query_genes: Vec<String>,
    },

    #[error("{path}: required column '{column}' not found in header")]
    MissingColumn { column: String, path: String },

    #[error("{path}: table contains no data rows")]
    EmptyTable { path: String },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, PavError>;
