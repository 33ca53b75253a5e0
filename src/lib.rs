// Library exports for pavscan
pub mod bbh;
pub mod classifier;
pub mod components;
pub mod config;
pub mod correspondence;
pub mod error;
pub mod gene;
pub mod multiplicity;
pub mod report;
pub mod scenario;
pub mod table_io;
pub mod union_find;

pub use classifier::{run, AlignmentEvidence, Classification, ScenarioAssignment};
pub use error::PavError;
pub use scenario::ScenarioLabel;
