// Registry sync pipeline: pure processing stages plus the run orchestrator

pub mod processing;
pub mod run;

pub use run::{Pipeline, RunInputs, RunOutcome, RunReport};
