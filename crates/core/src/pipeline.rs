//! Boundary to the pipeline compiler.
//!
//! A rule entry with operations describes a transformation chain; a
//! [`PipelineBuilder`] turns the entry into something executable. Operation
//! semantics live with the compiler — this crate invokes `build` during
//! validation and accepts any error kind it reports.

use serde_json::Value;

use crate::route::RuleEntry;

/// Error type produced by pipeline builders; deliberately unconstrained.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A compiled transformation chain.
pub trait CompiledPipeline: Send + Sync {
    /// Run the chain over a message payload.
    fn apply(&self, message: Value) -> Result<Value, BoxError>;
}

/// Compiles a rule entry's operation list into an executable chain.
pub trait PipelineBuilder: Send + Sync {
    fn build(&self, entry: &RuleEntry) -> Result<Box<dyn CompiledPipeline>, BoxError>;
}
