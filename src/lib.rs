//! Removes datasources from a configuration tree when their `constraints` do not hold on
//! the running host.
//!
//! Constraints are boolean expressions over a fixed set of variables (`agent.id`,
//! `agent.version`, `host.architecture`, `os.family`, `os.kernel`, `os.platform`,
//! `os.version`) and registered functions such as `validate_version`.

pub mod errors;
pub mod context;
pub mod facts;
pub mod functions;
pub mod expression;
pub mod filter;
pub mod tree;
pub mod comparison;
mod parser;

use serde_json::Value;

pub use context::{shared_context, shared_context_with, EvalContext, VariableStore};
pub use errors::{ContextError, EvalError, FactError, FilterError, TreeError};
pub use facts::{FactProvider, FactsConfig, HostFacts, SystemFacts};
pub use filter::{datasource_identifier, filter_datasources};
pub use functions::{Function, Registry};

/// Evaluate one constraint against the process-wide context.
pub fn evaluate(constraint: &str) -> Result<bool, FilterError> {
    let ctx = shared_context()?;
    Ok(ctx.evaluate(constraint)?)
}

/// Filter `root` with the process-wide context. See [`filter_datasources`].
pub fn filter(root: &mut Value) -> Result<usize, FilterError> {
    let ctx = shared_context()?;
    filter_datasources(root, &ctx)
}
