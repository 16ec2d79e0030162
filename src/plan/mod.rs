//! Workflow Plans
//!
//! YAML descriptions of a whole DAG, used by the command-line interface.

pub mod parser;

pub use parser::{load_plan, save_plan, LayerPlan, NodeScriptPlan, WorkflowPlan};
