//! Layer Graph
//!
//! - [`model`]: layers, parameter sets and node scripts
//! - [`builder`]: the construction session and the frozen [`Dag`]
//! - [`decorator`]: registering callables as layers
//! - [`validator`]: structural checks before writing
//! - [`writer`]: DAG file and submit file output

pub mod builder;
pub mod decorator;
pub mod model;
pub mod validator;
pub mod writer;

pub use builder::{Dag, DagBuilder, DagConfig, DEFAULT_SCRIPT_EXTENSION};
pub use decorator::{LayerDecorator, LayerFn, LayerRef};
pub use model::{InstanceVars, Layer, LayerOptions, NodeScript};
pub use validator::{quick_validate, validate_dag, ValidationError};
pub use writer::{render_dag, write_dag};
