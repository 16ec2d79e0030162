//! DAG Validation
//!
//! Checks a finalized [`Dag`] right before it is written:
//! - layer names are usable DAG tokens
//! - every parent precedes its children
//! - every layer's job descriptor is registered
//! - VARS keys are valid macro names
//! - VARS values and node script lines stay on one line
//!
//! [`quick_validate`] reports softer issues that still produce a valid file.

use std::collections::HashSet;

use log::{debug, info, warn};

use super::builder::Dag;
use super::model::Layer;
use crate::error::{DagError, Result};
use crate::script::function::is_identifier;

const RESERVED_WORDS: &[&str] = &["PARENT", "CHILD"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyLayerName,
    InvalidLayerName(String),
    DuplicateLayer(String),
    ParentNotBefore { layer: String, parent: String },
    UnregisteredDescriptor { layer: String, descriptor: String },
    InvalidVarName { layer: String, key: String },
    InvalidVarValue { layer: String, key: String },
    InvalidNodeScript { layer: String, script: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLayerName => write!(f, "A layer has an empty name"),
            Self::InvalidLayerName(name) => write!(
                f,
                "Layer name '{}' contains whitespace or is a reserved word",
                name
            ),
            Self::DuplicateLayer(name) => write!(f, "Duplicate layer name: '{}'", name),
            Self::ParentNotBefore { layer, parent } => write!(
                f,
                "Layer '{}' has parent '{}' which is not defined before it",
                layer, parent
            ),
            Self::UnregisteredDescriptor { layer, descriptor } => write!(
                f,
                "Layer '{}' uses job descriptor '{}' which is not registered",
                layer, descriptor
            ),
            Self::InvalidVarName { layer, key } => {
                write!(f, "Layer '{}': '{}' is not a valid VARS name", layer, key)
            }
            Self::InvalidVarValue { layer, key } => {
                write!(f, "Layer '{}': VARS value for '{}' contains a line break", layer, key)
            }
            Self::InvalidNodeScript { layer, script } => write!(
                f,
                "Layer '{}': node script '{}' contains a line break",
                layer,
                script.escape_default()
            ),
        }
    }
}

fn is_valid_token(name: &str) -> bool {
    !name.chars().any(char::is_whitespace)
        && !name.contains('"')
        && !RESERVED_WORDS
            .iter()
            .any(|w| w.eq_ignore_ascii_case(name))
}

fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// DAGMan macro names: identifiers not starting with `queue`.
fn is_valid_var_name(key: &str) -> bool {
    is_identifier(key) && !key.to_ascii_lowercase().starts_with("queue")
}

fn validate_layer(layer: &Layer) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if layer.name().trim().is_empty() {
        errors.push(ValidationError::EmptyLayerName);
        return errors;
    }

    if !is_valid_token(layer.name()) {
        errors.push(ValidationError::InvalidLayerName(layer.name().to_string()));
    }

    let mut reported: HashSet<&str> = HashSet::new();
    for key in layer.vars().iter().flat_map(|v| v.keys()) {
        if !is_valid_var_name(key) && reported.insert(key) {
            errors.push(ValidationError::InvalidVarName {
                layer: layer.name().to_string(),
                key: key.to_string(),
            });
        }
    }

    let mut broken: HashSet<&str> = HashSet::new();
    for (key, value) in layer.vars().iter().flat_map(|v| v.iter()) {
        if has_line_break(value) && broken.insert(key) {
            errors.push(ValidationError::InvalidVarValue {
                layer: layer.name().to_string(),
                key: key.to_string(),
            });
        }
    }

    for script in layer.pre_script().into_iter().chain(layer.post_script()) {
        let line = script.to_string();
        if has_line_break(&line) {
            errors.push(ValidationError::InvalidNodeScript {
                layer: layer.name().to_string(),
                script: line,
            });
        }
    }

    if layer.parent().is_none() {
        debug!("Layer '{}' is a root layer", layer.name());
    }

    errors
}

/// Validates the DAG structure; all problems are reported together.
pub fn validate_dag(dag: &Dag) -> Result<()> {
    info!("Validating DAG '{}' with {} layers", dag.name(), dag.len());

    let mut all_errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for layer in dag.layers() {
        all_errors.extend(validate_layer(layer));

        if let Some(parent) = layer.parent() {
            if !seen.contains(parent) {
                all_errors.push(ValidationError::ParentNotBefore {
                    layer: layer.name().to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        if dag.descriptor(layer.descriptor()).is_none() {
            all_errors.push(ValidationError::UnregisteredDescriptor {
                layer: layer.name().to_string(),
                descriptor: layer.descriptor().to_string(),
            });
        }

        if !seen.insert(layer.name()) {
            all_errors.push(ValidationError::DuplicateLayer(layer.name().to_string()));
        }
    }

    if !all_errors.is_empty() {
        let error_messages: Vec<String> = all_errors.iter().map(|e| e.to_string()).collect();
        return Err(DagError::InvalidDag(error_messages.join("\n")));
    }

    info!(
        "DAG validated: {} layers, {} nodes",
        dag.len(),
        dag.node_count()
    );
    Ok(())
}

/// Returns warnings for a DAG that is valid but probably not what was meant.
pub fn quick_validate(dag: &Dag) -> Vec<String> {
    let mut warnings = Vec::new();

    if dag.is_empty() {
        warnings.push("DAG has no layers".to_string());
        return warnings;
    }

    for layer in dag.layers() {
        let Some(descriptor) = dag.descriptor(layer.descriptor()) else {
            continue;
        };
        let submit_text = descriptor.render();

        let mut keys: Vec<&str> = layer.vars().iter().flat_map(|v| v.keys()).collect();
        keys.sort_unstable();
        keys.dedup();

        for key in keys {
            if !submit_text.contains(&format!("$({})", key)) {
                warnings.push(format!(
                    "Layer '{}': VARS key '{}' is not used by job descriptor '{}'",
                    layer.name(),
                    key,
                    descriptor.name()
                ));
            }
        }

        for param in descriptor.params() {
            if !layer.vars().is_empty() && layer.vars().iter().any(|v| v.get(param).is_none()) {
                warnings.push(format!(
                    "Layer '{}': parameter '{}' is missing from some parameter sets",
                    layer.name(),
                    param
                ));
            }
        }
    }

    let used: HashSet<&str> = dag.layers().iter().map(Layer::descriptor).collect();
    for descriptor in dag.descriptors() {
        if !used.contains(descriptor.name()) {
            warnings.push(format!(
                "Job descriptor '{}' is not used by any layer",
                descriptor.name()
            ));
        }
    }

    for w in &warnings {
        warn!("{}", w);
    }

    warnings
}
