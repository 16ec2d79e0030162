//! DAG File Writer
//!
//! Renders a finalized [`Dag`] in DAGMan's input format and writes it,
//! together with one submit description per registered job descriptor.
//! When the target is not the session directory, the session's scripts
//! are copied along so every `executable` still resolves.
//!
//! Output layout, per layer and instance `i`:
//!
//! ```text
//! JOB <layer>:<i> <descriptor>.sub
//! VARS <layer>:<i> key="value" ...
//! RETRY <layer>:<i> <n>
//! PRIORITY <layer>:<i> <n>
//! SCRIPT PRE <layer>:<i> <script> <args>
//! SCRIPT POST <layer>:<i> <script> <args>
//! ```
//!
//! followed by one `PARENT ... CHILD ...` line for every layer with a parent.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info};

use super::builder::Dag;
use super::model::{InstanceVars, Layer};
use super::validator::{quick_validate, validate_dag};
use crate::error::{DagError, Result};

/// Quotes a VARS value, escaping backslashes and double quotes.
fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn vars_line(node: &str, vars: &InstanceVars) -> String {
    let pairs: Vec<String> = vars
        .iter()
        .map(|(k, v)| format!("{}={}", k, quote_value(v)))
        .collect();
    format!("VARS {} {}", node, pairs.join(" "))
}

fn render_layer(out: &mut String, layer: &Layer, submit_file: &str) {
    for i in 0..layer.instance_count() {
        let node = layer.node_name(i);
        let _ = writeln!(out, "JOB {} {}", node, submit_file);

        if let Some(vars) = layer.vars().get(i).filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{}", vars_line(&node, vars));
        }
        if let Some(retries) = layer.retries() {
            let _ = writeln!(out, "RETRY {} {}", node, retries);
        }
        if let Some(priority) = layer.priority() {
            let _ = writeln!(out, "PRIORITY {} {}", node, priority);
        }
        if let Some(pre) = layer.pre_script() {
            let _ = writeln!(out, "SCRIPT PRE {} {}", node, pre);
        }
        if let Some(post) = layer.post_script() {
            let _ = writeln!(out, "SCRIPT POST {} {}", node, post);
        }
    }
}

/// Renders the DAG file text.
///
/// Layers appear in insertion order; every node of a child layer depends
/// on every node of its parent layer.
pub fn render_dag(dag: &Dag) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# {} generated by {} {} on {}",
        dag.name(),
        crate::APP_NAME,
        crate::VERSION,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    for layer in dag.layers() {
        let _ = writeln!(out);
        let submit_file = format!("{}.sub", layer.descriptor());
        render_layer(&mut out, layer, &submit_file);
    }

    let edges: Vec<&Layer> = dag
        .layers()
        .iter()
        .filter(|l| l.parent().is_some())
        .collect();
    if !edges.is_empty() {
        let _ = writeln!(out);
    }

    for child in edges {
        let Some(parent) = child.parent().and_then(|p| dag.layer(p)) else {
            continue;
        };
        let _ = writeln!(
            out,
            "PARENT {} CHILD {}",
            parent.node_names().join(" "),
            child.node_names().join(" ")
        );
    }

    out
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| DagError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copies the session's scripts under `target_dir`, keeping their layout
/// relative to the session directory.
fn copy_scripts(dag: &Dag, target_dir: &Path) -> Result<()> {
    for source in dag.scripts() {
        let relative = match source.strip_prefix(dag.dir()) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => match source.file_name() {
                Some(name) => PathBuf::from(name),
                None => continue,
            },
        };
        let target = target_dir.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| DagError::io(parent, e))?;
        }
        fs::copy(source, &target).map_err(|e| DagError::io(source, e))?;
        debug!("Copied {} to {}", source.display(), target.display());
    }
    Ok(())
}

/// Validates `dag`, then writes every submit description and the DAG file
/// into `target_dir`. Returns the DAG file path.
///
/// Nothing is written if validation fails.
pub fn write_dag(dag: &Dag, target_dir: &Path, file_name: &str) -> Result<PathBuf> {
    validate_dag(dag)?;
    quick_validate(dag);

    if !target_dir.exists() {
        fs::create_dir_all(target_dir).map_err(|e| DagError::io(target_dir, e))?;
    }

    if !same_dir(target_dir, dag.dir()) {
        copy_scripts(dag, target_dir)?;
    }

    for descriptor in dag.descriptors() {
        let path = target_dir.join(descriptor.submit_file_name());
        write_file(&path, &descriptor.render())?;
    }

    let dag_path = target_dir.join(file_name);
    write_file(&dag_path, &render_dag(dag))?;

    info!(
        "Wrote DAG '{}' ({} layers, {} nodes, {} submit files) to {}",
        dag.name(),
        dag.len(),
        dag.node_count(),
        dag.descriptors().len(),
        dag_path.display()
    );

    Ok(dag_path)
}
