//! Workflow Plan Parser
//!
//! Loads and saves YAML workflow plans. A plan describes a complete DAG:
//! where to write it, the default submit options, and an ordered list of
//! layers backed either by a function source file or by an existing
//! executable.
//!
//! ```yaml
//! name: pipeline
//! dir: dag
//! defaults:
//!   request_memory: 4G
//! layers:
//!   - name: split
//!     function: jobs/split.py
//!     vars:
//!       - { chunk: 0 }
//!       - { chunk: 1 }
//!   - name: merge
//!     parent: split
//!     executable: bin/merge.sh
//!     retries: 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::dag::{DagBuilder, DagConfig, InstanceVars, LayerOptions, NodeScript};
use crate::error::{DagError, Result};
use crate::script::function::is_identifier;
use crate::script::FunctionDef;
use crate::submit::{SubmitOptions, BASE_SUBMIT_OPTIONS};

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

/// A complete DAG description.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowPlan {
    /// DAG file stem
    pub name: String,

    /// Output directory, relative to the plan file
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Clear files in `dir` before writing
    #[serde(default)]
    pub overwrite: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_extension: Option<String>,

    /// Overrides applied on top of the base submit options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<SubmitOptions>,

    #[serde(default)]
    pub layers: Vec<LayerPlan>,
}

/// PRE/POST script entry; with a `body` the script is generated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeScriptPlan {
    #[serde(flatten)]
    pub script: NodeScript,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shebang: Option<String>,
}

/// One layer of a plan.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LayerPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Source file holding one function definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<PathBuf>,

    /// Function name; read from the definition line when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Generated script file name, relative to the DAG directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Existing executable, relative to the job's working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,

    /// Reuse the job descriptor of an earlier layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,

    /// Declared parameters; read from the signature when omitted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<SubmitOptions>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<InstanceVars>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<NodeScriptPlan>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<NodeScriptPlan>,
}

/// First non-blank, non-annotation line of a source file.
fn definition_line(source: &str) -> Option<&str> {
    source.lines().map(str::trim).find(|line| {
        !line.is_empty() && !line.starts_with('@') && !line.starts_with("#[")
    })
}

/// `def step1(x):` → `step1`
fn infer_function_name(source: &str) -> Option<String> {
    let line = definition_line(source)?;
    let head = line.split('(').next()?;
    let tokens: Vec<&str> = head.split_whitespace().collect();
    match tokens.as_slice() {
        [_keyword, .., name] if is_identifier(name) => Some(name.to_string()),
        _ => None,
    }
}

/// `def f(a, b=2, *args):` → `["a", "b"]`
fn infer_params(source: &str) -> Vec<String> {
    let Some(line) = definition_line(source) else {
        return Vec::new();
    };
    let Some((_, rest)) = line.split_once('(') else {
        return Vec::new();
    };
    let inner = rest.rsplit_once(')').map(|(args, _)| args).unwrap_or(rest);

    inner
        .split(',')
        .filter_map(|arg| {
            let name = arg.split(|c: char| c == '=' || c == ':').next()?.trim();
            (is_identifier(name) && name != "self").then(|| name.to_string())
        })
        .collect()
}

impl LayerPlan {
    fn layer_options(&self) -> LayerOptions {
        LayerOptions {
            name: self.name.clone(),
            parent: self.parent.clone(),
            vars: self.vars.clone(),
            retries: self.retries,
            priority: self.priority,
            pre: None,
            post: None,
        }
    }

    fn function_def(&self, base_dir: &Path, file: &Path) -> Result<FunctionDef> {
        let path = base_dir.join(file);
        let source = fs::read_to_string(&path).map_err(|e| DagError::io(&path, e))?;

        let name = match self.function_name.clone() {
            Some(name) => name,
            None => infer_function_name(&source).ok_or_else(|| {
                DagError::Plan(format!(
                    "Cannot find a function definition in '{}'",
                    path.display()
                ))
            })?,
        };

        let params = if self.params.is_empty() {
            infer_params(&source)
        } else {
            self.params.clone()
        };

        debug!("Loaded function '{}' from {}", name, path.display());
        Ok(FunctionDef::new(name, source).with_params(params))
    }

    fn node_script(dag: &mut DagBuilder, plan: Option<&NodeScriptPlan>) -> Result<Option<NodeScript>> {
        let Some(plan) = plan else {
            return Ok(None);
        };
        if let Some(body) = plan.body.as_deref() {
            dag.write_node_script(&plan.script.executable, body, plan.shebang.as_deref())?;
        }
        Ok(Some(plan.script.clone()))
    }

    /// Adds this layer to `dag`. Every check runs before PRE/POST scripts
    /// are written, so a rejected layer leaves nothing on disk.
    fn apply(&self, dag: &mut DagBuilder, base_dir: &Path) -> Result<()> {
        let sources = [self.function.is_some(), self.executable.is_some(), self.job.is_some()];
        if sources.iter().filter(|set| **set).count() != 1 {
            return Err(DagError::Plan(format!(
                "Layer '{}' must set exactly one of 'function', 'executable' or 'job'",
                self.name.as_deref().unwrap_or("<unnamed>")
            )));
        }

        let submit = self.submit.clone().unwrap_or_default();
        let mut options = self.layer_options();
        dag.check_layer(&options)?;

        let def = match &self.function {
            Some(file) => {
                let def = self.function_def(base_dir, file)?;
                def.ensure_callable()?;
                Some(def)
            }
            None => None,
        };
        let executable_name = match &self.executable {
            Some(executable) => Some(
                self.name
                    .clone()
                    .or_else(|| {
                        executable
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                    })
                    .ok_or_else(|| DagError::Plan("Executable layer has no name".to_string()))?,
            ),
            None => None,
        };
        if let Some(job) = &self.job {
            if !dag.descriptors().contains(job) {
                return Err(DagError::UnknownDescriptor(job.clone()));
            }
        }

        options.pre = Self::node_script(dag, self.pre.as_ref())?;
        options.post = Self::node_script(dag, self.post.as_ref())?;

        if let Some(def) = def {
            dag.function_to_layer(&def, self.script.as_deref(), &submit, options)?;
        } else if let (Some(executable), Some(name)) = (&self.executable, executable_name) {
            let descriptor = dag.executable_to_descriptor(&name, executable, &submit)?;
            dag.add_layer(&descriptor, options)?;
        } else if let Some(job) = &self.job {
            dag.add_layer_for(job, options)?;
        }

        Ok(())
    }
}

impl WorkflowPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: default_dir(),
            overwrite: false,
            interpreter: None,
            script_extension: None,
            defaults: None,
            layers: Vec::new(),
        }
    }

    /// Session settings, with `dir` resolved against `base_dir`.
    pub fn dag_config(&self, base_dir: &Path) -> DagConfig {
        let mut config = DagConfig::new(base_dir.join(&self.dir), &self.name)
            .with_overwrite(self.overwrite);

        if let Some(interpreter) = &self.interpreter {
            config = config.with_interpreter(interpreter);
        }
        if let Some(extension) = &self.script_extension {
            config = config.with_script_extension(extension);
        }
        if let Some(defaults) = &self.defaults {
            config = config.with_default_submit(BASE_SUBMIT_OPTIONS.merge(defaults));
        }

        config
    }

    /// Builds every layer in order. Relative paths in the plan resolve
    /// against `base_dir`.
    pub fn into_builder(&self, base_dir: &Path) -> Result<DagBuilder> {
        let mut dag = DagBuilder::new(self.dag_config(base_dir))?;

        for layer in &self.layers {
            layer.apply(&mut dag, base_dir)?;
        }

        info!("Built {} layers from plan '{}'", dag.len(), self.name);
        Ok(dag)
    }
}

/// Loads a workflow plan from a YAML file.
///
/// ```rust,no_run
/// use std::path::Path;
/// use dagsmith::plan::load_plan;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let plan = load_plan("pipeline.yaml")?;
///     let dag = plan.into_builder(Path::new("."))?;
///     println!("Built {} layers", dag.len());
///     Ok(())
/// }
/// ```
pub fn load_plan(path: impl AsRef<Path>) -> Result<WorkflowPlan> {
    let path = path.as_ref();
    info!("Loading plan from: {}", path.display());

    let yaml_content = fs::read_to_string(path).map_err(|e| DagError::io(path, e))?;
    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let plan: WorkflowPlan = serde_yaml::from_str(&yaml_content).map_err(|e| {
        DagError::Plan(format!(
            "Failed to parse '{}': {}. Check the file format.",
            path.display(),
            e
        ))
    })?;

    if plan.name.trim().is_empty() {
        return Err(DagError::Plan("Plan has an empty 'name'".to_string()));
    }

    info!("Parsed plan '{}' with {} layers", plan.name, plan.layers.len());
    Ok(plan)
}

/// Saves a workflow plan as YAML.
pub fn save_plan(plan: &WorkflowPlan, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(plan)
        .map_err(|e| DagError::Plan(format!("Failed to serialize plan: {}", e)))?;
    fs::write(path, yaml).map_err(|e| DagError::io(path, e))?;
    info!("Saved plan to: {}", path.display());
    Ok(())
}
