//! Layer Graph Builder
//!
//! [`DagBuilder`] owns one construction session: the ordered layers, the
//! job descriptor registry and the output directory. Layers can only name
//! parents that already exist, so the graph never contains back-edges.
//! [`DagBuilder::finalize`] freezes the session into a [`Dag`] for writing.
//!
//! # Example
//!
//! ```rust,no_run
//! use dagsmith::dag::{DagBuilder, DagConfig, LayerOptions};
//! use dagsmith::submit::SubmitOptions;
//! use dagsmith::{job_function, vars};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dag = DagBuilder::new(DagConfig::new("out", "pipeline"))?;
//!
//!     let split = job_function!(split, "def split(chunk):\n    print(chunk)\n", [chunk]);
//!     dag.function_to_layer(
//!         &split,
//!         None,
//!         &SubmitOptions::new().set("request_memory", "4G"),
//!         LayerOptions::new()
//!             .named("split")
//!             .with_instance(vars! { "chunk" => 0 })
//!             .with_instance(vars! { "chunk" => 1 }),
//!     )?;
//!
//!     dag.write_dag()?;
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use super::model::{Layer, LayerOptions, NodeScript};
use super::writer;
use crate::error::{DagError, Result};
use crate::script::{serialize, write_executable, FunctionDef, FunctionScript, DEFAULT_INTERPRETER, DEFAULT_SHELL};
use crate::submit::{JobDescriptor, JobDescriptorBuilder, JobSource, SubmitOptions, BASE_SUBMIT_OPTIONS};

/// Default extension for generated job scripts.
pub const DEFAULT_SCRIPT_EXTENSION: &str = "py";

/// Settings for one construction session.
#[derive(Debug, Clone, PartialEq)]
pub struct DagConfig {
    /// Directory receiving scripts, submit files and the DAG file
    pub dag_dir: PathBuf,

    /// DAG file stem (`{dag_name}.dag`)
    pub dag_name: String,

    /// Remove existing files in `dag_dir` when the session starts
    pub overwrite_dag_dir: bool,

    /// Interpreter directive for generated job scripts
    pub interpreter: String,

    /// Extension for generated job scripts
    pub script_extension: String,

    /// Options every job descriptor starts from
    pub default_submit: SubmitOptions,
}

impl DagConfig {
    pub fn new(dag_dir: impl Into<PathBuf>, dag_name: impl Into<String>) -> Self {
        Self {
            dag_dir: dag_dir.into(),
            dag_name: dag_name.into(),
            overwrite_dag_dir: false,
            interpreter: DEFAULT_INTERPRETER.to_string(),
            script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            default_submit: BASE_SUBMIT_OPTIONS.clone(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_dag_dir = overwrite;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_script_extension(mut self, extension: impl Into<String>) -> Self {
        self.script_extension = extension.into();
        self
    }

    pub fn with_default_submit(mut self, options: SubmitOptions) -> Self {
        self.default_submit = options;
        self
    }

    /// Path of the DAG file this session writes.
    pub fn dag_file(&self) -> PathBuf {
        self.dag_dir.join(format!("{}.dag", self.dag_name))
    }
}

/// Mutable layer graph for one construction session.
///
/// Not synchronized: every mutation takes `&mut self`.
#[derive(Debug)]
pub struct DagBuilder {
    config: DagConfig,
    layers: Vec<Layer>,
    layer_count: usize,
    descriptors: JobDescriptorBuilder,
    written_scripts: Vec<PathBuf>,
}

impl DagBuilder {
    /// Starts a session, creating the DAG directory.
    ///
    /// With `overwrite_dag_dir`, plain files already in the directory are
    /// removed; subdirectories are left alone.
    pub fn new(config: DagConfig) -> Result<Self> {
        let dir = &config.dag_dir;
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| DagError::io(dir, e))?;
            debug!("Created DAG directory: {}", dir.display());
        }

        if config.overwrite_dag_dir {
            let mut removed = 0;
            for entry in fs::read_dir(dir).map_err(|e| DagError::io(dir, e))? {
                let path = entry.map_err(|e| DagError::io(dir, e))?.path();
                if path.is_file() {
                    fs::remove_file(&path).map_err(|e| DagError::io(&path, e))?;
                    removed += 1;
                }
            }
            info!("Cleared {} files from {}", removed, dir.display());
        }

        let descriptors = JobDescriptorBuilder::new(config.default_submit.clone());

        Ok(Self {
            config,
            layers: Vec::new(),
            layer_count: 1,
            descriptors,
            written_scripts: Vec::new(),
        })
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    pub fn dag_dir(&self) -> &Path {
        &self.config.dag_dir
    }

    /// Extracts a function's body; see [`serialize`].
    pub fn serialize_function(&self, def: &FunctionDef) -> Result<FunctionScript> {
        serialize(def)
    }

    fn resolve_script_path(&self, script: &FunctionScript, file_name: Option<&str>) -> PathBuf {
        match file_name.map(str::trim).filter(|s| !s.is_empty()) {
            None => self
                .config
                .dag_dir
                .join(script.default_file_name(&self.config.script_extension)),
            Some(name) if Path::new(name).is_absolute() => PathBuf::from(name),
            Some(name) => self.config.dag_dir.join(name),
        }
    }

    /// Writes `script` into the session, at most once per path.
    ///
    /// `file_name` defaults to `{name}.{script_extension}`; relative names
    /// are placed inside the DAG directory.
    pub fn write_script(&mut self, script: &mut FunctionScript, file_name: Option<&str>) -> Result<PathBuf> {
        let path = self.resolve_script_path(script, file_name);

        if self.written_scripts.contains(&path) {
            debug!(
                "Script for '{}' already written to {}",
                script.name(),
                path.display()
            );
            script.mark_serialized();
            return Ok(path);
        }

        script.write_to_disk(&path, &self.config.interpreter)?;
        self.written_scripts.push(path.clone());
        Ok(path)
    }

    /// Serializes `def`, writes its script and registers a job descriptor
    /// named after the function.
    pub fn function_to_descriptor(
        &mut self,
        def: &FunctionDef,
        script_name: Option<&str>,
        options: &SubmitOptions,
    ) -> Result<Arc<JobDescriptor>> {
        let mut script = serialize(def)?;
        let path = self.write_script(&mut script, script_name)?;

        self.descriptors.build(
            JobSource::Script {
                script: &script,
                path: &path,
            },
            options,
        )
    }

    /// Registers a job descriptor for a pre-existing executable.
    pub fn executable_to_descriptor(
        &mut self,
        name: &str,
        executable: impl AsRef<Path>,
        options: &SubmitOptions,
    ) -> Result<Arc<JobDescriptor>> {
        self.descriptors.build(
            JobSource::Executable {
                name,
                path: executable.as_ref(),
            },
            options,
        )
    }

    /// Resolves the name a new layer would get, failing if it cannot be
    /// attached.
    pub(crate) fn check_layer(&self, options: &LayerOptions) -> Result<String> {
        if let Some(parent) = options.parent.as_deref() {
            if !self.contains_layer(parent) {
                return Err(DagError::UnknownParent(parent.to_string()));
            }
        }

        let name = match options.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("layer_{}", self.layer_count),
        };

        if self.contains_layer(&name) {
            return Err(DagError::DuplicateLayer(name));
        }

        Ok(name)
    }

    /// Adds a layer running `descriptor` once per parameter set.
    ///
    /// Unnamed layers are called `layer_N`, where N counts every layer
    /// created so far. A parent, if given, must already be in the graph.
    /// On error the graph is left untouched.
    pub fn add_layer(&mut self, descriptor: &Arc<JobDescriptor>, options: LayerOptions) -> Result<&Layer> {
        let name = self.check_layer(&options)?;

        self.descriptors.register(Arc::clone(descriptor));
        self.layer_count += 1;

        let layer = Layer {
            name,
            descriptor: descriptor.name().to_string(),
            vars: options.vars,
            parent: options.parent,
            retries: options.retries,
            priority: options.priority,
            pre: options.pre,
            post: options.post,
        };

        match layer.parent.as_deref() {
            Some(parent) => info!(
                "Added layer '{}' ({} jobs of '{}') as child of '{}'",
                layer.name,
                layer.instance_count(),
                layer.descriptor,
                parent
            ),
            None => info!(
                "Added layer '{}' ({} jobs of '{}')",
                layer.name,
                layer.instance_count(),
                layer.descriptor
            ),
        }

        self.layers.push(layer);
        Ok(&self.layers[self.layers.len() - 1])
    }

    /// Adds a layer running an already registered descriptor.
    pub fn add_layer_for(&mut self, descriptor: &str, options: LayerOptions) -> Result<&Layer> {
        let descriptor = self
            .descriptors
            .get(descriptor)
            .cloned()
            .ok_or_else(|| DagError::UnknownDescriptor(descriptor.to_string()))?;
        self.add_layer(&descriptor, options)
    }

    /// Function to layer in one call: serialize, write, describe, attach.
    ///
    /// The layer is checked first, so a missing parent fails before any
    /// script is written.
    pub fn function_to_layer(
        &mut self,
        def: &FunctionDef,
        script_name: Option<&str>,
        submit: &SubmitOptions,
        layer: LayerOptions,
    ) -> Result<&Layer> {
        def.ensure_callable()?;
        self.check_layer(&layer)?;

        let descriptor = self.function_to_descriptor(def, script_name, submit)?;
        self.add_layer(&descriptor, layer)
    }

    /// Writes a PRE/POST helper script into the DAG directory.
    ///
    /// `shebang` defaults to [`DEFAULT_SHELL`].
    pub fn write_node_script(&mut self, file_name: &str, body: &str, shebang: Option<&str>) -> Result<NodeScript> {
        let path = self.config.dag_dir.join(file_name);
        write_executable(&path, shebang.unwrap_or(DEFAULT_SHELL), body)?;
        info!("Wrote node script {}", path.display());
        if !self.written_scripts.contains(&path) {
            self.written_scripts.push(path);
        }
        Ok(NodeScript::new(file_name))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn contains_layer(&self, name: &str) -> bool {
        self.layer(name).is_some()
    }

    /// Layer names in the order they were added.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// The descriptor registry.
    pub fn descriptors(&self) -> &JobDescriptorBuilder {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<JobDescriptor>> {
        self.descriptors.get(name)
    }

    /// Counter used for default names; one more than the layers created.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Ends the session and freezes the graph.
    pub fn finalize(self) -> Dag {
        debug!(
            "Finalizing DAG '{}' with {} layers",
            self.config.dag_name,
            self.layers.len()
        );
        Dag {
            name: self.config.dag_name,
            dir: self.config.dag_dir,
            layers: self.layers,
            descriptors: self.descriptors.into_descriptors(),
            scripts: self.written_scripts,
        }
    }

    /// Finalizes and writes `{dag_name}.dag` into the DAG directory.
    pub fn write_dag(self) -> Result<PathBuf> {
        self.finalize().write()
    }
}

/// A finalized, read-only layer graph.
#[derive(Debug, Clone)]
pub struct Dag {
    name: String,
    dir: PathBuf,
    layers: Vec<Layer>,
    descriptors: Vec<Arc<JobDescriptor>>,
    scripts: Vec<PathBuf>,
}

impl Dag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    /// Every registered descriptor, in registration order.
    pub fn descriptors(&self) -> &[Arc<JobDescriptor>] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<JobDescriptor>> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    /// Job and node scripts written during the session, in write order.
    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    /// Total scheduler jobs across all layers.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Layer::instance_count).sum()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Writes the DAG into its own directory as `{name}.dag`.
    pub fn write(&self) -> Result<PathBuf> {
        writer::write_dag(self, &self.dir, &format!("{}.dag", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars;
    use tempfile::tempdir;

    const STEP1: &str = "def step1(x):\n    print(x)\n";
    const STEP2: &str = "def step2(y):\n    print(y * 2)\n";

    fn builder(dir: &Path) -> DagBuilder {
        DagBuilder::new(DagConfig::new(dir, "test")).unwrap()
    }

    fn descriptor(dag: &mut DagBuilder, name: &str) -> Arc<JobDescriptor> {
        dag.executable_to_descriptor(name, format!("{}.sh", name), &SubmitOptions::new())
            .unwrap()
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("nested/dag");

        let dag = builder(&dir);
        assert!(dir.is_dir());
        assert_eq!(dag.layer_count(), 1);
        assert!(dag.is_empty());
    }

    #[test]
    fn test_overwrite_clears_files_only() {
        let temp_dir = tempdir().unwrap();
        fs::write(temp_dir.path().join("old.dag"), "stale").unwrap();
        fs::create_dir(temp_dir.path().join("keep")).unwrap();

        DagBuilder::new(DagConfig::new(temp_dir.path(), "test").with_overwrite(true)).unwrap();

        assert!(!temp_dir.path().join("old.dag").exists());
        assert!(temp_dir.path().join("keep").is_dir());
    }

    #[test]
    fn test_add_layer_records_order() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        for name in ["a", "b", "c"] {
            dag.add_layer(&job, LayerOptions::new().named(name)).unwrap();
        }

        assert_eq!(dag.layer_names(), vec!["a", "b", "c"]);
        assert_eq!(dag.len(), 3);
    }

    #[test]
    fn test_default_layer_names() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        for _ in 0..4 {
            dag.add_layer(&job, LayerOptions::new()).unwrap();
        }

        assert_eq!(dag.layer_names(), vec!["layer_1", "layer_2", "layer_3", "layer_4"]);
    }

    #[test]
    fn test_counter_advances_for_named_layers() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        dag.add_layer(&job, LayerOptions::new().named("first")).unwrap();
        let layer = dag.add_layer(&job, LayerOptions::new()).unwrap();

        assert_eq!(layer.name(), "layer_2");
        assert_eq!(dag.layer_count(), 3);
    }

    #[test]
    fn test_unknown_parent_leaves_graph_unchanged() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");
        dag.add_layer(&job, LayerOptions::new().named("root")).unwrap();

        let result = dag.add_layer(&job, LayerOptions::new().named("child").child_of("ghost"));

        match result {
            Err(DagError::UnknownParent(name)) => assert_eq!(name, "ghost"),
            other => panic!("expected UnknownParent, got {:?}", other),
        }
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.layer_count(), 2);
    }

    #[test]
    fn test_self_parent_is_unknown_parent() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        let result = dag.add_layer(&job, LayerOptions::new().named("loop").child_of("loop"));

        assert!(matches!(result, Err(DagError::UnknownParent(_))));
        assert!(dag.is_empty());
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        dag.add_layer(&job, LayerOptions::new().named("same")).unwrap();
        let result = dag.add_layer(&job, LayerOptions::new().named("same"));

        assert!(matches!(result, Err(DagError::DuplicateLayer(_))));
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.layer_count(), 2);
    }

    #[test]
    fn test_parent_link_recorded() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");

        dag.add_layer(&job, LayerOptions::new().named("parent_layer")).unwrap();
        let child = dag
            .add_layer(
                &job,
                LayerOptions::new()
                    .named("child_layer")
                    .child_of("parent_layer")
                    .with_instance(vars! {"arg" => "child"}),
            )
            .unwrap();

        assert_eq!(child.parent(), Some("parent_layer"));
        assert_eq!(child.vars().len(), 1);
    }

    #[test]
    fn test_add_layer_for_registered_descriptor() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        descriptor(&mut dag, "job");

        let layer = dag.add_layer_for("job", LayerOptions::new()).unwrap();
        assert_eq!(layer.descriptor(), "job");

        let result = dag.add_layer_for("missing", LayerOptions::new());
        assert!(matches!(result, Err(DagError::UnknownDescriptor(_))));
        assert_eq!(dag.len(), 1);
    }

    #[test]
    fn test_function_to_descriptor_writes_script() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        let def = FunctionDef::new("test_function", "def test_function(x):\n    return x\n");
        let desc = dag
            .function_to_descriptor(&def, None, &SubmitOptions::new())
            .unwrap();

        let script_path = temp_dir.path().join("test_function.py");
        assert!(script_path.exists());
        assert_eq!(desc.executable(), Path::new("test_function.py"));
        assert!(dag.descriptor("test_function").is_some());

        let content = fs::read_to_string(script_path).unwrap();
        assert_eq!(content, "#!/usr/bin/env python3\nreturn x\n");
    }

    #[test]
    fn test_function_to_descriptor_custom_script_name() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        let def = FunctionDef::new("f", "def f():\n    pass\n");
        let desc = dag
            .function_to_descriptor(&def, Some("scripts/run_f.py"), &SubmitOptions::new())
            .unwrap();

        assert!(temp_dir.path().join("scripts/run_f.py").exists());
        assert_eq!(desc.executable(), Path::new("run_f.py"));
    }

    #[test]
    fn test_not_callable_has_no_side_effects() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        let def = FunctionDef::new("broken", "def broken():");
        let result = dag.function_to_layer(
            &def,
            None,
            &SubmitOptions::new(),
            LayerOptions::new().named("never"),
        );

        assert!(matches!(result, Err(DagError::NotCallable { .. })));
        assert!(dag.is_empty());
        assert!(dag.descriptors().is_empty());
        assert!(!temp_dir.path().join("broken.py").exists());
    }

    #[test]
    fn test_function_to_layer_missing_parent_writes_nothing() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        let def = FunctionDef::new("step1", STEP1);
        let result = dag.function_to_layer(
            &def,
            None,
            &SubmitOptions::new(),
            LayerOptions::new().child_of("nonexistent_layer"),
        );

        let err = result.unwrap_err();
        assert!(err.to_string().contains("does not exist in the DAG"));
        assert!(!temp_dir.path().join("step1.py").exists());
        assert!(dag.descriptors().is_empty());
    }

    #[test]
    fn test_function_to_layer_chain() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        dag.function_to_layer(
            &FunctionDef::new("step1", STEP1).with_params(["x"]),
            None,
            &SubmitOptions::new(),
            LayerOptions::new()
                .named("L1")
                .with_vars(vec![vars! {"x" => 1}, vars! {"x" => 2}]),
        )
        .unwrap();
        dag.function_to_layer(
            &FunctionDef::new("step2", STEP2).with_params(["y"]),
            None,
            &SubmitOptions::new(),
            LayerOptions::new()
                .named("L2")
                .child_of("L1")
                .with_instance(vars! {"y" => "z"}),
        )
        .unwrap();

        assert_eq!(dag.layer_names(), vec!["L1", "L2"]);
        assert_eq!(dag.descriptors().names(), vec!["step1", "step2"]);
        assert_eq!(dag.layer("L2").unwrap().descriptor(), "step2");
    }

    #[test]
    fn test_script_written_once_per_path() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let def = FunctionDef::new("step1", STEP1);

        dag.function_to_descriptor(&def, None, &SubmitOptions::new())
            .unwrap();
        let path = temp_dir.path().join("step1.py");
        fs::write(&path, "edited").unwrap();

        dag.function_to_descriptor(&def, None, &SubmitOptions::new())
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "edited");
    }

    #[test]
    fn test_reused_script_reports_serialized() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let def = FunctionDef::new("step1", STEP1);

        let mut first = serialize(&def).unwrap();
        dag.write_script(&mut first, None).unwrap();
        assert!(first.is_serialized_to_disk());

        let mut second = serialize(&def).unwrap();
        assert!(!second.is_serialized_to_disk());
        let path = dag.write_script(&mut second, None).unwrap();

        assert!(second.is_serialized_to_disk());
        assert_eq!(path, temp_dir.path().join("step1.py"));
    }

    #[test]
    fn test_finalize_lists_written_scripts() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let def = FunctionDef::new("step1", STEP1);

        dag.function_to_descriptor(&def, None, &SubmitOptions::new())
            .unwrap();
        dag.function_to_descriptor(&def, None, &SubmitOptions::new())
            .unwrap();
        dag.write_node_script("PRE.script", "echo pre", None).unwrap();

        let frozen = dag.finalize();
        assert_eq!(
            frozen.scripts(),
            &[temp_dir.path().join("step1.py"), temp_dir.path().join("PRE.script")]
        );
    }

    #[test]
    fn test_write_node_script() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());

        let script = dag
            .write_node_script("PRE.script", "split_ms.py obs.ms 4", None)
            .unwrap();

        assert_eq!(script.executable, "PRE.script");
        let content = fs::read_to_string(temp_dir.path().join("PRE.script")).unwrap();
        assert!(content.starts_with("#!/bin/bash\n"));
    }

    #[test]
    fn test_finalize_freezes_graph() {
        let temp_dir = tempdir().unwrap();
        let mut dag = builder(temp_dir.path());
        let job = descriptor(&mut dag, "job");
        dag.add_layer(&job, LayerOptions::new().with_vars(vec![vars! {"i" => 0}, vars! {"i" => 1}]))
            .unwrap();
        dag.add_layer(&job, LayerOptions::new().child_of("layer_1")).unwrap();

        let frozen = dag.finalize();

        assert_eq!(frozen.name(), "test");
        assert_eq!(frozen.layer_names(), vec!["layer_1", "layer_2"]);
        assert_eq!(frozen.node_count(), 3);
        assert_eq!(frozen.descriptors().len(), 1);
    }

    #[test]
    fn test_dag_file_path() {
        let config = DagConfig::new("/data/dags", "full_test");
        assert_eq!(config.dag_file(), PathBuf::from("/data/dags/full_test.dag"));
    }
}
