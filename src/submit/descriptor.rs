//! Job Descriptors
//!
//! A [`JobDescriptor`] pairs an executable with its submit options. The
//! [`JobDescriptorBuilder`] creates descriptors from merged options and keeps
//! the per-session registry, keyed by descriptor name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use super::options::SubmitOptions;
use crate::error::{DagError, Result};
use crate::script::FunctionScript;

/// Named, reusable description of one kind of job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    name: String,
    executable: PathBuf,
    options: SubmitOptions,
    params: Vec<String>,
}

impl JobDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executable path, relative to the job's working directory.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn options(&self) -> &SubmitOptions {
        &self.options
    }

    /// Parameters declared by the originating function, if any.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// File name of this descriptor's submit description.
    pub fn submit_file_name(&self) -> String {
        format!("{}.sub", self.name)
    }

    /// Full submit description text.
    pub fn render(&self) -> String {
        self.options
            .render(&self.executable.to_string_lossy())
    }
}

/// What a descriptor executes.
#[derive(Debug, Clone, Copy)]
pub enum JobSource<'a> {
    /// A generated script and the path it was written to.
    Script {
        script: &'a FunctionScript,
        path: &'a Path,
    },
    /// A pre-existing executable, relative to the job's working directory.
    Executable { name: &'a str, path: &'a Path },
}

/// Descriptor names double as file stems, so keep them filesystem-safe.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Builds job descriptors and owns the name → descriptor registry.
#[derive(Debug, Clone, Default)]
pub struct JobDescriptorBuilder {
    defaults: SubmitOptions,
    registry: Vec<Arc<JobDescriptor>>,
}

impl JobDescriptorBuilder {
    /// Creates a builder whose descriptors start from `defaults`.
    pub fn new(defaults: SubmitOptions) -> Self {
        Self {
            defaults,
            registry: Vec::new(),
        }
    }

    pub fn defaults(&self) -> &SubmitOptions {
        &self.defaults
    }

    /// Builds a descriptor and registers it under its name.
    ///
    /// `options` override the builder defaults key by key. When still unset,
    /// `arguments` is derived from the declared parameters (`$(p1) $(p2)`)
    /// and `log`/`output`/`error` from the descriptor name. Registering a
    /// name that already exists replaces the earlier descriptor.
    pub fn build(&mut self, source: JobSource<'_>, options: &SubmitOptions) -> Result<Arc<JobDescriptor>> {
        let (name, executable, params) = match source {
            JobSource::Script { script, path } => {
                let file_name = path.file_name().ok_or_else(|| {
                    DagError::not_callable(script.name(), "script path has no file name")
                })?;
                (
                    script.name().to_string(),
                    PathBuf::from(file_name),
                    script.params().to_vec(),
                )
            }
            JobSource::Executable { name, path } => {
                if path.is_absolute() {
                    return Err(DagError::AbsoluteExecutable(path.to_path_buf()));
                }
                if path.as_os_str().is_empty() {
                    return Err(DagError::not_callable(name, "executable path is empty"));
                }
                (name.trim().to_string(), path.to_path_buf(), Vec::new())
            }
        };

        if !is_valid_name(&name) {
            return Err(DagError::not_callable(
                name,
                "descriptor names may only contain letters, digits, '_', '-' and '.'",
            ));
        }

        let mut merged = self.defaults.merge(options);

        if merged.get("arguments").is_none() && !params.is_empty() {
            let template: Vec<String> = params.iter().map(|p| format!("$({})", p)).collect();
            merged.arguments = Some(template.join(" "));
        }
        if merged.get("log").is_none() {
            merged.log = Some(format!("{}.log", name));
        }
        if merged.get("output").is_none() {
            merged.output = Some(format!("{}_$(Cluster)_$(Process).out", name));
        }
        if merged.get("error").is_none() {
            merged.error = Some(format!("{}_$(Cluster)_$(Process).err", name));
        }

        let descriptor = Arc::new(JobDescriptor {
            name,
            executable,
            options: merged,
            params,
        });

        debug!(
            "Built job descriptor '{}' -> {}",
            descriptor.name,
            descriptor.executable.display()
        );

        self.register(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Registers `descriptor`, returning the one it replaced, if any.
    pub fn register(&mut self, descriptor: Arc<JobDescriptor>) -> Option<Arc<JobDescriptor>> {
        match self
            .registry
            .iter_mut()
            .find(|d| d.name == descriptor.name)
        {
            Some(slot) => {
                if !Arc::ptr_eq(slot, &descriptor) {
                    info!("Replacing job descriptor '{}'", descriptor.name);
                }
                Some(std::mem::replace(slot, descriptor))
            }
            None => {
                self.registry.push(descriptor);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<JobDescriptor>> {
        self.registry.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in first-registration order.
    pub fn names(&self) -> Vec<&str> {
        self.registry.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<JobDescriptor>> {
        self.registry.iter()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<Arc<JobDescriptor>> {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::options::BASE_SUBMIT_OPTIONS;

    fn script(name: &str) -> FunctionScript {
        FunctionScript::from_lines(name, ["print('hi')"])
    }

    #[test]
    fn test_build_from_script_uses_relative_file_name() {
        let mut builder = JobDescriptorBuilder::new(SubmitOptions::new());
        let s = script("step1");
        let path = Path::new("/tmp/dag/step1.py");

        let desc = builder
            .build(JobSource::Script { script: &s, path }, &SubmitOptions::new())
            .unwrap();

        assert_eq!(desc.name(), "step1");
        assert_eq!(desc.executable(), Path::new("step1.py"));
        assert!(builder.contains("step1"));
        assert!(desc.render().starts_with("executable = step1.py\n"));
    }

    #[test]
    fn test_build_merges_defaults() {
        let mut builder = JobDescriptorBuilder::new(BASE_SUBMIT_OPTIONS.clone());
        let s = script("heavy");

        let desc = builder
            .build(
                JobSource::Script {
                    script: &s,
                    path: Path::new("heavy.py"),
                },
                &SubmitOptions::new().set("request_memory", "50G"),
            )
            .unwrap();

        assert_eq!(desc.options().request_memory.as_deref(), Some("50G"));
        assert_eq!(desc.options().request_cpus, Some(1));
    }

    #[test]
    fn test_build_derives_arguments_from_params() {
        let mut builder = JobDescriptorBuilder::default();
        let s = script("add").with_params(vec!["a".to_string(), "b".to_string()]);

        let desc = builder
            .build(
                JobSource::Script {
                    script: &s,
                    path: Path::new("add.py"),
                },
                &SubmitOptions::new(),
            )
            .unwrap();

        assert_eq!(desc.options().arguments.as_deref(), Some("$(a) $(b)"));
        assert_eq!(desc.params(), ["a", "b"]);
    }

    #[test]
    fn test_explicit_arguments_are_kept() {
        let mut builder = JobDescriptorBuilder::default();
        let s = script("add").with_params(vec!["a".to_string()]);

        let desc = builder
            .build(
                JobSource::Script {
                    script: &s,
                    path: Path::new("add.py"),
                },
                &SubmitOptions::new().set("arguments", "--value $(a)"),
            )
            .unwrap();

        assert_eq!(desc.options().arguments.as_deref(), Some("--value $(a)"));
    }

    #[test]
    fn test_build_fills_log_paths() {
        let mut builder = JobDescriptorBuilder::default();
        let desc = builder
            .build(
                JobSource::Executable {
                    name: "split-ms",
                    path: Path::new("bin/split_ms"),
                },
                &SubmitOptions::new(),
            )
            .unwrap();

        assert_eq!(desc.options().log.as_deref(), Some("split-ms.log"));
        assert_eq!(
            desc.options().output.as_deref(),
            Some("split-ms_$(Cluster)_$(Process).out")
        );
        assert_eq!(desc.submit_file_name(), "split-ms.sub");
    }

    #[test]
    fn test_build_rejects_absolute_executable() {
        let mut builder = JobDescriptorBuilder::default();
        let result = builder.build(
            JobSource::Executable {
                name: "tool",
                path: Path::new("/usr/bin/tool"),
            },
            &SubmitOptions::new(),
        );

        assert!(matches!(result, Err(DagError::AbsoluteExecutable(_))));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_build_rejects_bad_name() {
        let mut builder = JobDescriptorBuilder::default();
        let result = builder.build(
            JobSource::Executable {
                name: "",
                path: Path::new("tool"),
            },
            &SubmitOptions::new(),
        );

        assert!(matches!(result, Err(DagError::NotCallable { .. })));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut builder = JobDescriptorBuilder::default();
        let s = script("step");

        let first = builder
            .build(
                JobSource::Script {
                    script: &s,
                    path: Path::new("step.py"),
                },
                &SubmitOptions::new().set("request_cpus", 1),
            )
            .unwrap();
        let second = builder
            .build(
                JobSource::Script {
                    script: &s,
                    path: Path::new("step.py"),
                },
                &SubmitOptions::new().set("request_cpus", 4),
            )
            .unwrap();

        assert_eq!(builder.len(), 1);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(builder.get("step").unwrap().options().request_cpus, Some(4));
    }

    #[test]
    fn test_names_keep_first_registration_order() {
        let mut builder = JobDescriptorBuilder::default();
        for name in ["b", "a", "b"] {
            builder
                .build(
                    JobSource::Executable {
                        name,
                        path: Path::new("run.sh"),
                    },
                    &SubmitOptions::new(),
                )
                .unwrap();
        }
        assert_eq!(builder.names(), vec!["b", "a"]);
    }
}
