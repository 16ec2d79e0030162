//! dagsmith - HTCondor DAG Builder
//!
//! Turns ordinary functions into HTCondor DAGMan workflows. Each function
//! body becomes a standalone job script, each script gets a submit
//! description, and layers of parameterized job instances are wired into
//! a DAG file with parent/child dependencies.
//!
//! # Architecture
//!
//! - [`script`]: function body extraction and executable script writing
//! - [`submit`]: typed submit options and job descriptors
//! - [`dag`]: the layer graph builder, validation and DAG file output
//! - [`plan`]: YAML workflow plans for the command-line tool
//! - [`error`]: the crate-wide error type
//!
//! # Example
//!
//! ```rust,no_run
//! use dagsmith::dag::{DagBuilder, DagConfig, LayerOptions};
//! use dagsmith::script::FunctionDef;
//! use dagsmith::submit::SubmitOptions;
//! use dagsmith::vars;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dag = DagBuilder::new(DagConfig::new("dag_out", "analysis").with_overwrite(true))?;
//!
//!     let step1 = FunctionDef::new("step1", "def step1(x):\n    print(x)\n").with_params(["x"]);
//!     let step2 = FunctionDef::new("step2", "def step2(y):\n    print(y)\n").with_params(["y"]);
//!
//!     dag.function_to_layer(
//!         &step1,
//!         None,
//!         &SubmitOptions::new(),
//!         LayerOptions::new().named("L1").with_vars(vec![vars! {"x" => 1}, vars! {"x" => 2}]),
//!     )?;
//!     dag.function_to_layer(
//!         &step2,
//!         None,
//!         &SubmitOptions::new().set("request_memory", "4GB"),
//!         LayerOptions::new().named("L2").child_of("L1").with_instance(vars! {"y" => "z"}),
//!     )?;
//!
//!     let path = dag.write_dag()?;
//!     println!("Wrote {}", path.display());
//!     Ok(())
//! }
//! ```

pub mod dag;
pub mod error;
pub mod plan;
pub mod script;
pub mod submit;

// Re-export commonly used types
pub use dag::{Dag, DagBuilder, DagConfig, Layer, LayerOptions};
pub use error::{DagError, Result};
pub use plan::load_plan;
pub use script::{serialize, FunctionDef};
pub use submit::{JobDescriptor, SubmitOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "dagsmith";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "dagsmith");
    }

    #[test]
    fn test_module_exports_builder() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dag = DagBuilder::new(DagConfig::new(temp_dir.path(), "t")).unwrap();
        assert!(dag.is_empty());
    }

    #[test]
    fn test_module_exports_serialize() {
        let script = serialize(&FunctionDef::new("f", "def f():\n    pass\n")).unwrap();
        assert_eq!(script.text(), "pass");
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
