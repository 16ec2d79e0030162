//! Layer Decorators
//!
//! Wraps a Rust callable together with the [`FunctionDef`] describing its
//! job script. Registering the wrapper adds a layer to the builder; calling
//! it runs the callable locally, exactly as before it was wrapped.
//!
//! ```rust,no_run
//! use dagsmith::dag::{DagBuilder, DagConfig, LayerOptions};
//! use dagsmith::{job_function, vars};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dag = DagBuilder::new(DagConfig::new("out", "demo"))?;
//!
//!     let double = dag
//!         .as_layer(LayerOptions::new().with_instance(vars! { "x" => 2 }))
//!         .wrap(
//!             &job_function!(double, "def double(x):\n    print(x * 2)\n", [x]),
//!             |x: i32| x * 2,
//!         )?;
//!
//!     assert_eq!(double.call(21), 42);
//!     assert_eq!(double.layer().name(), "double");
//!     Ok(())
//! }
//! ```

use std::ops::Deref;

use super::builder::DagBuilder;
use super::model::{Layer, LayerOptions};
use crate::error::Result;
use crate::script::FunctionDef;
use crate::submit::SubmitOptions;

/// Handle to a layer registered through a decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    name: String,
    index: usize,
}

impl LayerRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the layer in insertion order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Finds the referenced layer in a builder's or a frozen DAG's layers.
    pub fn resolve<'a>(&self, layers: &'a [Layer]) -> Option<&'a Layer> {
        layers
            .get(self.index)
            .filter(|l| l.name() == self.name)
    }
}

/// A callable that has been registered as a layer.
#[derive(Debug, Clone)]
pub struct LayerFn<F> {
    func: F,
    layer: LayerRef,
}

impl<F> LayerFn<F> {
    pub fn layer(&self) -> &LayerRef {
        &self.layer
    }

    pub fn func(&self) -> &F {
        &self.func
    }

    /// Calls the wrapped function with a single (possibly tuple) argument.
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        (self.func)(args)
    }

    pub fn into_inner(self) -> F {
        self.func
    }
}

impl<F> Deref for LayerFn<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.func
    }
}

/// Pending layer registration returned by [`DagBuilder::as_layer`].
#[derive(Debug)]
pub struct LayerDecorator<'a> {
    builder: &'a mut DagBuilder,
    options: LayerOptions,
    submit: SubmitOptions,
    script_name: Option<String>,
}

impl<'a> LayerDecorator<'a> {
    /// Submit options for the layer's job descriptor.
    pub fn submit_options(mut self, submit: SubmitOptions) -> Self {
        self.submit = submit;
        self
    }

    /// Script file name, relative to the DAG directory.
    pub fn script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = Some(name.into());
        self
    }

    /// Registers `def` as a layer and returns `func` wrapped.
    ///
    /// The layer name defaults to the function name.
    pub fn wrap<F>(self, def: &FunctionDef, func: F) -> Result<LayerFn<F>> {
        let mut options = self.options;
        if options.name.is_none() {
            options.name = Some(def.name().to_string());
        }

        let name = self
            .builder
            .function_to_layer(def, self.script_name.as_deref(), &self.submit, options)?
            .name()
            .to_string();

        Ok(LayerFn {
            func,
            layer: LayerRef {
                name,
                index: self.builder.len() - 1,
            },
        })
    }
}

impl DagBuilder {
    /// Starts a decorator-style layer registration.
    pub fn as_layer(&mut self, options: LayerOptions) -> LayerDecorator<'_> {
        LayerDecorator {
            builder: self,
            options,
            submit: SubmitOptions::new(),
            script_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagConfig;
    use crate::error::DagError;
    use crate::vars;
    use tempfile::tempdir;

    fn square_def() -> FunctionDef {
        FunctionDef::new("square", "def square(x):\n    print(x * x)\n").with_params(["x"])
    }

    #[test]
    fn test_wrapped_function_still_callable() {
        let temp_dir = tempdir().unwrap();
        let mut dag = DagBuilder::new(DagConfig::new(temp_dir.path(), "t")).unwrap();

        let square = dag
            .as_layer(LayerOptions::new())
            .wrap(&square_def(), |x: i64| x * x)
            .unwrap();

        assert_eq!(square.call(7), 49);
        assert_eq!((*square)(3), 9);
        assert_eq!(square.into_inner()(4), 16);
    }

    #[test]
    fn test_layer_defaults_to_function_name() {
        let temp_dir = tempdir().unwrap();
        let mut dag = DagBuilder::new(DagConfig::new(temp_dir.path(), "t")).unwrap();

        let square = dag
            .as_layer(LayerOptions::new().with_instance(vars! {"x" => 3}))
            .wrap(&square_def(), |x: i64| x * x)
            .unwrap();

        assert_eq!(square.layer().name(), "square");
        assert_eq!(square.layer().index(), 0);
        assert!(temp_dir.path().join("square.py").exists());

        let layer = square.layer().resolve(dag.layers()).unwrap();
        assert_eq!(layer.descriptor(), "square");
    }

    #[test]
    fn test_decorator_with_parent_and_submit() {
        let temp_dir = tempdir().unwrap();
        let mut dag = DagBuilder::new(DagConfig::new(temp_dir.path(), "t")).unwrap();

        dag.as_layer(LayerOptions::new().named("first"))
            .wrap(&square_def(), |x: i64| x)
            .unwrap();

        let add = dag
            .as_layer(LayerOptions::new().child_of("first"))
            .submit_options(SubmitOptions::new().set("request_memory", "8G"))
            .wrap(
                &FunctionDef::new("add", "def add(a, b):\n    print(a + b)\n").with_params(["a", "b"]),
                |(a, b): (i32, i32)| a + b,
            )
            .unwrap();

        assert_eq!(add.call((2, 3)), 5);
        assert_eq!(dag.layer("add").unwrap().parent(), Some("first"));
        assert_eq!(
            dag.descriptor("add").unwrap().options().request_memory.as_deref(),
            Some("8G")
        );
    }

    #[test]
    fn test_decorator_unknown_parent() {
        let temp_dir = tempdir().unwrap();
        let mut dag = DagBuilder::new(DagConfig::new(temp_dir.path(), "t")).unwrap();

        let result = dag
            .as_layer(LayerOptions::new().child_of("missing"))
            .wrap(&square_def(), |x: i64| x);

        assert!(matches!(result, Err(DagError::UnknownParent(_))));
        assert!(dag.is_empty());
    }
}
