//! DAG Data Model
//!
//! Layers and their per-instance parameter sets.
//!
//! A layer expands into one DAG node per parameter set, named
//! `{layer}:{index}`. A layer without parameter sets still runs once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::submit::Attributes;

/// Builds [`InstanceVars`] from `key => value` pairs.
///
/// ```
/// use dagsmith::vars;
///
/// let v = vars! { "x" => 1, "mode" => "fast" };
/// assert_eq!(v.get("x"), Some("1"));
/// ```
#[macro_export]
macro_rules! vars {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut v = $crate::dag::InstanceVars::new();
        $( v.insert($key, $value); )*
        v
    }};
}

/// One parameter set: ordered `key -> value` substitutions for a single
/// job instance.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct InstanceVars(Attributes);

impl InstanceVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.set(key, value.to_string());
    }

    /// Builder form of [`InstanceVars::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for InstanceVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = InstanceVars::new();
        for (k, v) in iter {
            vars.insert(k, v);
        }
        vars
    }
}

/// A PRE or POST script attached to every node of a layer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeScript {
    pub executable: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl NodeScript {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for NodeScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One stage of the workflow. Created once by the builder and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) vars: Vec<InstanceVars>,
    pub(crate) parent: Option<String>,
    pub(crate) retries: Option<u32>,
    pub(crate) priority: Option<i32>,
    pub(crate) pre: Option<NodeScript>,
    pub(crate) post: Option<NodeScript>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the job descriptor this layer runs.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn vars(&self) -> &[InstanceVars] {
        &self.vars
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn retries(&self) -> Option<u32> {
        self.retries
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn pre_script(&self) -> Option<&NodeScript> {
        self.pre.as_ref()
    }

    pub fn post_script(&self) -> Option<&NodeScript> {
        self.post.as_ref()
    }

    /// Number of scheduler jobs this layer expands to.
    pub fn instance_count(&self) -> usize {
        self.vars.len().max(1)
    }

    /// DAG node name of instance `index`.
    pub fn node_name(&self, index: usize) -> String {
        format!("{}:{}", self.name, index)
    }

    /// All node names, in instance order.
    pub fn node_names(&self) -> Vec<String> {
        (0..self.instance_count()).map(|i| self.node_name(i)).collect()
    }
}

/// Optional settings for a new layer.
///
/// # Example
///
/// ```
/// use dagsmith::dag::LayerOptions;
/// use dagsmith::vars;
///
/// let opts = LayerOptions::new()
///     .named("analyze")
///     .child_of("process")
///     .with_instance(vars! { "chunk" => 0 })
///     .with_instance(vars! { "chunk" => 1 })
///     .with_retries(2);
/// assert_eq!(opts.vars.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOptions {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub vars: Vec<InstanceVars>,
    pub retries: Option<u32>,
    pub priority: Option<i32>,
    pub pre: Option<NodeScript>,
    pub post: Option<NodeScript>,
}

impl LayerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_vars(mut self, vars: Vec<InstanceVars>) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_instance(mut self, vars: InstanceVars) -> Self {
        self.vars.push(vars);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_pre_script(mut self, script: NodeScript) -> Self {
        self.pre = Some(script);
        self
    }

    pub fn with_post_script(mut self, script: NodeScript) -> Self {
        self.post = Some(script);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, vars: Vec<InstanceVars>) -> Layer {
        Layer {
            name: name.to_string(),
            descriptor: "job".to_string(),
            vars,
            parent: None,
            retries: None,
            priority: None,
            pre: None,
            post: None,
        }
    }

    #[test]
    fn test_empty_vars_is_single_instance() {
        let l = layer("solo", vec![]);
        assert_eq!(l.instance_count(), 1);
        assert_eq!(l.node_names(), vec!["solo:0"]);
    }

    #[test]
    fn test_node_names_follow_vars() {
        let l = layer("L1", vec![vars! {"x" => 1}, vars! {"x" => 2}]);
        assert_eq!(l.node_names(), vec!["L1:0", "L1:1"]);
    }

    #[test]
    fn test_vars_keep_order_and_replace() {
        let mut v = vars! {"b" => 1, "a" => 2};
        v.insert("b", 3);
        assert_eq!(v.iter().collect::<Vec<_>>(), vec![("b", "3"), ("a", "2")]);
    }

    #[test]
    fn test_vars_from_iter() {
        let v: InstanceVars = [("input", "data1.txt"), ("jobid", "7")].into_iter().collect();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get("jobid"), Some("7"));
    }

    #[test]
    fn test_vars_yaml_scalars() {
        let v: InstanceVars = serde_yaml::from_str("x: 1\nflag: true\nname: z\n").unwrap();
        assert_eq!(v.get("x"), Some("1"));
        assert_eq!(v.get("flag"), Some("true"));
        assert_eq!(v.keys().collect::<Vec<_>>(), vec!["x", "flag", "name"]);
    }

    #[test]
    fn test_node_script_display() {
        let s = NodeScript::new("PRE.script").with_args(["--ms", "obs.ms"]);
        assert_eq!(s.to_string(), "PRE.script --ms obs.ms");
    }

    #[test]
    fn test_layer_options_builder() {
        let opts = LayerOptions::new()
            .named("child")
            .child_of("parent")
            .with_priority(-1)
            .with_post_script(NodeScript::new("post.sh"));

        assert_eq!(opts.name.as_deref(), Some("child"));
        assert_eq!(opts.parent.as_deref(), Some("parent"));
        assert_eq!(opts.priority, Some(-1));
        assert!(opts.post.is_some());
        assert!(opts.vars.is_empty());
    }
}
