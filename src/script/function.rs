//! Function Serialization
//!
//! Turns a statically supplied function definition into a standalone script
//! containing only the function body.
//!
//! # Example
//!
//! ```
//! use dagsmith::script::{serialize, FunctionDef};
//!
//! let def = FunctionDef::new(
//!     "greet",
//!     "def greet(name):\n    print(f\"hello {name}\")\n",
//! )
//! .with_params(["name"]);
//!
//! let script = serialize(&def).unwrap();
//! assert_eq!(script.name(), "greet");
//! assert_eq!(script.lines(), ["print(f\"hello {name}\")"]);
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::shell::write_executable;
use crate::error::{DagError, Result};

/// Interpreter directive written at the top of generated job scripts.
pub const DEFAULT_INTERPRETER: &str = "/usr/bin/env python3";

/// Builds a [`FunctionDef`] from an identifier and a source expression.
///
/// ```
/// use dagsmith::job_function;
///
/// let def = job_function!(square, "def square(x):\n    print(x * x)\n", [x]);
/// assert_eq!(def.name(), "square");
/// assert_eq!(def.params(), ["x"]);
/// ```
#[macro_export]
macro_rules! job_function {
    ($name:ident, $source:expr) => {
        $crate::script::FunctionDef::new(stringify!($name), $source)
    };
    ($name:ident, $source:expr, [$($param:ident),* $(,)?]) => {
        $crate::script::FunctionDef::new(stringify!($name), $source)
            .with_params([$(stringify!($param)),*])
    };
}

/// Description of a callable: its name, full definition text and declared
/// parameters.
///
/// The source is the definition line followed by the indented body. Leading
/// blank lines and annotation lines (`@decorator`, `#[attr]`) are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionDef {
    name: String,
    source: String,
    #[serde(default)]
    params: Vec<String>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            source: source.into(),
            params: Vec::new(),
        }
    }

    /// Declares the parameter names the function takes.
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns an error unless this definition can be turned into a script.
    pub fn ensure_callable(&self) -> Result<()> {
        if !is_identifier(&self.name) {
            return Err(DagError::not_callable(
                &self.name,
                "name is not a valid identifier",
            ));
        }

        if let Some(bad) = self.params.iter().find(|p| !is_identifier(p)) {
            return Err(DagError::not_callable(
                &self.name,
                format!("parameter '{}' is not a valid identifier", bad),
            ));
        }

        let mut lines = code_lines(&self.source);
        if lines.next().is_none() {
            return Err(DagError::not_callable(&self.name, "source is empty"));
        }
        if !lines.any(|line| !line.trim().is_empty()) {
            return Err(DagError::not_callable(&self.name, "definition has no body"));
        }

        Ok(())
    }
}

/// Checks for `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Source lines starting at the definition line.
fn code_lines(source: &str) -> impl Iterator<Item = &str> {
    source.lines().skip_while(|line| {
        let trimmed = line.trim_start();
        trimmed.is_empty() || trimmed.starts_with('@') || trimmed.starts_with("#[")
    })
}

/// Drops exactly `count` leading characters; shorter lines become empty.
fn strip_indent(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((idx, _)) => &line[idx..],
        None => "",
    }
}

/// The body of a function, ready to be written as a standalone script.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScript {
    name: String,
    body: Vec<String>,
    params: Vec<String>,
    serialized_to_disk: bool,
}

impl FunctionScript {
    /// Rebuilds a script from (possibly post-processed) body lines.
    pub fn from_lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            body: lines.into_iter().map(Into::into).collect(),
            params: Vec::new(),
            serialized_to_disk: false,
        }
    }

    /// Sets the declared parameters carried along with the body.
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Body lines with the common indentation removed.
    pub fn lines(&self) -> &[String] {
        &self.body
    }

    pub fn into_lines(self) -> Vec<String> {
        self.body
    }

    /// Body joined with newlines.
    pub fn text(&self) -> String {
        self.body.join("\n")
    }

    pub fn is_serialized_to_disk(&self) -> bool {
        self.serialized_to_disk
    }

    /// Records that the script already exists on disk from an earlier write.
    pub(crate) fn mark_serialized(&mut self) {
        self.serialized_to_disk = true;
    }

    /// Default file name: `{name}.{extension}`.
    pub fn default_file_name(&self, extension: &str) -> String {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, extension)
        }
    }

    /// Writes the script to `path` behind an interpreter directive and makes
    /// it executable.
    ///
    /// Overwrites any existing file; not safe against concurrent writers.
    pub fn write_to_disk(&mut self, path: impl AsRef<Path>, interpreter: &str) -> Result<PathBuf> {
        let path = path.as_ref();
        write_executable(path, interpreter, &self.text())?;
        self.serialized_to_disk = true;
        debug!("Function '{}' written to {}", self.name, path.display());
        Ok(path.to_path_buf())
    }
}

/// Extracts the body of `def` into a [`FunctionScript`].
///
/// The definition line is dropped and the indentation of the first body line
/// is removed from every line, so nested blocks keep their relative depth.
pub fn serialize(def: &FunctionDef) -> Result<FunctionScript> {
    def.ensure_callable()?;

    let body: Vec<&str> = code_lines(&def.source).skip(1).collect();

    let indent = body
        .first()
        .map(|first| first.chars().take_while(|c| c.is_whitespace()).count())
        .unwrap_or(0);

    let mut lines: Vec<String> = body
        .iter()
        .map(|line| strip_indent(line, indent).to_string())
        .collect();

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    debug!(
        "Serialized function '{}' ({} lines, indent {})",
        def.name,
        lines.len(),
        indent
    );

    Ok(FunctionScript {
        name: def.name.clone(),
        body: lines,
        params: def.params.clone(),
        serialized_to_disk: false,
    })
}
