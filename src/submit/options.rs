//! Submit Options
//!
//! Typed resource and runtime settings for a job's submit description,
//! plus an ordered list of free-form attributes and one verbatim escape
//! hatch for directives that are not `key = value` pairs.
//!
//! # Example YAML Format
//!
//! ```yaml
//! request_cpus: 4
//! request_memory: 8G
//! should_transfer_files: YES
//! transfer_input_files: [data.tar, config.json]
//! max_retries: 2
//! extra:
//!   +WantOSPool: true
//!   +SingularityImage: "osdf:///containers/casa.sif"
//! unordered_lines: |
//!   # pass-through text
//! ```

use std::fmt;
use std::str::FromStr;

use log::warn;
use once_cell::sync::Lazy;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the verbatim passthrough text.
pub const UNORDERED_KEY: &str = "unordered_lines";

/// Settings every job starts from unless the session overrides them.
pub static BASE_SUBMIT_OPTIONS: Lazy<SubmitOptions> = Lazy::new(|| SubmitOptions {
    request_cpus: Some(1),
    request_memory: Some("1GB".to_string()),
    request_disk: Some("1GB".to_string()),
    should_transfer_files: Some(TransferFiles::Yes),
    when_to_transfer_output: Some(TransferOutput::OnExit),
    ..SubmitOptions::default()
});

/// Keys backed by a typed field of [`SubmitOptions`].
const TYPED_KEYS: &[&str] = &[
    "universe",
    "arguments",
    "request_cpus",
    "request_memory",
    "request_disk",
    "request_gpus",
    "requirements",
    "container_image",
    "should_transfer_files",
    "when_to_transfer_output",
    "transfer_input_files",
    "transfer_output_files",
    "max_retries",
    "log",
    "output",
    "error",
];

/// Converts a scalar YAML/JSON value to its string form.
pub(crate) fn scalar_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(format!("Expected a scalar value, found {}", other)),
    }
}

/// Converts an option value to submit-file text; sequences become
/// comma-separated lists.
fn option_value_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::Array(items) => {
            let parts = items
                .into_iter()
                .map(scalar_to_string)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(", "))
        }
        other => scalar_to_string(other),
    }
}

/// `should_transfer_files` values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferFiles {
    Yes,
    No,
    IfNeeded,
}

impl fmt::Display for TransferFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::IfNeeded => "IF_NEEDED",
        };
        f.write_str(s)
    }
}

impl FromStr for TransferFiles {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YES" | "TRUE" => Ok(Self::Yes),
            "NO" | "FALSE" => Ok(Self::No),
            "IF_NEEDED" => Ok(Self::IfNeeded),
            other => Err(format!("Unknown should_transfer_files value: {}", other)),
        }
    }
}

/// `when_to_transfer_output` values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferOutput {
    OnExit,
    OnExitOrEvict,
}

impl fmt::Display for TransferOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OnExit => "ON_EXIT",
            Self::OnExitOrEvict => "ON_EXIT_OR_EVICT",
        };
        f.write_str(s)
    }
}

impl FromStr for TransferOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON_EXIT" => Ok(Self::OnExit),
            "ON_EXIT_OR_EVICT" => Ok(Self::OnExitOrEvict),
            other => Err(format!("Unknown when_to_transfer_output value: {}", other)),
        }
    }
}

/// Ordered `key = value` attributes. Setting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` overlaid with `other`; keys keep their first position.
    pub fn merged(&self, other: &Attributes) -> Attributes {
        let mut out = self.clone();
        for (k, v) in other.iter() {
            out.set(k, v);
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributesVisitor;

        impl<'de> Visitor<'de> for AttributesVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of keys to scalar values")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Attributes, E> {
                Ok(Attributes::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Attributes, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    let value = scalar_to_string(value)
                        .map_err(|e| de::Error::custom(format!("key '{}': {}", key, e)))?;
                    attrs.set(key, value);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_any(AttributesVisitor)
    }
}

/// Resource requests and runtime settings for one kind of job.
///
/// Unset fields are omitted from the submit description. `extra` carries
/// any other attribute in insertion order and `unordered` is emitted as-is.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SubmitOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe: Option<String>,

    /// Argument template; `$(key)` is substituted per job instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_cpus: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_memory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_disk: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_gpus: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_transfer_files: Option<TransferFiles>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_to_transfer_output: Option<TransferOutput>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_input_files: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfer_output_files: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub extra: Attributes,

    /// Raw text written verbatim (comments, directive blocks)
    #[serde(rename = "unordered_lines", skip_serializing_if = "Option::is_none")]
    pub unordered: Option<String>,
}

/// Every key goes through [`SubmitOptions::set`], so YAML accepts the same
/// forms as code: `request_cpus: $(ncpus)` lands in `extra` and
/// `transfer_input_files: $(inputs)` becomes a one-item list.
impl<'de> Deserialize<'de> for SubmitOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = SubmitOptions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of submit options")
            }

            fn visit_unit<E: de::Error>(self) -> Result<SubmitOptions, E> {
                Ok(SubmitOptions::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SubmitOptions, A::Error> {
                let mut opts = SubmitOptions::new();
                while let Some(key) = access.next_key::<String>()? {
                    if key == "extra" {
                        let extra: Attributes = access.next_value()?;
                        for (k, v) in extra.iter() {
                            opts = opts.set(k, v);
                        }
                        continue;
                    }

                    let value: Value = access.next_value()?;
                    if value.is_null() {
                        continue;
                    }
                    let text = option_value_to_string(value)
                        .map_err(|e| de::Error::custom(format!("{}: {}", key, e)))?;
                    opts = opts.set(&key, text);
                }
                Ok(opts)
            }
        }

        deserializer.deserialize_map(OptionsVisitor)
    }
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option by its submit-file key.
    ///
    /// Recognised keys land in their typed field; a value that does not fit
    /// the type (e.g. `request_cpus = $(cpus)`) is kept as a plain attribute.
    /// [`UNORDERED_KEY`] replaces the verbatim text. `executable` is owned by
    /// the job descriptor and ignored here.
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        let key = key.trim();

        let typed = match key {
            "executable" => {
                warn!("Ignoring 'executable' option; it is set by the job descriptor");
                return self;
            }
            UNORDERED_KEY => {
                self.unordered = Some(value);
                return self;
            }
            "universe" => {
                self.universe = Some(value.clone());
                true
            }
            "arguments" => {
                self.arguments = Some(value.clone());
                true
            }
            "request_memory" => {
                self.request_memory = Some(value.clone());
                true
            }
            "request_disk" => {
                self.request_disk = Some(value.clone());
                true
            }
            "requirements" => {
                self.requirements = Some(value.clone());
                true
            }
            "container_image" => {
                self.container_image = Some(value.clone());
                true
            }
            "log" => {
                self.log = Some(value.clone());
                true
            }
            "output" => {
                self.output = Some(value.clone());
                true
            }
            "error" => {
                self.error = Some(value.clone());
                true
            }
            "transfer_input_files" => {
                self.transfer_input_files = split_list(&value);
                true
            }
            "transfer_output_files" => {
                self.transfer_output_files = split_list(&value);
                true
            }
            "request_cpus" => parse_into(&value, &mut self.request_cpus),
            "request_gpus" => parse_into(&value, &mut self.request_gpus),
            "max_retries" => parse_into(&value, &mut self.max_retries),
            "should_transfer_files" => parse_into(&value, &mut self.should_transfer_files),
            "when_to_transfer_output" => parse_into(&value, &mut self.when_to_transfer_output),
            _ => false,
        };

        if typed {
            self.extra.remove(key);
        } else {
            self.clear_typed(key);
            self.extra.set(key, value);
        }
        self
    }

    /// Adds a verbatim line to the passthrough text.
    pub fn with_unordered_line(mut self, line: impl Into<String>) -> Self {
        let line = line.into();
        self.unordered = Some(match self.unordered.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        });
        self
    }

    fn clear_typed(&mut self, key: &str) {
        match key {
            "universe" => self.universe = None,
            "arguments" => self.arguments = None,
            "request_cpus" => self.request_cpus = None,
            "request_memory" => self.request_memory = None,
            "request_disk" => self.request_disk = None,
            "request_gpus" => self.request_gpus = None,
            "requirements" => self.requirements = None,
            "container_image" => self.container_image = None,
            "should_transfer_files" => self.should_transfer_files = None,
            "when_to_transfer_output" => self.when_to_transfer_output = None,
            "transfer_input_files" => self.transfer_input_files.clear(),
            "transfer_output_files" => self.transfer_output_files.clear(),
            "max_retries" => self.max_retries = None,
            "log" => self.log = None,
            "output" => self.output = None,
            "error" => self.error = None,
            _ => {}
        }
    }

    /// Returns `self` overlaid with `overrides`: every option present in
    /// `overrides` wins, everything else is kept.
    pub fn merge(&self, overrides: &SubmitOptions) -> SubmitOptions {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }
        fn pick_list(over: &[String], base: &[String]) -> Vec<String> {
            let chosen = if over.is_empty() { base } else { over };
            chosen.to_vec()
        }

        let mut merged = SubmitOptions {
            universe: pick(&overrides.universe, &self.universe),
            arguments: pick(&overrides.arguments, &self.arguments),
            request_cpus: pick(&overrides.request_cpus, &self.request_cpus),
            request_memory: pick(&overrides.request_memory, &self.request_memory),
            request_disk: pick(&overrides.request_disk, &self.request_disk),
            request_gpus: pick(&overrides.request_gpus, &self.request_gpus),
            requirements: pick(&overrides.requirements, &self.requirements),
            container_image: pick(&overrides.container_image, &self.container_image),
            should_transfer_files: pick(&overrides.should_transfer_files, &self.should_transfer_files),
            when_to_transfer_output: pick(
                &overrides.when_to_transfer_output,
                &self.when_to_transfer_output,
            ),
            transfer_input_files: pick_list(&overrides.transfer_input_files, &self.transfer_input_files),
            transfer_output_files: pick_list(
                &overrides.transfer_output_files,
                &self.transfer_output_files,
            ),
            max_retries: pick(&overrides.max_retries, &self.max_retries),
            log: pick(&overrides.log, &self.log),
            output: pick(&overrides.output, &self.output),
            error: pick(&overrides.error, &self.error),
            extra: self.extra.merged(&overrides.extra),
            unordered: pick(&overrides.unordered, &self.unordered),
        };

        // An override given as a plain attribute beats the typed default.
        for key in overrides.extra.keys() {
            merged.clear_typed(key);
        }
        // And a typed override beats a plain-attribute default.
        for (key, _) in overrides.typed_entries() {
            merged.extra.remove(&key);
        }

        merged
    }

    /// Typed options as `(key, value)` pairs in submit-file order.
    fn typed_entries(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                out.push((key.to_string(), v));
            }
        };

        push("universe", self.universe.clone());
        push("arguments", self.arguments.clone());
        push("request_cpus", self.request_cpus.map(|v| v.to_string()));
        push("request_memory", self.request_memory.clone());
        push("request_disk", self.request_disk.clone());
        push("request_gpus", self.request_gpus.map(|v| v.to_string()));
        push("requirements", self.requirements.clone());
        push("container_image", self.container_image.clone());
        push(
            "should_transfer_files",
            self.should_transfer_files.map(|v| v.to_string()),
        );
        push(
            "when_to_transfer_output",
            self.when_to_transfer_output.map(|v| v.to_string()),
        );
        push("transfer_input_files", join_list(&self.transfer_input_files));
        push("transfer_output_files", join_list(&self.transfer_output_files));
        push("max_retries", self.max_retries.map(|v| v.to_string()));
        push("log", self.log.clone());
        push("output", self.output.clone());
        push("error", self.error.clone());

        out
    }

    /// All `key = value` options in submit-file order (verbatim text
    /// excluded).
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = self.typed_entries();
        out.extend(self.extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        out
    }

    /// Looks up an option value by its submit-file key.
    pub fn get(&self, key: &str) -> Option<String> {
        if key == UNORDERED_KEY {
            return self.unordered.clone();
        }
        self.entries()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Submit description text for `executable`, ending with `queue`.
    pub fn render(&self, executable: &str) -> String {
        let mut text = String::new();
        text.push_str(&format!("executable = {}\n", executable));

        for (key, value) in self.entries() {
            text.push_str(&format!("{} = {}\n", key, value));
        }

        if let Some(raw) = self.unordered.as_deref().filter(|s| !s.is_empty()) {
            text.push_str(raw);
            if !raw.ends_with('\n') {
                text.push('\n');
            }
        }

        text.push_str("queue\n");
        text
    }

    /// True if `key` is one of the typed option names.
    pub fn is_typed_key(key: &str) -> bool {
        TYPED_KEYS.contains(&key)
    }
}

fn parse_into<T: FromStr>(value: &str, slot: &mut Option<T>) -> bool {
    match value.trim().parse() {
        Ok(parsed) => {
            *slot = Some(parsed);
            true
        }
        Err(_) => false,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}
