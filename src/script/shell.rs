//! Executable File Writing
//!
//! Writes an interpreter directive plus a body to disk and marks the result
//! executable. Used for generated job scripts and DAG node PRE/POST scripts.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::error::{DagError, Result};

/// Shebang used for PRE/POST node scripts when none is given.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Writes `#!{interpreter}` followed by `body` to `path` with mode 0755.
///
/// Parent directories are created as needed and an existing file is
/// overwritten.
pub fn write_executable(path: &Path, interpreter: &str, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| DagError::io(parent, e))?;
            debug!("Created directory: {}", parent.display());
        }
    }

    let mut file = File::create(path).map_err(|e| DagError::io(path, e))?;

    let interpreter = interpreter.trim_start_matches("#!").trim();
    writeln!(file, "#!{}", interpreter).map_err(|e| DagError::io(path, e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| DagError::io(path, e))?;
    if !body.ends_with('\n') {
        writeln!(file).map_err(|e| DagError::io(path, e))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| DagError::io(path, e))?;
    }

    debug!("Wrote executable script {}", path.display());
    Ok(())
}
