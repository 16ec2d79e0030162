//! Script Generation
//!
//! Converts function definitions into standalone executable scripts.
//!
//! - [`function`]: body extraction and job script persistence
//! - [`shell`]: executable file writing shared with node scripts

pub mod function;
pub mod shell;

pub use function::{serialize, FunctionDef, FunctionScript, DEFAULT_INTERPRETER};
pub use shell::{write_executable, DEFAULT_SHELL};
