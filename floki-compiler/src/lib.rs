//! Floki behavior compiler.
//!
//! Turns `state` / `gait` / `event` declarations plus an ordered sensor
//! manifest into a FUF bytecode image (see the `fuf-contract` crate for the
//! binary layout).
//!
//! ```no_run
//! use floki_compiler::{compile, CompileOptions};
//!
//! let source = "state idle\nevent bumper -> idle\n";
//! let out = compile(&["bumper"], source, &CompileOptions::default())?;
//! std::fs::write("output.fuf", &out.bytecode)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

pub mod assembler;
pub mod ast;
pub mod compiler;
pub mod error;
pub mod lint;
pub mod manifest;
pub mod options;
pub mod parser;
pub mod program;
pub mod sensors;
pub mod symbols;

pub use assembler::{Assembler, RecordCounts};
pub use compiler::{compile, CompiledProgram, CompilerSession};
pub use error::CompileError;
pub use lint::{Diagnostic, LintKind};
pub use manifest::{load_sensor_manifest, parse_manifest, ManifestFormat};
pub use options::CompileOptions;
pub use program::Program;

/// Installs the global subscriber. `log_level` takes precedence over
/// `RUST_LOG`; `verbose` lowers the fallback filter from `warn` to `debug`.
/// With `log_file` set, events are written there as JSON lines.
pub fn init_logging(
    log_level: Option<&str>,
    log_file: Option<&Path>,
    verbose: bool,
) -> anyhow::Result<()> {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level `{}`", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
    };

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("creating log file {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(())
}
