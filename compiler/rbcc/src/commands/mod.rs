//! Command handlers for the rb2c CLI.
//!
//! Handlers return `Result` so the binary decides how to report failures;
//! shared file helpers live here.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::CliError;

mod compile;
mod snapshot;

pub use compile::{compile, parse_compile_args, CompileArgs};
pub use snapshot::{snapshot, snapshot_classes, SnapshotReport};

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
