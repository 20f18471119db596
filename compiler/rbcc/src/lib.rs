//! rb2c command line driver.
//!
//! Two commands sit on top of [`rbc_codegen`]:
//!
//! - `compile`: one parsed-tree JSON file in, one `<name>.c` out
//! - `snapshot`: every method of a dump of class trees, each compiled into
//!   its own `temp_<n>` unit

use std::path::PathBuf;
use std::sync::Once;

use rbc_codegen::CodegenError;

pub mod commands;

pub use commands::{compile, parse_compile_args, snapshot, CompileArgs, SnapshotReport};

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::Usage(message.into())
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the hierarchical tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=rbc_codegen=debug`.
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env())
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .init();
        }
    });
}
