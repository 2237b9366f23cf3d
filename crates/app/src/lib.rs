//! Terminal front end for the advisory conversation runtime.

pub mod error;
pub mod render;
pub mod repl;
pub mod settings;

use tracing_subscriber::EnvFilter;

pub use error::{AppError, AppResult};

/// Installs the global subscriber; call once at start-up. Logs go to stderr so
/// they never interleave with streamed replies, and `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
