use std::path::PathBuf;

use advisor::settings::{default_config_path, load_settings};
use advisor::{AppResult, init_tracing, repl};

#[tokio::main]
async fn main() -> AppResult<()> {
    init_tracing();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    repl::run(load_settings(&config_path)).await
}
