mod features;
mod config;
mod command_line;
mod runtime;
mod frontend;
mod logic;
pub mod player;

use crate::{
    config::{Config, LoggingOptions},
    runtime::Runtime,
};
use std::{
    sync::Arc,
    time::Duration,
};
use log::{debug, info, warn};
use tokio::sync::RwLock;

pub const APP_NAME: &str = "lottie-preloader";

#[cfg(debug_assertions)]
pub const DEBUG: bool = true;
#[cfg(not(debug_assertions))]
pub const DEBUG: bool = false;

/// How long to wait for worker tasks to finish once the UI is over
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);


fn main() -> Result<(), Box<dyn std::error::Error>> {

    let config_file_options = load_configs()?;
    let command_line_options = command_line::parse_from_args();
    let effective_config = command_line::merge_config_file_and_command_line_options(config_file_options, command_line_options);
    let effective_config = Arc::new(effective_config);
    let _logger_guard = setup_logging(&effective_config)?;

    info!("{} application started!", APP_NAME);

    // the main thread won't enter the Tokio runtime: it is reserved to be the presentation thread
    let worker_threads = worker_threads(&effective_config);
    debug!("  about to start the Tokio runtime with {} worker threads...", worker_threads);
    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;
    let executable_path = std::env::current_exe()
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|_| APP_NAME.to_string());
    let runtime = Arc::new(RwLock::new(Runtime::new(executable_path, tokio_runtime.handle().clone(), worker_threads)));

    let result = frontend::run(&runtime, &effective_config);
    debug!("App exit requested. Starting shutdown process (within {:?})...", SHUTDOWN_TIMEOUT);
    tokio_runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    if let Err(err) = &result {
        warn!("{} is quitting due to an error: {}", APP_NAME, err);
    }
    result
}

/// Loads default configs from ${0}.config.ron file -- creating it with defaults if it doesn't exist
fn load_configs() -> Result<Config, Box<dyn std::error::Error>> {
    let program_name = std::env::args().next()
        .unwrap_or_else(|| APP_NAME.to_string());
    let config_file = format!("{}.config.ron", program_name);
    config::load_or_create_default(&config_file)
        .map_err(|err| Box::from(format!("Could not load (or create) the configuration file '{}': {}", config_file, err)))
}

/// `tokio_threads` from the config, where 0 means "as many as there are CPUs"
fn worker_threads(config: &Config) -> usize {
    if config.tokio_threads > 0 {
        config.tokio_threads as usize
    } else {
        std::thread::available_parallelism()
            .map(|cpus| cpus.get())
            .unwrap_or(1)
    }
}


// LOGGING
//////////
// Facade for the `slog` crate to behave just like the `log` API
// (currently we use `slog-scope` & `slog-stdlog` crates for the heavy lifting)
use slog_scope::GlobalLoggerGuard;
use sloggers::{Build, types::{OverflowStrategy, Severity}};


/// Keep those levels in sync with Cargo.toml's `log` crate levels defined in features.
/// Example: features = ["max_level_debug", "release_max_level_info"]
const LOG_LEVEL: Severity = if DEBUG {
    Severity::Debug
} else {
    Severity::Info
};

/// starts a global logger according to the `config` logging options
/// -- the returned value should not be dropped until the program ends
fn setup_logging(config: &Config) -> Result<GlobalLoggerGuard, Box<dyn std::error::Error>> {
    let logger = match &config.log {
        LoggingOptions::Quiet => sloggers::null::NullLoggerBuilder {}.build()?,
        LoggingOptions::ToConsole => {
            let mut builder = sloggers::terminal::TerminalLoggerBuilder::new();
            builder.level(LOG_LEVEL);
            builder.destination(sloggers::terminal::Destination::Stdout);
            builder.build()?
        },
        LoggingOptions::ToFile { file_path, rotation_size, rotations_kept, compress_rotated } => {
            let mut builder = sloggers::file::FileLoggerBuilder::new(file_path);
            builder.overflow_strategy(OverflowStrategy::Block);
            builder.rotate_size(*rotation_size as u64);
            builder.rotate_keep(*rotations_kept);
            builder.rotate_compress(*compress_rotated);
            builder.level(LOG_LEVEL);
            builder.build()?
        },
    };
    let log_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init()?;
    Ok(log_guard)
}
