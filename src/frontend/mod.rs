//! Home for all frontends & UIs

pub mod console;

use crate::{
    runtime::Runtime,
    config::{Config, ExtendedOption, UiOptions},
};
use std::sync::Arc;
use tokio::sync::RwLock;


/// Runs the UI selected in `config` on the calling thread -- which should be the main thread: it becomes the presentation thread
pub fn run(runtime: &Arc<RwLock<Runtime>>, config: &Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    match &config.ui {
        ExtendedOption::Enabled(UiOptions::Console(job)) => console::run(job, runtime, config),
        _ => Err(Box::from("frontend: no UI was selected -- `merge_configs()` should have assured one")),
    }
}
