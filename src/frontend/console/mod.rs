//! The headless console UI: the main thread becomes the presentation thread, hosting a [Stage] on a [ConsoleSurface],
//! while each job runs its logic on the worker pool.

mod surface;
pub use surface::*;

use crate::{
    runtime::Runtime,
    config::{Config, Jobs},
    logic,
    player::{PresentationThread, Stage},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use log::debug;


pub fn run(job: &Jobs, runtime: &Arc<RwLock<Runtime>>, config: &Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let worker_pool = runtime.blocking_read().worker_pool.clone();
    let surface = ConsoleSurface::new(worker_pool.clone(), config.player_config().effective_time_scale());
    let mut stage = Stage::new(surface);
    let (mut presentation_thread, presentation) = PresentationThread::new();
    worker_pool.block_on(Runtime::register_presentation(runtime, presentation.clone()));

    match job {
        Jobs::Play { paths, .. } => {
            let handle = logic::play_once(&worker_pool, config, paths.clone(), &presentation);
            presentation_thread.run_until(&mut stage, |_| handle.is_disposed());
        },
        Jobs::Interactive => {
            let interactive = worker_pool.spawn(logic::interactive(Arc::clone(runtime), Arc::clone(config)));
            presentation_thread.run_until(&mut stage, |stage| stage.surface().is_quit_requested());
            interactive.abort();
        },
        Jobs::CheckConfig => {
            worker_pool.block_on(logic::check_config(runtime, config))?;
        },
    }

    debug!("Console: presentation thread is over, with {} view(s) still attached", stage.view_count());
    stage.teardown();
    Ok(())
}
