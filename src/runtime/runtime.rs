//! Please, see [super]

use crate::frontend::console::ConsolePresentation;
use std::time::{Duration, Instant};
use futures::future::BoxFuture;
use log::debug;
use tokio::sync::RwLock;

/// Timeout to wait for `Option` data to be filled in -- when retrieving it
const TIMEOUT: Duration = Duration::from_secs(3);
/// Time to wait on between checks for an `Option` data to be filled in -- when retrieving it
const POLL_INTERVAL: Duration = Duration::from_micros(1000);


/// Contains data filled at runtime -- not present in the config file
pub struct Runtime {

    // environment
    //////////////

    /// this process executable's path, as given by the OS
    pub executable_path: String,

    /// handle to the Tokio runtime -- the worker pool where animation packages are loaded
    pub worker_pool: tokio::runtime::Handle,

    /// how many threads `worker_pool` has
    pub worker_threads: usize,

    // internal task communication
    //////////////////////////////

    /// The way into the presentation thread -- the main thread, which owns the stage and all of its layers.
    /// See [ConsolePresentation]
    presentation: Option<ConsolePresentation>,

}

/// Macro to create getters & setters for `Option` fields -- with timeouts and dead-lock prevention
macro_rules! impl_runtime {
    ($field_name_str:    literal,
     $field_name_ident:  ident,
     $field_type:        ty,
     $set_function_name: ident,
     $get_function_name: ident) => {

        impl Runtime {

            /// RW-Locks `runtime`, then registers the [Runtime::$field_name_ident] -- so it may be retrieved (possibly in another thread) with [$get_function_name()]\
            ///
            /// Example:
            /// ```no_compile
            ///     Runtime::$set_function_name(&runtime, $field_name_ident).await;
            pub async fn $set_function_name(runtime: &RwLock<Self>, $field_name_ident: $field_type) {
                runtime.write().await.$field_name_ident.replace($field_name_ident);
            }

            /// Gets (or waits for up to a reasonable, hard-coded timeout) the [Runtime::$field_name_ident] -- as set (possibly in another thread or task)
            /// by [$set_function_name()] -- then pass it to `callback()` to do something useful with it while `runtime` is read-locked\
            ///
            /// Example:
            /// ```no_compile
            ///     Runtime::$get_function_name(&runtime, |$field_name_ident, _runtime| Box::pin(async move {
            ///         $field_name_ident.dispatch(|stage| stage.teardown())
            ///     })).await?;
            pub async fn $get_function_name<ReturnType>
                                           (runtime:  &RwLock<Self>,
                                            callback: impl for<'r> FnOnce(&'r $field_type, &'r Runtime) -> BoxFuture<'r, ReturnType> + Send)
                                           -> ReturnType {
                let mut start: Option<Instant> = None;
                loop {
                    if let Ok(runtime) = &runtime.try_read() {
                        if let Some($field_name_ident) = &runtime.$field_name_ident {
                            if let Some(start) = start {
                                debug!("Runtime: `{}` became available after a {:?} wait", $field_name_str, start.elapsed());
                            }
                            break callback(&$field_name_ident, &runtime).await
                        }
                    }
                    if let Some(start) = start {
                        if start.elapsed() > TIMEOUT {
                            panic!("Could not retrieve `{}` instance: {}",
                                   $field_name_str,
                                   if let Ok(_runtime) = &runtime.try_read() {
                                       format!("it was not registered in `Runtime` even after {:?}", TIMEOUT)
                                   } else {
                                       format!("`Runtime` seems to be locked elsewhere for the past {:?}", TIMEOUT)
                                   });
                        }
                    } else {
                        start = Some(Instant::now());
                        debug!("Runtime: `{}` is not (yet?) available. Waiting for up to {:?} for it to be placed here with `register_{}()`",
                               $field_name_str, TIMEOUT, $field_name_str);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }

        }
    }
}

impl Runtime {

    pub fn new(executable_path: String, worker_pool: tokio::runtime::Handle, worker_threads: usize) -> Self {
        Self {
            executable_path,
            worker_pool,
            worker_threads,
            presentation: None,
        }
    }

    /// `true` if the presentation thread was already registered with [Runtime::register_presentation()]
    pub fn has_presentation(&self) -> bool {
        self.presentation.is_some()
    }
}

// implements getters and setters for all `Option` fields that are to be set/get asynchronously
///////////////////////////////////////////////////////////////////////////////////////////////
impl_runtime!("presentation", presentation, ConsolePresentation, register_presentation, do_for_presentation);


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::{
        frontend::console::ConsoleSurface,
        player::{PresentationThread, Stage},
    };

    #[cfg_attr(not(feature = "dox"), tokio::test(flavor = "multi_thread", worker_threads = 2))]
    async fn presentation_becomes_available_once_registered() {
        let runtime = RwLock::new(Runtime::new("test".to_string(), tokio::runtime::Handle::current(), 2));
        assert!(!runtime.read().await.has_presentation());
        let (_presentation_thread, presentation) = PresentationThread::<Stage<ConsoleSurface>>::new();
        Runtime::register_presentation(&runtime, presentation).await;
        let is_open = Runtime::do_for_presentation(&runtime, |presentation, _runtime| Box::pin(async move {
            !presentation.is_closed()
        })).await;
        assert!(is_open);
    }
}
