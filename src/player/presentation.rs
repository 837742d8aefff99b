//! The presentation thread: the one thread allowed to create, show, play & remove layer objects.
//!
//! Any other thread talks to it through a [PresentationHandle], queueing tasks that will run, in order,
//! against the state owned by [PresentationThread::run_until()] -- either without waiting ([PresentationHandle::dispatch()])
//! or waiting for the task's result ([PresentationHandle::dispatch_sync()]).
//!
//! This module also declares the collaborators a host UI provides: [PresentationSurface] & [PlayableLayer].

use super::{
    error::PlayerError,
    model::{SubItem, ViewId},
};
use tokio::sync::mpsc;


/// Work to be executed on the presentation thread, against its state `T`
pub type PresentationTask<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Called (from any thread) when a layer finished playing all of its loops
pub type CompletionCallback = Box<dyn FnOnce() + Send>;


/// The host UI onto which animation views are attached
pub trait PresentationSurface: 'static {
    type Layer: PlayableLayer + 'static;

    fn attach_view(&mut self, view: ViewId);

    fn detach_view(&mut self, view: ViewId);

    /// creates the layer object for `sub_item` -- hidden until it is played
    fn create_layer(&mut self, view: ViewId, sub_item: &SubItem) -> Self::Layer;

    fn remove_layer(&mut self, view: ViewId, layer: Self::Layer);
}

/// A layer object, as created by [PresentationSurface::create_layer()]
pub trait PlayableLayer {

    fn set_hidden(&mut self, hidden: bool);

    /// plays the animation `loop_count` times, then calls `on_complete` -- exactly once
    fn play(&mut self, loop_count: u32, on_complete: CompletionCallback);
}


/// The consumer side of the presentation queue -- run it on the presentation thread
pub struct PresentationThread<T> {
    receiver: mpsc::UnboundedReceiver<PresentationTask<T>>,
}

/// The producer side of the presentation queue -- clone it freely and send it to any thread
pub struct PresentationHandle<T> {
    sender: mpsc::UnboundedSender<PresentationTask<T>>,
}

impl<T> Clone for PresentationHandle<T> {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

impl<T: 'static> PresentationThread<T> {

    pub fn new() -> (Self, PresentationHandle<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver }, PresentationHandle { sender })
    }

    /// Executes queued tasks against `state`, in submission order, blocking while the queue is empty,
    /// until `done(state)` holds (checked before every task) or every [PresentationHandle] is dropped.\
    /// Returns the number of executed tasks.\
    /// Must not be called from within an async context. Once this returns, drop `self` so workers still
    /// waiting on [PresentationHandle::dispatch_sync()] are released.
    pub fn run_until(&mut self, state: &mut T, mut done: impl FnMut(&T) -> bool) -> usize {
        let mut executed = 0;
        while !done(state) {
            match self.receiver.blocking_recv() {
                Some(task) => {
                    task(state);
                    executed += 1;
                },
                None => break,
            }
        }
        executed
    }

    /// Executes only the tasks already queued -- for hosts that have their own event loop, calling this once per frame
    pub fn run_pending(&mut self, state: &mut T) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(state);
            executed += 1;
        }
        executed
    }
}

impl<T: 'static> PresentationHandle<T> {

    /// queues `task` to run on the presentation thread, without waiting for it
    pub fn dispatch(&self, task: impl FnOnce(&mut T) + Send + 'static) -> Result<(), PlayerError> {
        self.sender.send(Box::new(task))
            .map_err(|_| PlayerError::PresentationGone)
    }

    /// queues `task` and blocks until the presentation thread ran it, returning its result.\
    /// Calling this from the presentation thread itself would deadlock -- use it from workers only.
    pub fn dispatch_sync<R: Send + 'static>(&self, task: impl FnOnce(&mut T) -> R + Send + 'static) -> Result<R, PlayerError> {
        let (result_sender, result_receiver) = futures::channel::oneshot::channel();
        self.dispatch(move |state| {
            let _ = result_sender.send(task(state));
        })?;
        futures::executor::block_on(result_receiver)
            .map_err(|_canceled| PlayerError::PresentationGone)
    }

    /// `true` if the presentation thread is gone and no task will ever run again
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use std::thread;

    #[cfg_attr(not(feature = "dox"), test)]
    fn tasks_run_in_submission_order() {
        let (mut presentation, handle) = PresentationThread::<Vec<u32>>::new();
        for i in 0..5 {
            handle.dispatch(move |log| log.push(i)).expect("queue is open");
        }
        drop(handle);
        let mut log = Vec::new();
        assert_eq!(presentation.run_until(&mut log, |_| false), 5);
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn dispatch_sync_waits_for_the_presentation_thread() {
        let (mut presentation, handle) = PresentationThread::<Vec<&'static str>>::new();
        let worker = thread::spawn(move || {
            let len = handle.dispatch_sync(|log| { log.push("created"); log.len() }).expect("presentation thread is running");
            handle.dispatch(|log| log.push("after")).expect("presentation thread is running");
            len
        });
        let mut log = Vec::new();
        presentation.run_until(&mut log, |log| log.len() == 2);
        assert_eq!(worker.join().expect("worker panicked"), 1);
        assert_eq!(log, vec!["created", "after"]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn dispatch_sync_fails_once_the_presentation_thread_is_gone() {
        let (presentation, handle) = PresentationThread::<()>::new();
        drop(presentation);
        assert!(handle.is_closed());
        assert!(matches!(handle.dispatch_sync(|_| 1), Err(PlayerError::PresentationGone)));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn run_pending_does_not_block() {
        let (mut presentation, handle) = PresentationThread::<u32>::new();
        let mut counter = 0;
        assert_eq!(presentation.run_pending(&mut counter), 0);
        handle.dispatch(|counter| *counter += 1).expect("queue is open");
        handle.dispatch(|counter| *counter += 1).expect("queue is open");
        assert_eq!(presentation.run_pending(&mut counter), 2);
        assert_eq!(counter, 2);
    }
}
