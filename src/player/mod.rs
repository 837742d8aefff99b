//! Preloads sequences of Lottie animation packages and plays them, one after the other.
//!
//! A request is a list of animation roots (directories holding a `package.json`), in playback order.
//! Repeated roots are loaded once and looped instead. Loading happens in parallel on the tokio worker pool,
//! while every layer object lives on a single presentation thread -- see [presentation] -- where a
//! [Stage] keeps one view per in-flight request.
//!
//! Typical usage:
//! ```ignore
//! let mut stage = Stage::new(surface);
//! let (mut presentation_thread, presentation) = PresentationThread::new();
//! let handle = prepare_and_play(pool, paths, PlayOptions::default(), &presentation, || log::info!("done"));
//! presentation_thread.run_until(&mut stage, |_| handle.is_disposed());
//! ```

pub mod error;
pub mod model;
pub mod animation;
pub mod image_cache;
pub mod package;
pub mod preparer;
pub mod sequencer;
pub mod presentation;
pub mod stage;
#[cfg(any(test, feature = "dox"))]
pub(crate) mod fixtures;

pub use error::PlayerError;
pub use model::{AnimationItem, LayerTag, Liveness, PlayMode, PlayOptions, SubItem, SubPackageFailurePolicy, ViewId};
pub use presentation::{CompletionCallback, PlayableLayer, PresentationHandle, PresentationSurface, PresentationThread};
pub use stage::Stage;

use stage::StageRegistrar;
use std::{
    path::PathBuf,
    sync::Arc,
};
use log::{debug, warn};


/// Returned by [prepare_and_play()] to follow the fate of a request
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    view_id:  ViewId,
    liveness: Liveness,
}

impl PlayerHandle {

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// `true` once everything played (`on_done` was called by then) or once the view was torn down
    pub fn is_disposed(&self) -> bool {
        !self.liveness.is_alive()
    }
}

/// Attaches a new view to the [Stage] behind `presentation`, then loads `paths` on `worker_pool` and plays them
/// in request order, calling `on_done` -- on the presentation thread -- once the last layer finished.\
/// Returns immediately. `on_done` is never called if [Stage::teardown()] happens first.
pub fn prepare_and_play<S: PresentationSurface>(worker_pool:  &tokio::runtime::Handle,
                                                paths:        Vec<PathBuf>,
                                                options:      PlayOptions,
                                                presentation: &PresentationHandle<Stage<S>>,
                                                on_done:      impl FnOnce() + Send + 'static)
                                               -> PlayerHandle {

    let view_id = ViewId::next();
    let liveness = Liveness::new();
    let handle = PlayerHandle { view_id, liveness: liveness.clone() };

    let view_liveness = liveness.clone();
    if let Err(err) = presentation.dispatch(move |stage| stage.attach_view(view_id, view_liveness, Box::new(on_done))) {
        warn!("Request for {} animation(s) dropped: {}", paths.len(), err);
        liveness.dispose();
        return handle
    }

    let presentation = presentation.clone();
    worker_pool.spawn(async move {
        let items = preparer::deduplicate(paths);
        debug!("{}: preparing {} distinct animation(s) with {:?}", view_id, items.len(), options);
        let items = if items.is_empty() {
            items
        } else {
            let registrar = Arc::new(StageRegistrar { view_id, liveness: liveness.clone(), presentation: presentation.clone() });
            preparer::prepare(items, Arc::new(options), registrar).await
        };
        if !liveness.is_alive() {
            debug!("{}: disposed while loading -- nothing will play", view_id);
            return
        }
        let starter = presentation.clone();
        if let Err(err) = presentation.dispatch(move |stage| stage.start_playback(view_id, items, &starter)) {
            warn!("{}: playback not started: {}", view_id, err);
        }
    });

    handle
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use fixtures::{RecordingSurface, SurfaceEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn worker_pool() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("failed to build the tokio runtime")
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let calls = Arc::new(AtomicUsize::new(0));
        let callback_calls = Arc::clone(&calls);
        (calls, move || { callback_calls.fetch_add(1, Ordering::SeqCst); })
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn repeated_request_plays_in_order_and_completes_once() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let a = fixtures::write_animation(dir.path(), "A", &["x", "y"]);
        let b = fixtures::write_animation(dir.path(), "B", &["z"]);
        let runtime = worker_pool();
        let surface = RecordingSurface::new();
        let events = surface.events();
        let mut stage = Stage::new(surface);
        let (mut presentation_thread, presentation) = PresentationThread::new();
        let (calls, on_done) = counting_callback();

        let handle = prepare_and_play(runtime.handle(), vec![a.clone(), b, a], PlayOptions::default(), &presentation, on_done);
        presentation_thread.run_until(&mut stage, |_| handle.is_disposed());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(stage.is_idle());
        let events = events.lock();
        let plays: Vec<&SurfaceEvent> = events.iter().filter(|event| matches!(event, SurfaceEvent::Play(..))).collect();
        assert_eq!(plays, vec![
            &SurfaceEvent::Play(LayerTag::new(0, 0), 2),
            &SurfaceEvent::Play(LayerTag::new(0, 1), 2),
            &SurfaceEvent::Play(LayerTag::new(1, 0), 1),
        ]);
        let position = |wanted: SurfaceEvent| events.iter().position(|event| *event == wanted).expect("event should have happened");
        assert!(position(SurfaceEvent::Remove(LayerTag::new(0, 0))) < position(SurfaceEvent::Play(LayerTag::new(1, 0), 1)));
        assert!(position(SurfaceEvent::Remove(LayerTag::new(0, 1))) < position(SurfaceEvent::Play(LayerTag::new(1, 0), 1)));
        // layers are created hidden and only shown once their item starts
        for (i, event) in events.iter().enumerate() {
            if let SurfaceEvent::Create(tag) = event {
                assert_eq!(events.get(i + 1), Some(&SurfaceEvent::Hide(*tag)), "layer {} wasn't hidden on creation", tag);
            }
        }
        let second_item_shown = position(SurfaceEvent::Show(LayerTag::new(1, 0)));
        assert!(position(SurfaceEvent::Remove(LayerTag::new(0, 0))) < second_item_shown);
        assert!(position(SurfaceEvent::Remove(LayerTag::new(0, 1))) < second_item_shown);
        assert!(position(SurfaceEvent::Show(LayerTag::new(0, 0))) < position(SurfaceEvent::Play(LayerTag::new(0, 0), 2)));
        assert_eq!(events.last(), Some(&SurfaceEvent::Detach(handle.view_id())));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn missing_manifest_is_instantly_complete() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let a = fixtures::write_animation(dir.path(), "A", &["x"]);
        let runtime = worker_pool();
        let surface = RecordingSurface::new();
        let events = surface.events();
        let mut stage = Stage::new(surface);
        let (mut presentation_thread, presentation) = PresentationThread::new();
        let (calls, on_done) = counting_callback();

        let handle = prepare_and_play(runtime.handle(), vec![dir.path().join("B"), a], PlayOptions::for_mode(PlayMode::Origin), &presentation, on_done);
        presentation_thread.run_until(&mut stage, |_| handle.is_disposed());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(events.lock().contains(&SurfaceEvent::Play(LayerTag::new(1, 0), 1)));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn empty_request_completes_without_loading() {
        let runtime = worker_pool();
        let surface = RecordingSurface::new();
        let events = surface.events();
        let mut stage = Stage::new(surface);
        let (mut presentation_thread, presentation) = PresentationThread::new();
        let (calls, on_done) = counting_callback();

        let handle = prepare_and_play(runtime.handle(), vec![], PlayOptions::default(), &presentation, on_done);
        presentation_thread.run_until(&mut stage, |_| handle.is_disposed());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*events.lock(), vec![SurfaceEvent::Attach(handle.view_id()), SurfaceEvent::Detach(handle.view_id())]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn teardown_suppresses_the_completion_callback() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let a = fixtures::write_animation(dir.path(), "A", &["x"]);
        let runtime = worker_pool();
        let surface = RecordingSurface::holding_completions();
        let events = surface.events();
        let mut stage = Stage::new(surface);
        let (mut presentation_thread, presentation) = PresentationThread::new();
        let (calls, on_done) = counting_callback();

        let handle = prepare_and_play(runtime.handle(), vec![a], PlayOptions::default(), &presentation, on_done);
        presentation_thread.run_until(&mut stage, |_| events.lock().iter().any(|event| matches!(event, SurfaceEvent::Play(..))));
        assert!(!handle.is_disposed());
        stage.teardown();

        assert!(handle.is_disposed());
        assert!(stage.is_idle());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
