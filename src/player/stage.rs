//! The presentation-thread side of the player: a [Stage] hosts the views of in-flight requests
//! on one [PresentationSurface], owning their layer objects and [Sequencer]s.

use super::{
    error::PlayerError,
    model::{AnimationItem, LayerTag, Liveness, SubItem, ViewId},
    presentation::{PlayableLayer, PresentationHandle, PresentationSurface},
    preparer::LayerRegistrar,
    sequencer::{DoneCallback, LayerBoard, Progress, Sequencer},
};
use std::collections::HashMap;
use log::{debug, warn};


struct View<L> {
    liveness:  Liveness,
    layers:    HashMap<LayerTag, L>,
    sequencer: Sequencer,
}

pub struct Stage<S: PresentationSurface> {
    surface: S,
    views:   HashMap<ViewId, View<S::Layer>>,
}

impl<S: PresentationSurface> Stage<S> {

    pub fn new(surface: S) -> Self {
        Self {
            surface,
            views: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// `true` when no view is attached
    pub fn is_idle(&self) -> bool {
        self.views.is_empty()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// number of layer objects currently alive in `view_id`
    pub fn layer_count(&self, view_id: ViewId) -> usize {
        self.views.get(&view_id)
            .map_or(0, |view| view.layers.len())
    }

    pub fn attach_view(&mut self, view_id: ViewId, liveness: Liveness, on_done: DoneCallback) {
        if !liveness.is_alive() {
            debug!("Stage: {} was disposed before being attached", view_id);
            return
        }
        self.surface.attach_view(view_id);
        self.views.insert(view_id, View {
            liveness,
            layers:    HashMap::new(),
            sequencer: Sequencer::new(on_done),
        });
    }

    /// creates the (hidden) layer object for `sub_item` -- returns `false` if `view_id` is gone
    pub fn create_layer(&mut self, view_id: ViewId, sub_item: &SubItem) -> bool {
        let Some(view) = self.views.get_mut(&view_id) else {
            return false
        };
        let mut layer = self.surface.create_layer(view_id, sub_item);
        layer.set_hidden(true);
        if let Some(replaced) = view.layers.insert(sub_item.tag, layer) {
            warn!("Stage: layer {} of {} was created twice", sub_item.tag, view_id);
            self.surface.remove_layer(view_id, replaced);
        }
        true
    }

    /// hands the prepared `items` to the view's sequencer, starting playback
    pub fn start_playback(&mut self, view_id: ViewId, items: Vec<AnimationItem>, presentation: &PresentationHandle<Self>) {
        let Some(view) = self.views.get_mut(&view_id) else {
            debug!("Stage: {} is gone -- {} prepared item(s) won't play", view_id, items.len());
            return
        };
        let mut board = ViewBoard { surface: &mut self.surface, view_id, layers: &mut view.layers, presentation };
        if view.sequencer.start(items, &mut board) == Progress::Finished {
            self.detach(view_id);
        }
    }

    /// accounts for the end of the layer `tag` of `view_id`
    pub fn layer_finished(&mut self, view_id: ViewId, tag: LayerTag, presentation: &PresentationHandle<Self>) {
        let Some(view) = self.views.get_mut(&view_id) else {
            return
        };
        let mut board = ViewBoard { surface: &mut self.surface, view_id, layers: &mut view.layers, presentation };
        if view.sequencer.layer_finished(tag, &mut board) == Progress::Finished {
            self.detach(view_id);
        }
    }

    /// detaches every view, without calling their done callbacks
    pub fn teardown(&mut self) {
        let view_ids: Vec<ViewId> = self.views.keys().copied().collect();
        for view_id in view_ids {
            debug!("Stage: tearing down {}", view_id);
            self.detach(view_id);
        }
    }

    fn detach(&mut self, view_id: ViewId) {
        if let Some(view) = self.views.remove(&view_id) {
            view.liveness.dispose();
            for (_tag, layer) in view.layers {
                self.surface.remove_layer(view_id, layer);
            }
            self.surface.detach_view(view_id);
        }
    }
}

/// Exposes the layer objects of one view to its [Sequencer]
struct ViewBoard<'a, S: PresentationSurface> {
    surface:      &'a mut S,
    view_id:      ViewId,
    layers:       &'a mut HashMap<LayerTag, S::Layer>,
    presentation: &'a PresentationHandle<Stage<S>>,
}

impl<S: PresentationSurface> LayerBoard for ViewBoard<'_, S> {

    fn start_layer(&mut self, tag: LayerTag, loop_count: u32) -> bool {
        let Some(layer) = self.layers.get_mut(&tag) else {
            return false
        };
        let view_id = self.view_id;
        let presentation = self.presentation.clone();
        layer.set_hidden(false);
        layer.play(loop_count, Box::new(move || {
            let handle = presentation.clone();
            if presentation.dispatch(move |stage| stage.layer_finished(view_id, tag, &handle)).is_err() {
                debug!("Stage: completion of layer {} of {} arrived after the presentation thread ended", tag, view_id);
            }
        }));
        true
    }

    fn remove_layer(&mut self, tag: LayerTag) -> bool {
        match self.layers.remove(&tag) {
            Some(layer) => {
                self.surface.remove_layer(self.view_id, layer);
                true
            },
            None => false,
        }
    }
}

/// Lets workers create layers of a view on the presentation thread -- see [LayerRegistrar]
pub struct StageRegistrar<S: PresentationSurface> {
    pub view_id:      ViewId,
    pub liveness:     Liveness,
    pub presentation: PresentationHandle<Stage<S>>,
}

impl<S: PresentationSurface> LayerRegistrar for StageRegistrar<S> {
    fn register(&self, sub_item: &SubItem) -> Result<(), PlayerError> {
        if !self.liveness.is_alive() {
            return Err(PlayerError::ViewDisposed)
        }
        let view_id = self.view_id;
        let sub_item = sub_item.clone();
        let created = self.presentation.dispatch_sync(move |stage| stage.create_layer(view_id, &sub_item))?;
        if created {
            Ok(())
        } else {
            Err(PlayerError::ViewDisposed)
        }
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::{
        fixtures::{RecordingSurface, SurfaceEvent},
        presentation::PresentationThread,
    };
    use std::{
        path::PathBuf,
        sync::{Arc, atomic::{AtomicUsize, Ordering}},
    };

    fn item_with_layers(index: usize, layers: usize) -> AnimationItem {
        let mut item = AnimationItem::new(PathBuf::from(format!("anim_{}", index)), index);
        item.sub_items = (0..layers)
            .map(|position| SubItem { tag: LayerTag::new(index, position), animation: None, images: None })
            .collect();
        item
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn view_lifecycle() {
        let surface = RecordingSurface::new();
        let events = surface.events();
        let mut stage = Stage::new(surface);
        let (mut presentation, handle) = PresentationThread::<Stage<RecordingSurface>>::new();
        let view_id = ViewId::next();
        let liveness = Liveness::new();
        let done_calls = Arc::new(AtomicUsize::new(0));
        let on_done_calls = Arc::clone(&done_calls);

        stage.attach_view(view_id, liveness.clone(), Box::new(move || { on_done_calls.fetch_add(1, Ordering::SeqCst); }));
        let items = vec![item_with_layers(0, 2), item_with_layers(1, 1)];
        for sub_item in items.iter().flat_map(|item| item.sub_items.iter()) {
            assert!(stage.create_layer(view_id, sub_item));
        }
        assert_eq!(stage.layer_count(view_id), 3);
        stage.start_playback(view_id, items, &handle);
        // layers complete right away, queueing their completions
        presentation.run_until(&mut stage, |stage| stage.is_idle());

        assert_eq!(done_calls.load(Ordering::SeqCst), 1);
        assert!(!liveness.is_alive());
        let events = events.lock();
        assert_eq!(events.first(), Some(&SurfaceEvent::Attach(view_id)));
        assert_eq!(events.last(), Some(&SurfaceEvent::Detach(view_id)));
        let position = |wanted: &SurfaceEvent| events.iter().position(|event| event == wanted).expect("event should have happened");
        let second_item_start = position(&SurfaceEvent::Play(LayerTag::new(1, 0), 1));
        assert!(position(&SurfaceEvent::Remove(LayerTag::new(0, 0))) < second_item_start);
        assert!(position(&SurfaceEvent::Remove(LayerTag::new(0, 1))) < second_item_start);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn teardown_skips_the_done_callback() {
        let surface = RecordingSurface::holding_completions();
        let mut stage = Stage::new(surface);
        let (_presentation, handle) = PresentationThread::<Stage<RecordingSurface>>::new();
        let view_id = ViewId::next();
        let liveness = Liveness::new();
        let done_calls = Arc::new(AtomicUsize::new(0));
        let on_done_calls = Arc::clone(&done_calls);
        stage.attach_view(view_id, liveness.clone(), Box::new(move || { on_done_calls.fetch_add(1, Ordering::SeqCst); }));
        let item = item_with_layers(0, 1);
        assert!(stage.create_layer(view_id, &item.sub_items[0]));
        stage.start_playback(view_id, vec![item], &handle);

        stage.teardown();
        assert!(stage.is_idle());
        assert!(!liveness.is_alive());
        assert!(!stage.create_layer(view_id, &item_with_layers(1, 1).sub_items[0]));
        // a late completion finds nothing to do
        stage.layer_finished(view_id, LayerTag::new(0, 0), &handle);
        assert_eq!(done_calls.load(Ordering::SeqCst), 0);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn registrar_refuses_disposed_views() {
        let (_presentation, handle) = PresentationThread::<Stage<RecordingSurface>>::new();
        let liveness = Liveness::new();
        liveness.dispose();
        let registrar = StageRegistrar { view_id: ViewId::next(), liveness, presentation: handle };
        let sub_item = item_with_layers(0, 1).sub_items.remove(0);
        assert!(matches!(registrar.register(&sub_item), Err(PlayerError::ViewDisposed)));
    }
}
