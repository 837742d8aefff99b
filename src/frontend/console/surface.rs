//! A headless [PresentationSurface]: instead of rendering, layers resolve their images through the image provider
//! (measuring how long that takes for the configured play mode) and wait for as long as the animation would last.

use crate::player::{
    animation::Animation,
    image_cache::ImageProvider,
    CompletionCallback, LayerTag, PlayableLayer, PresentationHandle, PresentationSurface, Stage, SubItem, ViewId,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use log::{debug, info};


/// The handle into the console's presentation thread
pub type ConsolePresentation = PresentationHandle<Stage<ConsoleSurface>>;

pub struct ConsoleSurface {
    worker_pool:    tokio::runtime::Handle,
    time_scale:     f64,
    quit_requested: bool,
}

impl ConsoleSurface {

    /// `time_scale` multiplies how long each animation loop lasts -- 0.0 plays instantly
    pub fn new(worker_pool: tokio::runtime::Handle, time_scale: f64) -> Self {
        Self {
            worker_pool,
            time_scale,
            quit_requested: false,
        }
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl PresentationSurface for ConsoleSurface {
    type Layer = ConsoleLayer;

    fn attach_view(&mut self, view: ViewId) {
        debug!("Console: {} attached", view);
    }

    fn detach_view(&mut self, view: ViewId) {
        debug!("Console: {} detached", view);
    }

    fn create_layer(&mut self, view: ViewId, sub_item: &SubItem) -> ConsoleLayer {
        ConsoleLayer {
            view,
            tag:         sub_item.tag,
            animation:   sub_item.animation.clone(),
            images:      sub_item.images.clone(),
            hidden:      true,
            worker_pool: self.worker_pool.clone(),
            time_scale:  self.time_scale,
        }
    }

    fn remove_layer(&mut self, view: ViewId, layer: ConsoleLayer) {
        debug!("Console: {} layer {} removed", view, layer.tag);
    }
}

pub struct ConsoleLayer {
    view:        ViewId,
    tag:         LayerTag,
    animation:   Option<Arc<Animation>>,
    images:      Option<Arc<dyn ImageProvider>>,
    hidden:      bool,
    worker_pool: tokio::runtime::Handle,
    time_scale:  f64,
}

impl ConsoleLayer {

    /// how long playing `loop_count` loops takes on this surface
    fn play_duration(&self, loop_count: u32) -> Duration {
        let Some(animation) = &self.animation else {
            return Duration::ZERO
        };
        Duration::try_from_secs_f64(animation.duration().as_secs_f64() * loop_count as f64 * self.time_scale)
            .unwrap_or(Duration::ZERO)
    }
}

impl PlayableLayer for ConsoleLayer {

    fn set_hidden(&mut self, hidden: bool) {
        if hidden != self.hidden {
            debug!("Console: {} layer {} {}", self.view, self.tag, if hidden { "hidden" } else { "shown" });
        }
        self.hidden = hidden;
    }

    fn play(&mut self, loop_count: u32, on_complete: CompletionCallback) {
        let Some(animation) = self.animation.clone() else {
            info!("Console: {} layer {} has nothing to play", self.view, self.tag);
            on_complete();
            return
        };
        if self.hidden {
            debug!("Console: {} layer {} plays while hidden", self.view, self.tag);
        }
        let duration = self.play_duration(loop_count);
        let images = self.images.clone();
        let (view, tag) = (self.view, self.tag);
        info!("Console: {} layer {} playing '{}' ({}x{}) {} time(s) -- {:?}",
              view, tag, animation.display_name(), animation.width, animation.height, loop_count, duration);
        self.worker_pool.spawn(async move {
            let resolution = tokio::task::spawn_blocking(move || resolve_images(&animation, images.as_deref())).await;
            match resolution {
                Ok((resolved, total, elapsed)) => debug!("Console: {} layer {}: {} of {} image(s) resolved in {:?}", view, tag, resolved, total, elapsed),
                Err(err) => debug!("Console: {} layer {}: image resolution failed: {}", view, tag, err),
            }
            tokio::time::sleep(duration).await;
            on_complete();
        });
    }
}

/// asks `images` for every image asset of `animation`, as a renderer would do before its first frame,
/// returning `(resolved images, declared images, time spent)`
fn resolve_images(animation: &Animation, images: Option<&dyn ImageProvider>) -> (usize, usize, Duration) {
    let start = Instant::now();
    let mut resolved = 0;
    let mut total = 0;
    for asset in animation.image_assets() {
        total += 1;
        let image = images.and_then(|images| images.image_for_asset(&asset));
        if let Some(image) = image {
            // encoded images are decoded now, like the renderer would
            if image.decoded().is_ok() {
                resolved += 1;
            }
        }
    }
    (resolved, total, start.elapsed())
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::{fixtures, image_cache, package};
    use std::sync::mpsc;

    fn sub_item(animation: Option<Arc<Animation>>, images: Option<Arc<dyn ImageProvider>>) -> SubItem {
        SubItem { tag: LayerTag::new(0, 0), animation, images }
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn images_are_resolved_in_every_mode() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fixtures::write_sub_package(dir.path(), "raster", &["img_0.png", "img_1.png"]);
        let package_dir = dir.path().join("raster");
        let animation = Animation::from_file(&package_dir.join(package::ANIMATION_FILE)).expect("valid definition");
        for (pre_cache, pre_decode) in [(false, false), (true, false), (true, true)] {
            let images = image_cache::build_image_provider(&package_dir, pre_cache, pre_decode);
            let (resolved, total, _elapsed) = resolve_images(&animation, images.as_deref());
            assert_eq!((resolved, total), (2, 2), "pre_cache={}, pre_decode={}", pre_cache, pre_decode);
        }
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn layers_complete_after_playing() {
        let worker_pool = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build the tokio runtime");
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fixtures::write_sub_package(dir.path(), "vector", &[]);
        let animation = Animation::from_file(&dir.path().join("vector").join(package::ANIMATION_FILE)).expect("valid definition");
        let mut surface = ConsoleSurface::new(worker_pool.handle().clone(), 0.0);
        let view = ViewId::next();

        let (sender, receiver) = mpsc::channel();
        for layer_animation in [Some(Arc::new(animation)), None] {
            let mut layer = surface.create_layer(view, &sub_item(layer_animation, None));
            assert!(layer.hidden);
            layer.set_hidden(false);
            let sender = sender.clone();
            layer.play(3, Box::new(move || sender.send(()).expect("test is waiting")));
            receiver.recv_timeout(Duration::from_secs(5)).expect("layer should have completed");
            surface.remove_layer(view, layer);
        }
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn play_duration_scales() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fixtures::write_sub_package(dir.path(), "vector", &[]);
        let animation = Animation::from_file(&dir.path().join("vector").join(package::ANIMATION_FILE)).expect("valid definition");
        let worker_pool = tokio::runtime::Builder::new_current_thread().build().expect("failed to build the tokio runtime");
        let mut surface = ConsoleSurface::new(worker_pool.handle().clone(), 0.5);
        let layer = surface.create_layer(ViewId::next(), &sub_item(Some(Arc::new(animation)), None));
        // fixtures animations last 1s
        assert_eq!(layer.play_duration(3), Duration::from_millis(1500));
        let silent = surface.create_layer(ViewId::next(), &sub_item(None, None));
        assert_eq!(silent.play_duration(3), Duration::ZERO);
    }
}
