//! Package trees & a recording presentation surface shared by the player's tests

use super::{
    model::{LayerTag, SubItem, ViewId},
    package::{ANIMATION_FILE, IMAGES_DIR, MANIFEST_FILE},
    presentation::{CompletionCallback, PlayableLayer, PresentationSurface},
};
use std::{
    fs,
    path::Path,
    sync::Arc,
};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;


#[ctor::ctor]
fn suite_setup() {
    // another suite may have installed the logger already
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

/// writes a `width`x`height` semi-transparent PNG at `path`, creating its parent directories
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create the image's directory");
    }
    RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 128]))
        .save(path)
        .expect("failed to write PNG");
}

/// writes `<root>/<name>/data.json` (one second long) referencing `images`, which are also written
/// to `<root>/<name>/images/`
pub fn write_sub_package(root: &Path, name: &str, images: &[&str]) {
    let package_dir = root.join(name);
    fs::create_dir_all(&package_dir).expect("failed to create sub-package dir");
    let assets: Vec<serde_json::Value> = images.iter().enumerate()
        .map(|(i, image)| serde_json::json!({"id": format!("image_{}", i), "w": 2, "h": 2, "u": "images/", "p": image, "e": 0}))
        .collect();
    let definition = serde_json::json!({
        "v": "5.7.1", "nm": name, "fr": 30, "ip": 0, "op": 30, "w": 100, "h": 100,
        "assets": assets,
        "layers": [],
    });
    fs::write(package_dir.join(ANIMATION_FILE), definition.to_string()).expect("failed to write data.json");
    for image in images {
        write_png(&package_dir.join(IMAGES_DIR).join(image), 2, 2);
    }
}

/// writes `<root>/package.json` listing `package_names`, in order
pub fn write_manifest(root: &Path, package_names: &[&str]) {
    fs::create_dir_all(root).expect("failed to create animation root");
    let list: Vec<serde_json::Value> = package_names.iter()
        .map(|name| serde_json::json!({"packageName": name, "x": 0, "y": 0}))
        .collect();
    let manifest = serde_json::json!({"list": list, "totalTime": 1000});
    fs::write(root.join(MANIFEST_FILE), manifest.to_string()).expect("failed to write package.json");
}

/// writes a complete animation root at `<root>/<animation>` with one vector-only sub-package per name in `package_names`
pub fn write_animation(root: &Path, animation: &str, package_names: &[&str]) -> std::path::PathBuf {
    let animation_root = root.join(animation);
    write_manifest(&animation_root, package_names);
    for name in package_names {
        write_sub_package(&animation_root, name, &[]);
    }
    animation_root
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Attach(ViewId),
    Detach(ViewId),
    Create(LayerTag),
    Show(LayerTag),
    Hide(LayerTag),
    Play(LayerTag, u32),
    Remove(LayerTag),
}

/// A [PresentationSurface] that only records what was asked of it.\
/// Its layers complete as soon as they are played -- unless built with [RecordingSurface::holding_completions()].
pub struct RecordingSurface {
    events:        Arc<Mutex<Vec<SurfaceEvent>>>,
    complete_play: bool,
}

pub struct RecordingLayer {
    tag:           LayerTag,
    events:        Arc<Mutex<Vec<SurfaceEvent>>>,
    complete_play: bool,
    held:          Option<CompletionCallback>,
}

impl RecordingSurface {

    pub fn new() -> Self {
        Self { events: Arc::new(Mutex::new(Vec::new())), complete_play: true }
    }

    /// layers of this surface never complete
    pub fn holding_completions() -> Self {
        Self { complete_play: false, ..Self::new() }
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SurfaceEvent>>> {
        Arc::clone(&self.events)
    }
}

impl PresentationSurface for RecordingSurface {
    type Layer = RecordingLayer;

    fn attach_view(&mut self, view: ViewId) {
        self.events.lock().push(SurfaceEvent::Attach(view));
    }

    fn detach_view(&mut self, view: ViewId) {
        self.events.lock().push(SurfaceEvent::Detach(view));
    }

    fn create_layer(&mut self, _view: ViewId, sub_item: &SubItem) -> RecordingLayer {
        self.events.lock().push(SurfaceEvent::Create(sub_item.tag));
        RecordingLayer { tag: sub_item.tag, events: Arc::clone(&self.events), complete_play: self.complete_play, held: None }
    }

    fn remove_layer(&mut self, _view: ViewId, layer: RecordingLayer) {
        self.events.lock().push(SurfaceEvent::Remove(layer.tag));
    }
}

impl PlayableLayer for RecordingLayer {

    fn set_hidden(&mut self, hidden: bool) {
        let event = if hidden { SurfaceEvent::Hide(self.tag) } else { SurfaceEvent::Show(self.tag) };
        self.events.lock().push(event);
    }

    fn play(&mut self, loop_count: u32, on_complete: CompletionCallback) {
        self.events.lock().push(SurfaceEvent::Play(self.tag, loop_count));
        if self.complete_play {
            on_complete();
        } else {
            self.held = Some(on_complete);
        }
    }
}
