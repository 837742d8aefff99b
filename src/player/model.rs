//! Data shared between the preparer (worker pool) and the sequencer (presentation thread)

use super::{
    animation::Animation,
    image_cache::ImageProvider,
};
use std::{
    fmt,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use serde::{Serialize, Deserialize};
use strum::{EnumString, AsRefStr, EnumVariantNames};


/// One deduplicated animation request: a single source path, possibly requested several times
#[derive(Debug, Clone)]
pub struct AnimationItem {
    /// the animation root -- the directory holding `package.json`
    pub path: PathBuf,
    /// position of the first occurrence of `path` amongst the distinct requested paths
    pub index: usize,
    /// how many times `path` was requested -- always >= 1. Becomes the loop count of every layer
    pub repeat_count: u32,
    /// the layers declared in the manifest, in manifest order
    pub sub_items: Vec<SubItem>,
}

impl AnimationItem {

    pub fn new(path: PathBuf, index: usize) -> Self {
        Self {
            path,
            index,
            repeat_count: 1,
            sub_items: Vec::new(),
        }
    }

    /// a copy of this item without any layers -- what is left of it when loading fails
    pub fn without_sub_items(&self) -> Self {
        Self {
            path:         self.path.clone(),
            index:        self.index,
            repeat_count: self.repeat_count,
            sub_items:    Vec::new(),
        }
    }
}

/// One playable layer of an [AnimationItem]
#[derive(Debug, Clone)]
pub struct SubItem {
    pub tag:       LayerTag,
    /// `None` when `data.json` exists but could not be understood
    pub animation: Option<Arc<Animation>>,
    /// `None` for vector-only packages (no `images` directory)
    pub images:    Option<Arc<dyn ImageProvider>>,
}

/// Identifies a layer within one view: `(item index, position in the item's manifest)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerTag {
    pub item:     usize,
    pub position: usize,
}

impl LayerTag {
    pub fn new(item: usize, position: usize) -> Self {
        Self { item, position }
    }
}

impl fmt::Display for LayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.item, self.position)
    }
}

/// Identifies one request's group of layers on a [super::Stage]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

impl ViewId {
    pub fn next() -> Self {
        Self(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Tells workers & callbacks whether the view they serve is still attached.\
/// Once disposed, it never comes back to life.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {

    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn dispose(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// How images of each sub-package should be prepared
#[derive(Debug,PartialEq,Clone,Copy,Serialize,Deserialize,EnumString,AsRefStr,EnumVariantNames)]
#[strum(serialize_all = "kebab-case")]
pub enum PlayMode {
    /// No upfront work: images are read (and decoded) from disk when the renderer asks for them
    Origin,
    /// Every image is read upfront, leaving the pixel decoding to the renderer
    Cached,
    /// Every image is read and decoded upfront, in the worker pool
    CachedDecoded,
}

impl PlayMode {
    pub fn pre_cache(&self) -> bool {
        !matches!(self, PlayMode::Origin)
    }
    pub fn pre_decode(&self) -> bool {
        matches!(self, PlayMode::CachedDecoded)
    }
}

/// What to do with the remaining sub-packages of an item once one of them fails to load
#[derive(Debug,PartialEq,Clone,Copy,Serialize,Deserialize)]
pub enum SubPackageFailurePolicy {
    /// Keep the layers loaded so far and ignore the rest of the manifest
    AbandonItem,
    /// Skip only the failed sub-package
    SkipPackage,
}

/// Options for a single [super::prepare_and_play()] request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub pre_cache:           bool,
    pub pre_decode:          bool,
    pub sub_package_failure: SubPackageFailurePolicy,
}

impl PlayOptions {
    pub fn for_mode(mode: PlayMode) -> Self {
        Self {
            pre_cache:           mode.pre_cache(),
            pre_decode:          mode.pre_decode(),
            sub_package_failure: SubPackageFailurePolicy::AbandonItem,
        }
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self::for_mode(PlayMode::CachedDecoded)
    }
}
