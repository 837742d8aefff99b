//! Turns a request -- a list of animation roots, possibly repeated -- into prepared [AnimationItem]s:
//!   1. [deduplicate()] coalesces repeated paths, counting repetitions;
//!   2. [prepare()] loads every item in parallel on the worker pool. Each worker handles a single item,
//!      reading its manifest & sub-packages in order and registering each resulting layer on the
//!      presentation thread before moving on to the next sub-package.

use super::{
    error::PlayerError,
    model::{AnimationItem, LayerTag, PlayOptions, SubItem, SubPackageFailurePolicy},
    package::{self, PackageManifest},
};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};
use futures::{stream, StreamExt};
use par_stream::{
    prelude::*,
    {BufSize, NumWorkers, ParParamsConfig},
};
use log::{debug, trace, warn};


/// parallelism of [prepare()] -- one worker per CPU, with an input buffer enough for any reasonable request
pub const PAR_PARAMS: ParParamsConfig =
    ParParamsConfig::Manual { num_workers: NumWorkers::Default, buf_size: BufSize::Fixed(256) };


/// Receives the layers built by the workers
pub trait LayerRegistrar: Send + Sync + 'static {
    /// creates the (hidden) layer object for `sub_item`, returning only after it exists.\
    /// An `Err` means nobody is interested in the item anymore.
    fn register(&self, sub_item: &SubItem) -> Result<(), PlayerError>;
}

/// Coalesces repeated `paths`: the first occurrence of each distinct path gets the next sequence index,
/// further occurrences only increase its `repeat_count`
pub fn deduplicate(paths: impl IntoIterator<Item = PathBuf>) -> Vec<AnimationItem> {
    let mut items: Vec<AnimationItem> = Vec::new();
    let mut indexes = HashMap::<PathBuf, usize>::new();
    for path in paths {
        match indexes.get(&path) {
            Some(&index) => items[index].repeat_count += 1,
            None => {
                let index = items.len();
                indexes.insert(path.clone(), index);
                items.push(AnimationItem::new(path, index));
            },
        }
    }
    items
}

/// Loads `item`'s manifest & sub-packages, registering a layer for each one, in manifest order.\
/// Failures are logged and leave `item` with fewer (possibly zero) sub-items. Blocks on file IO.
pub fn load_item(mut item: AnimationItem, options: &PlayOptions, registrar: &dyn LayerRegistrar) -> AnimationItem {
    let manifest = match PackageManifest::load(&item.path) {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!("Animation #{} won't play: {}", item.index, err);
            return item
        },
    };
    if let Some(total_time) = manifest.total_time() {
        trace!("Animation #{} '{}' declares {} sub-package(s), lasting {:?}", item.index, item.path.display(), manifest.list.len(), total_time);
    }
    for (position, descriptor) in manifest.list.iter().enumerate() {
        let loaded = descriptor.package_name()
            .ok_or(PlayerError::MissingPackageName { position })
            .and_then(|package_name| package::load_sub_package(&item.path.join(package_name), options.pre_cache, options.pre_decode));
        let loaded = match (loaded, options.sub_package_failure) {
            (Ok(loaded), _) => loaded,
            (Err(err), SubPackageFailurePolicy::SkipPackage) => {
                warn!("Animation #{}: skipping sub-package #{}: {}", item.index, position, err);
                continue
            },
            (Err(err), SubPackageFailurePolicy::AbandonItem) => {
                warn!("Animation #{}: sub-package #{} failed, ignoring the remaining {}: {}",
                      item.index, position, manifest.list.len() - position - 1, err);
                break
            },
        };
        let sub_item = SubItem {
            tag:       LayerTag::new(item.index, position),
            animation: loaded.animation,
            images:    loaded.images,
        };
        if let Err(err) = registrar.register(&sub_item) {
            debug!("Animation #{}: stopped loading: {}", item.index, err);
            break
        }
        item.sub_items.push(sub_item);
    }
    item
}

/// Loads all `items` in parallel (see [load_item()]), returning them in sequence-index order.\
/// Must be awaited within the tokio runtime that will do the work.
pub async fn prepare(items: Vec<AnimationItem>, options: Arc<PlayOptions>, registrar: Arc<dyn LayerRegistrar>) -> Vec<AnimationItem> {
    let count = items.len();
    let mut slots: Vec<Option<AnimationItem>> = (0..count).map(|_| None).collect();
    let mut loaded_items = stream::iter(items.into_iter().enumerate())
        .par_then_unordered(PAR_PARAMS, move |(slot, item)| {
            let options = Arc::clone(&options);
            let registrar = Arc::clone(&registrar);
            async move {
                let fallback = item.without_sub_items();
                let loaded = tokio::task::spawn_blocking(move || load_item(item, &options, registrar.as_ref())).await
                    .unwrap_or_else(|err| {
                        warn!("Animation #{}: loader task failed: {}", fallback.index, err);
                        fallback
                    });
                (slot, loaded)
            }
        });
    while let Some((slot, item)) = loaded_items.next().await {
        slots[slot] = Some(item);
    }
    slots.into_iter().flatten().collect()
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::fixtures;
    use std::{
        collections::HashSet,
        path::Path,
    };
    use parking_lot::Mutex;

    /// records registered layers, failing after `capacity` of them
    struct CollectingRegistrar {
        registered: Mutex<Vec<LayerTag>>,
        capacity:   usize,
    }

    impl CollectingRegistrar {
        fn new() -> Self {
            Self::with_capacity(usize::MAX)
        }
        fn with_capacity(capacity: usize) -> Self {
            Self { registered: Mutex::new(Vec::new()), capacity }
        }
    }

    impl LayerRegistrar for CollectingRegistrar {
        fn register(&self, sub_item: &SubItem) -> Result<(), PlayerError> {
            let mut registered = self.registered.lock();
            if registered.len() >= self.capacity {
                return Err(PlayerError::ViewDisposed)
            }
            registered.push(sub_item.tag);
            Ok(())
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn deduplicate_counts_repetitions_in_first_seen_order() {
        let items = deduplicate(paths(&["A", "B", "A"]));
        let summary: Vec<(&Path, usize, u32)> = items.iter()
            .map(|item| (item.path.as_path(), item.index, item.repeat_count))
            .collect();
        assert_eq!(summary, vec![(Path::new("A"), 0, 2), (Path::new("B"), 1, 1)]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn deduplicate_preserves_the_request_size() {
        let request = paths(&["x", "y", "x", "z", "z", "z", "y", "w"]);
        let items = deduplicate(request.clone());
        assert_eq!(items.iter().map(|item| item.repeat_count as usize).sum::<usize>(), request.len());
        assert!(items.iter().enumerate().all(|(i, item)| item.index == i && item.repeat_count >= 1));
        assert_eq!(items.iter().map(|item| item.path.clone()).collect::<Vec<_>>(), paths(&["x", "y", "z", "w"]));
        assert!(deduplicate(Vec::new()).is_empty());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn missing_manifest_yields_an_empty_item() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let registrar = CollectingRegistrar::new();
        let item = load_item(AnimationItem::new(dir.path().join("nothing here"), 0), &PlayOptions::default(), &registrar);
        assert!(item.sub_items.is_empty());
        assert!(registrar.registered.lock().is_empty());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn sub_package_failure_policies() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let root = fixtures::write_animation(dir.path(), "anim", &["first", "second", "third"]);
        std::fs::remove_dir_all(root.join("second")).expect("failed to remove sub-package");

        let abandoning = PlayOptions::default();
        let item = load_item(AnimationItem::new(root.clone(), 3), &abandoning, &CollectingRegistrar::new());
        assert_eq!(item.sub_items.iter().map(|sub_item| sub_item.tag).collect::<Vec<_>>(), vec![LayerTag::new(3, 0)]);

        let skipping = PlayOptions { sub_package_failure: SubPackageFailurePolicy::SkipPackage, ..PlayOptions::default() };
        let item = load_item(AnimationItem::new(root, 3), &skipping, &CollectingRegistrar::new());
        assert_eq!(item.sub_items.iter().map(|sub_item| sub_item.tag).collect::<Vec<_>>(), vec![LayerTag::new(3, 0), LayerTag::new(3, 2)]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn loading_stops_when_registration_is_refused() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let root = fixtures::write_animation(dir.path(), "anim", &["a", "b", "c"]);
        let registrar = CollectingRegistrar::with_capacity(1);
        let item = load_item(AnimationItem::new(root, 0), &PlayOptions::default(), &registrar);
        assert_eq!(item.sub_items.len(), 1);
        assert_eq!(*registrar.registered.lock(), vec![LayerTag::new(0, 0)]);
    }

    #[cfg_attr(not(feature = "dox"), tokio::test(flavor = "multi_thread", worker_threads = 2))]
    async fn prepare_keeps_sequence_order_and_unique_tags() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let mut request = Vec::new();
        for i in 0..12 {
            let names: Vec<String> = (0..(i % 4)).map(|p| format!("part_{}", p)).collect();
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            request.push(fixtures::write_animation(dir.path(), &format!("anim_{}", i), &names));
        }
        request.push(dir.path().join("missing"));
        request.push(request[0].clone());

        let registrar = Arc::new(CollectingRegistrar::new());
        let items = prepare(deduplicate(request), Arc::new(PlayOptions::default()), Arc::clone(&registrar) as Arc<dyn LayerRegistrar>).await;

        assert_eq!(items.len(), 13);
        assert!(items.iter().enumerate().all(|(i, item)| item.index == i));
        assert_eq!(items[0].repeat_count, 2);
        assert!(items[12].sub_items.is_empty());
        let tags: Vec<LayerTag> = items.iter().flat_map(|item| item.sub_items.iter().map(|sub_item| sub_item.tag)).collect();
        assert_eq!(tags.len(), (0..12).map(|i| i % 4).sum::<usize>());
        assert_eq!(tags.iter().collect::<HashSet<_>>().len(), tags.len());
        assert_eq!(registrar.registered.lock().len(), tags.len());
    }
}
