//! Animation packages on disk:
//! ```text
//!   <animation root>/package.json            -- the manifest, listing the sub-packages
//!   <animation root>/<packageName>/data.json -- the Lottie animation definition
//!   <animation root>/<packageName>/images/   -- optional raster assets
//! ```

use super::{
    animation::Animation,
    error::PlayerError,
    image_cache::{self, ImageProvider},
};
use std::{
    fs,
    path::Path,
    sync::Arc,
    time::Duration,
};
use serde::Deserialize;
use log::warn;


pub const MANIFEST_FILE:  &str = "package.json";
pub const ANIMATION_FILE: &str = "data.json";
pub const IMAGES_DIR:     &str = "images";


/// The contents of `package.json` -- fields other than the ones bellow are layout info we don't use
#[derive(Debug, Deserialize)]
pub struct PackageManifest {
    pub list: Vec<SubPackageDescriptor>,
    #[serde(rename = "totalTime", default)]
    total_time: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SubPackageDescriptor {
    #[serde(rename = "packageName", default)]
    package_name: Option<serde_json::Value>,
}

impl SubPackageDescriptor {
    /// the sub-package directory name -- `None` if absent or not a string
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_ref()
            .and_then(serde_json::Value::as_str)
    }
}

impl PackageManifest {

    /// reads `<animation_root>/package.json`
    pub fn load(animation_root: &Path) -> Result<Self, PlayerError> {
        let path = animation_root.join(MANIFEST_FILE);
        let contents = fs::read(&path)
            .map_err(|err| PlayerError::from_read(path.clone(), err, |path| PlayerError::MissingManifest { path }))?;
        serde_json::from_slice(&contents)
            .map_err(|err| PlayerError::MalformedManifest { path, source: err })
    }

    /// the overall length of the animation, as declared by the manifest (in milliseconds, there)
    pub fn total_time(&self) -> Option<Duration> {
        self.total_time.as_ref()
            .and_then(serde_json::Value::as_f64)
            .filter(|millis| *millis >= 0.0)
            .map(|millis| Duration::from_secs_f64(millis / 1000.0))
    }
}

/// What a sub-package directory turns into: the pieces needed to build one layer
#[derive(Debug)]
pub struct LoadedPackage {
    pub animation: Option<Arc<Animation>>,
    pub images:    Option<Arc<dyn ImageProvider>>,
}

/// Loads the sub-package at `package_dir`, which must exist and hold a `data.json`.\
/// An unparsable `data.json` still yields a (silent) layer, like the renderer would do.
pub fn load_sub_package(package_dir: &Path, pre_cache: bool, pre_decode: bool) -> Result<LoadedPackage, PlayerError> {
    if !package_dir.is_dir() {
        return Err(PlayerError::MissingSubPackage { path: package_dir.to_path_buf() })
    }
    let animation_file = package_dir.join(ANIMATION_FILE);
    if !animation_file.is_file() {
        return Err(PlayerError::MissingAnimationDefinition { path: animation_file })
    }
    let animation = Animation::from_file(&animation_file)
        .map_err(|err| warn!("Sub-package '{}' will play nothing: {}", package_dir.display(), err))
        .ok()
        .map(Arc::new);
    let images = image_cache::build_image_provider(package_dir, pre_cache, pre_decode);
    Ok(LoadedPackage { animation, images })
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::fixtures;

    #[cfg_attr(not(feature = "dox"), test)]
    fn manifest_ignores_unknown_fields() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fs::write(dir.path().join(MANIFEST_FILE), r#"{
            "list": [
                {"packageName": "fire", "x": 0, "y": 120, "scale": 1.5},
                {"packageName": 42},
                {}
            ],
            "totalTime": 6500,
            "version": 3
        }"#).expect("failed to write manifest");
        let manifest = PackageManifest::load(dir.path()).expect("manifest should parse");
        let names: Vec<Option<&str>> = manifest.list.iter().map(SubPackageDescriptor::package_name).collect();
        assert_eq!(names, vec![Some("fire"), None, None]);
        assert_eq!(manifest.total_time(), Some(Duration::from_millis(6500)));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn manifest_errors_are_classified() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        assert!(matches!(PackageManifest::load(dir.path()), Err(PlayerError::MissingManifest { .. })));
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"totalTime": 10}"#).expect("failed to write manifest");
        assert!(matches!(PackageManifest::load(dir.path()), Err(PlayerError::MalformedManifest { .. })));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn sub_package_requires_its_animation_definition() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let missing = dir.path().join("nowhere");
        assert!(matches!(load_sub_package(&missing, true, true), Err(PlayerError::MissingSubPackage { .. })));
        fs::create_dir_all(&missing).expect("failed to create package dir");
        assert!(matches!(load_sub_package(&missing, true, true), Err(PlayerError::MissingAnimationDefinition { .. })));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn vector_only_sub_package_has_no_image_provider() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fixtures::write_sub_package(dir.path(), "vector", &[]);
        let loaded = load_sub_package(&dir.path().join("vector"), true, true).expect("sub-package should load");
        assert!(loaded.animation.is_some());
        assert!(loaded.images.is_none());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn raster_sub_package_gets_its_images() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        fixtures::write_sub_package(dir.path(), "raster", &["img_0.png", "img_1.png"]);
        let loaded = load_sub_package(&dir.path().join("raster"), true, true).expect("sub-package should load");
        let animation = loaded.animation.expect("data.json is valid");
        let images = loaded.images.expect("images dir exists");
        assert!(animation.image_assets().all(|asset| images.image_for_asset(&asset).is_some()));
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn broken_definition_still_makes_a_layer() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let package_dir = dir.path().join("broken");
        fs::create_dir_all(&package_dir).expect("failed to create package dir");
        fs::write(package_dir.join(ANIMATION_FILE), "[]").expect("failed to write definition");
        let loaded = load_sub_package(&package_dir, false, false).expect("sub-package should load");
        assert!(loaded.animation.is_none());
    }
}
