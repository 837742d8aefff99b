//! The animation handle: the part of a Lottie `data.json` this crate cares about.\
//! Shapes, layers & keyframes stay opaque -- they belong to the rendering library.

use super::error::PlayerError;
use std::{
    fs,
    path::Path,
    time::Duration,
};
use serde::Deserialize;


#[derive(Debug, Clone, Deserialize)]
pub struct Animation {
    #[serde(rename = "v", default)]
    pub version:    Option<String>,
    #[serde(rename = "nm", default)]
    pub name:       Option<String>,
    #[serde(rename = "fr")]
    pub frame_rate: f64,
    #[serde(rename = "ip")]
    pub in_point:   f64,
    #[serde(rename = "op")]
    pub out_point:  f64,
    #[serde(rename = "w")]
    pub width:      u32,
    #[serde(rename = "h")]
    pub height:     u32,
    #[serde(default)]
    pub assets:     Vec<AssetDefinition>,
}

/// An entry of `assets`: either an image or a precomposition (which carries `layers`)
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDefinition {
    #[serde(default)]
    pub id:        serde_json::Value,
    #[serde(rename = "w", default)]
    pub width:     Option<u32>,
    #[serde(rename = "h", default)]
    pub height:    Option<u32>,
    /// directory, relative to the package, where `file_name` lives
    #[serde(rename = "u", default)]
    pub directory: Option<String>,
    #[serde(rename = "p", default)]
    pub file_name: Option<String>,
    /// 1 if `file_name` holds an embedded `data:` URI
    #[serde(rename = "e", default)]
    pub embedded:  Option<u8>,
    #[serde(default)]
    pub layers:    Option<serde_json::Value>,
}

/// An image referenced by an animation, as the image providers see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub id:        String,
    /// the file name -- key for cached images
    pub name:      String,
    pub directory: String,
    pub width:     u32,
    pub height:    u32,
}

impl Animation {

    /// loads `data.json` from `path`
    pub fn from_file(path: &Path) -> Result<Self, PlayerError> {
        let contents = fs::read(path)
            .map_err(|err| PlayerError::from_read(path.to_path_buf(), err, |path| PlayerError::MissingAnimationDefinition { path }))?;
        serde_json::from_slice(&contents)
            .map_err(|err| PlayerError::MalformedAnimationDefinition { path: path.to_path_buf(), source: err })
    }

    /// how long a single loop lasts
    pub fn duration(&self) -> Duration {
        let frames = self.out_point - self.in_point;
        if self.frame_rate > 0.0 && frames > 0.0 {
            Duration::from_secs_f64(frames / self.frame_rate)
        } else {
            Duration::ZERO
        }
    }

    /// the file-backed image assets -- precompositions and embedded images are left out
    pub fn image_assets(&self) -> impl Iterator<Item = ImageAsset> + '_ {
        self.assets.iter()
            .filter(|asset| asset.layers.is_none() && asset.embedded != Some(1))
            .filter_map(|asset| {
                let name = asset.file_name.as_ref()?;
                Some(ImageAsset {
                    id:        match &asset.id {
                                   serde_json::Value::String(id) => id.clone(),
                                   other                         => other.to_string(),
                               },
                    name:      name.clone(),
                    directory: asset.directory.clone().unwrap_or_default(),
                    width:     asset.width.unwrap_or(0),
                    height:    asset.height.unwrap_or(0),
                })
            })
    }

    /// a name fit for logs
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"{
        "v": "5.7.1", "nm": "fire", "fr": 25, "ip": 0, "op": 50, "w": 750, "h": 1334, "ddd": 0,
        "assets": [
            {"id": "image_0", "w": 200, "h": 100, "u": "images/", "p": "img_0.png", "e": 0},
            {"id": "comp_0", "layers": []},
            {"id": "image_1", "w": 10, "h": 10, "u": "", "p": "data:image/png;base64,AAAA", "e": 1}
        ],
        "layers": []
    }"#;

    #[cfg_attr(not(feature = "dox"), test)]
    fn parses_timing_and_image_assets() {
        let animation: Animation = serde_json::from_str(DEFINITION).expect("valid definition");
        assert_eq!(animation.display_name(), "fire");
        assert_eq!(animation.duration(), Duration::from_secs(2));
        let assets: Vec<ImageAsset> = animation.image_assets().collect();
        assert_eq!(assets, vec![ImageAsset {
            id:        "image_0".to_string(),
            name:      "img_0.png".to_string(),
            directory: "images/".to_string(),
            width:     200,
            height:    100,
        }]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn degenerate_timing_lasts_nothing() {
        let animation: Animation = serde_json::from_str(r#"{"fr": 0, "ip": 0, "op": 10, "w": 1, "h": 1}"#).expect("valid definition");
        assert_eq!(animation.duration(), Duration::ZERO);
        let animation: Animation = serde_json::from_str(r#"{"fr": 30, "ip": 10, "op": 10, "w": 1, "h": 1}"#).expect("valid definition");
        assert_eq!(animation.duration(), Duration::ZERO);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn file_errors_are_classified() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let missing = dir.path().join("data.json");
        assert!(matches!(Animation::from_file(&missing), Err(PlayerError::MissingAnimationDefinition { .. })));
        fs::write(&missing, "{ not json").expect("failed to write definition");
        assert!(matches!(Animation::from_file(&missing), Err(PlayerError::MalformedAnimationDefinition { .. })));
    }
}
