//! Image providers for the animation layers: either a lazy, file-backed one or an in-memory
//! cache built upfront, in the worker pool, from every file of a package's `images` directory.
//!
//! When asked to pre-decode, images are drawn into a uniform 32-bit BGRA buffer here, so the
//! presentation thread never pays for decoding.

use super::{
    animation::ImageAsset,
    error::PlayerError,
    package::IMAGES_DIR,
};
use std::{
    collections::HashMap,
    fmt,
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};
use image::{DynamicImage, ImageFormat, ImageReader};
use rgb::alt::BGRA8;
use walkdir::WalkDir;
use log::{debug, trace, warn};


/// Resolves the images an animation asks for -- shared read-only by every layer of a package
pub trait ImageProvider: Send + Sync + fmt::Debug {
    fn image_for_asset(&self, asset: &ImageAsset) -> Option<AssetImage>;
}

/// An image ready to be handed to the renderer
#[derive(Debug, Clone)]
pub enum AssetImage {
    /// read from disk, but still to be decoded
    Encoded(Arc<EncodedImage>),
    /// pixels already materialized
    Decoded(Arc<DecodedImage>),
}

impl AssetImage {

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AssetImage::Encoded(encoded) => (encoded.width, encoded.height),
            AssetImage::Decoded(decoded) => (decoded.width, decoded.height),
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, AssetImage::Decoded(_))
    }

    /// the pixels of this image, decoding them now if needed
    pub fn decoded(&self) -> Result<Arc<DecodedImage>, PlayerError> {
        match self {
            AssetImage::Encoded(encoded) => encoded.decode().map(Arc::new),
            AssetImage::Decoded(decoded) => Ok(Arc::clone(decoded)),
        }
    }
}

/// The raw contents of an image file, with its header already validated
pub struct EncodedImage {
    pub path:   PathBuf,
    pub format: ImageFormat,
    pub width:  u32,
    pub height: u32,
    bytes:      Vec<u8>,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl EncodedImage {

    pub fn load(path: &Path) -> Result<Self, PlayerError> {
        let bytes = fs::read(path)
            .map_err(|err| PlayerError::Io { path: path.to_path_buf(), source: err })?;
        let format = image::guess_format(&bytes)
            .map_err(|err| PlayerError::ImageLoad { path: path.to_path_buf(), source: err })?;
        let (width, height) = ImageReader::with_format(Cursor::new(bytes.as_slice()), format)
            .into_dimensions()
            .map_err(|err| PlayerError::ImageLoad { path: path.to_path_buf(), source: err })?;
        Ok(Self { path: path.to_path_buf(), format, width, height, bytes })
    }

    pub fn decode(&self) -> Result<DecodedImage, PlayerError> {
        let source = image::load_from_memory_with_format(&self.bytes, self.format)
            .map_err(|err| PlayerError::ImageLoad { path: self.path.clone(), source: err })?;
        Ok(decode_image(&source))
    }
}

/// How the alpha byte of each [DecodedImage] pixel should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// colour channels are already multiplied by alpha
    PremultipliedFirst,
    /// opaque: the alpha byte is always 0xFF and should be ignored
    NoneSkipFirst,
}

/// A fully materialized bitmap: 32-bit little-endian BGRA pixels, row-major
#[derive(Clone, PartialEq)]
pub struct DecodedImage {
    pub width:  u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: Vec<BGRA8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecodedImage {{ {}x{}, {:?} }}", self.width, self.height, self.layout)
    }
}

/// draws `source` into an equal-size BGRA bitmap -- premultiplied if the source carries alpha,
/// opaque (alpha skipped) otherwise
pub fn decode_image(source: &DynamicImage) -> DecodedImage {
    let layout = if source.color().has_alpha() {
        PixelLayout::PremultipliedFirst
    } else {
        PixelLayout::NoneSkipFirst
    };
    let rgba = source.to_rgba8();
    let pixels = rgba.pixels()
        .map(|pixel| {
            let [r, g, b, a] = pixel.0;
            match layout {
                PixelLayout::PremultipliedFirst => BGRA8 { b: premultiply(b, a), g: premultiply(g, a), r: premultiply(r, a), a },
                PixelLayout::NoneSkipFirst      => BGRA8 { b, g, r, a: 0xFF },
            }
        })
        .collect();
    DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        layout,
        pixels,
    }
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16 + 127) / 255) as u8
}


/// Images of a package, keyed by their path relative to `images/`
#[derive(Debug, Default)]
pub struct CacheImageProvider {
    images: HashMap<String, AssetImage>,
}

impl CacheImageProvider {

    pub fn new(images: HashMap<String, AssetImage>) -> Self {
        Self { images }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AssetImage> {
        self.images.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageProvider for CacheImageProvider {
    fn image_for_asset(&self, asset: &ImageAsset) -> Option<AssetImage> {
        self.images.get(&asset.name).cloned()
    }
}

/// Reads & decodes images from the package directory only when they are asked for
#[derive(Debug)]
pub struct FilepathImageProvider {
    package_dir: PathBuf,
}

impl FilepathImageProvider {

    pub fn new(package_dir: impl Into<PathBuf>) -> Self {
        Self { package_dir: package_dir.into() }
    }

    fn locate(&self, asset: &ImageAsset) -> Option<PathBuf> {
        [
            self.package_dir.join(&asset.directory).join(&asset.name),
            self.package_dir.join(IMAGES_DIR).join(&asset.name),
        ].into_iter()
            .find(|candidate| candidate.is_file())
    }
}

impl ImageProvider for FilepathImageProvider {
    fn image_for_asset(&self, asset: &ImageAsset) -> Option<AssetImage> {
        let path = self.locate(asset)?;
        EncodedImage::load(&path)
            .and_then(|encoded| encoded.decode())
            .map(|decoded| AssetImage::Decoded(Arc::new(decoded)))
            .map_err(|err| debug!("FilepathImageProvider: asset '{}' unavailable: {}", asset.name, err))
            .ok()
    }
}


/// Returns the image provider for the package at `package_dir` -- `None` if it has no `images` directory:
///   - `pre_cache == false`: a [FilepathImageProvider], which reads nothing upfront;
///   - `pre_cache == true`: a [CacheImageProvider] holding every image, decoded if `pre_decode`.
///     If any single image fails to load, the whole cache of that package is left empty.
///     If the directory can't even be listed, we fall back to a [FilepathImageProvider].
pub fn build_image_provider(package_dir: &Path, pre_cache: bool, pre_decode: bool) -> Option<Arc<dyn ImageProvider>> {
    let images_dir = package_dir.join(IMAGES_DIR);
    if !images_dir.is_dir() {
        return None
    }
    if !pre_cache {
        return Some(Arc::new(FilepathImageProvider::new(package_dir)))
    }
    let file_names = match list_images(&images_dir) {
        Ok(file_names) => file_names,
        Err(err) => {
            warn!("Image cache for '{}' not built: {} -- images will be read on demand", package_dir.display(), err);
            return Some(Arc::new(FilepathImageProvider::new(package_dir)))
        }
    };
    match build_image_cache(&images_dir, &file_names, pre_decode) {
        Ok(cache) if cache.is_empty() => {
            debug!("Image cache for '{}': the images directory holds no files", package_dir.display());
            Some(Arc::new(cache))
        },
        Ok(cache) => {
            debug!("Image cache for '{}': {} image(s), pre-decoded: {}", package_dir.display(), cache.len(), pre_decode);
            Some(Arc::new(cache))
        },
        Err(err) => {
            warn!("Image cache for '{}' discarded: {}", package_dir.display(), err);
            Some(Arc::new(CacheImageProvider::empty()))
        },
    }
}

/// every file under `images_dir`, as `/`-separated paths relative to it, sorted
fn list_images(images_dir: &Path) -> Result<Vec<String>, PlayerError> {
    let mut file_names = Vec::new();
    for entry in WalkDir::new(images_dir).min_depth(1).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = entry
            .map_err(|err| PlayerError::ImageEnumeration { path: images_dir.to_path_buf(), source: err })?;
        if !entry.file_type().is_file() {
            continue
        }
        if let Ok(relative) = entry.path().strip_prefix(images_dir) {
            let name = relative.components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            file_names.push(name);
        }
    }
    Ok(file_names)
}

fn build_image_cache(images_dir: &Path, file_names: &[String], pre_decode: bool) -> Result<CacheImageProvider, PlayerError> {
    let mut images = HashMap::with_capacity(file_names.len());
    for file_name in file_names {
        let encoded = EncodedImage::load(&images_dir.join(file_name))?;
        let image = if pre_decode {
            AssetImage::Decoded(Arc::new(encoded.decode()?))
        } else {
            AssetImage::Encoded(Arc::new(encoded))
        };
        trace!("cached '{}' ({}x{})", file_name, image.dimensions().0, image.dimensions().1);
        images.insert(file_name.clone(), image);
    }
    Ok(CacheImageProvider::new(images))
}


#[cfg(any(test, feature = "dox"))]
mod tests {
    use super::*;
    use crate::player::fixtures;
    use image::{Rgba, RgbaImage, Rgb, RgbImage};

    fn asset(name: &str) -> ImageAsset {
        ImageAsset {
            id:        "image_0".to_string(),
            name:      name.to_string(),
            directory: "images/".to_string(),
            width:     2,
            height:    2,
        }
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn decode_premultiplies_translucent_images() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 1, Rgba([200, 100, 50, 128])));
        let decoded = decode_image(&source);
        assert_eq!(decoded.layout, PixelLayout::PremultipliedFirst);
        assert_eq!((decoded.width, decoded.height), (2, 1));
        assert_eq!(decoded.pixels, vec![BGRA8 { b: 25, g: 50, r: 100, a: 128 }; 2]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn decode_skips_alpha_of_opaque_images() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 3, Rgb([1, 2, 3])));
        let decoded = decode_image(&source);
        assert_eq!(decoded.layout, PixelLayout::NoneSkipFirst);
        assert_eq!(decoded.pixels, vec![BGRA8 { b: 3, g: 2, r: 1, a: 0xFF }; 3]);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn no_images_directory_means_no_provider() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        assert!(build_image_provider(dir.path(), true, true).is_none());
        assert!(build_image_provider(dir.path(), false, false).is_none());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn lazy_provider_reads_on_demand() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let images_dir = dir.path().join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).expect("failed to create images dir");
        let provider = build_image_provider(dir.path(), false, false).expect("images dir exists");
        // written after the provider was built: nothing was read upfront
        fixtures::write_png(&images_dir.join("img_0.png"), 2, 2);
        let image = provider.image_for_asset(&asset("img_0.png")).expect("image should be resolved from disk");
        assert!(image.is_decoded());
        assert_eq!(image.dimensions(), (2, 2));
        assert!(provider.image_for_asset(&asset("img_1.png")).is_none());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn pre_decoded_cache_holds_every_image() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let images_dir = dir.path().join(IMAGES_DIR);
        fixtures::write_png(&images_dir.join("img_0.png"), 2, 2);
        fixtures::write_png(&images_dir.join("img_1.png"), 3, 1);
        fixtures::write_png(&images_dir.join("nested").join("img_2.png"), 1, 1);
        let images = build_image_cache(&images_dir, &list_images(&images_dir).expect("listable"), true).expect("all images are valid");
        let mut names: Vec<&str> = images.names().collect();
        names.sort();
        assert_eq!(names, vec!["img_0.png", "img_1.png", "nested/img_2.png"]);
        assert!(images.get("img_1.png").map(AssetImage::is_decoded).unwrap_or(false));
        assert_eq!(images.get("img_1.png").map(AssetImage::dimensions), Some((3, 1)));
        // served through the provider interface as well
        let provider = build_image_provider(dir.path(), true, true).expect("images dir exists");
        assert!(provider.image_for_asset(&asset("img_0.png")).is_some());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn cached_images_may_stay_encoded() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let images_dir = dir.path().join(IMAGES_DIR);
        fixtures::write_png(&images_dir.join("img_0.png"), 4, 2);
        let images = build_image_cache(&images_dir, &list_images(&images_dir).expect("listable"), false).expect("all images are valid");
        let image = images.get("img_0.png").expect("image should be cached");
        assert!(!image.is_decoded());
        let decoded = image.decoded().expect("lazy decoding should work");
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.pixels.len(), 8);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn a_single_bad_image_empties_the_package_cache() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let images_dir = dir.path().join(IMAGES_DIR);
        fixtures::write_png(&images_dir.join("img_0.png"), 2, 2);
        fs::write(images_dir.join("img_1.png"), b"definitely not a png").expect("failed to write bogus image");
        fixtures::write_png(&images_dir.join("img_2.png"), 2, 2);
        assert!(matches!(build_image_cache(&images_dir, &list_images(&images_dir).expect("listable"), true), Err(PlayerError::ImageLoad { .. })));
        let provider = build_image_provider(dir.path(), true, true).expect("images dir exists");
        assert!(provider.image_for_asset(&asset("img_0.png")).is_none());
        assert!(provider.image_for_asset(&asset("img_2.png")).is_none());
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn encoded_images_come_from_a_single_read() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let path = dir.path().join("img_0.png");
        fixtures::write_png(&path, 5, 3);
        let encoded = EncodedImage::load(&path).expect("valid image");
        fs::remove_file(&path).expect("failed to remove image");
        assert_eq!(encoded.format, ImageFormat::Png);
        assert_eq!((encoded.width, encoded.height), (5, 3));
        let decoded = encoded.decode().expect("decoded from the bytes read at load time");
        assert_eq!(decoded.pixels.len(), 15);
    }

    #[cfg_attr(not(feature = "dox"), test)]
    fn empty_images_directory_gives_an_empty_cache() {
        let dir = tempfile::tempdir().expect("failed to create temp directory");
        let images_dir = dir.path().join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).expect("failed to create images dir");
        let images = build_image_cache(&images_dir, &list_images(&images_dir).expect("listable"), true).expect("nothing to fail");
        assert!(images.is_empty());
        assert!(build_image_provider(dir.path(), true, true).is_some());
    }
}
