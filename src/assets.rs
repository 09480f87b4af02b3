//! Decorative images looked up by name.
//!
//! A missing or undecodable image is never fatal: it is logged once at load time and
//! every draw that refers to it is skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{info, warn};
use thiserror::Error;

/// Observer picture drawn beside each projection axis.
pub const OBSERVER_IMAGE: &str = "observer.png";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("image {0} not found in asset directory or working directory")]
    NotFound(String),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub trait AssetProvider {
    fn image(&self, name: &str) -> Option<&RgbaImage>;

    fn image_size(&self, name: &str) -> Option<(u32, u32)> {
        self.image(name).map(|img| img.dimensions())
    }
}

#[derive(Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, RgbaImage>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every image in `names`, skipping the ones that cannot be found or decoded.
    pub fn load(asset_dir: &Path, names: &[&str]) -> Self {
        let mut store = Self::new();
        for name in names {
            match load_image(asset_dir, name) {
                Ok(image) => {
                    info!("Loaded image {name} ({}x{})", image.width(), image.height());
                    store.insert(name, image);
                }
                Err(err) => warn!("{err}"),
            }
        }
        store
    }

    pub fn insert(&mut self, name: &str, image: RgbaImage) {
        self.images.insert(name.to_string(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl AssetProvider for AssetStore {
    fn image(&self, name: &str) -> Option<&RgbaImage> {
        self.images.get(name)
    }
}

/// Look for `name` in `asset_dir` first, then in the working directory.
pub fn locate(asset_dir: &Path, name: &str) -> Option<PathBuf> {
    [asset_dir.join(name), PathBuf::from(name)]
        .into_iter()
        .find(|path| path.is_file())
}

pub fn load_image(asset_dir: &Path, name: &str) -> Result<RgbaImage, AssetError> {
    let path = locate(asset_dir, name).ok_or_else(|| AssetError::NotFound(name.to_string()))?;
    let image = image::open(&path).map_err(|source| AssetError::Decode {
        path: path.clone(),
        source,
    })?;
    Ok(image.to_rgba8())
}
