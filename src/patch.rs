//! Gray-scale training patches.
//!
//! Features read pixels at three resolutions,
//! so a [`Patch`] keeps the full image together with
//! its half and quarter resolution copies.
use std::path::Path;

use image::GrayImage;
use image::imageops::{self, FilterType};
use serde::{Serialize, Deserialize};

use crate::error::{JdaError, Result};


/// Resolution level of a [`Patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    /// Full resolution.
    Full,
    /// Half resolution.
    Half,
    /// Quarter resolution.
    Quarter,
}


/// Geometric variant applied to a crop while mining.
/// The discriminant order is the scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// The crop itself.
    Identity,
    /// Mirrored left to right.
    FlipHorizontal,
    /// Mirrored top to bottom.
    FlipVertical,
    /// Rotated by 180 degrees.
    Rotate180,
}


impl Transform {
    /// All variants in scan order.
    pub const ALL: [Transform; 4] = [
        Transform::Identity,
        Transform::FlipHorizontal,
        Transform::FlipVertical,
        Transform::Rotate180,
    ];


    /// The `k`-th variant in scan order.
    pub fn nth(k: usize) -> Option<Transform> {
        Self::ALL.get(k).copied()
    }


    /// Apply the transform. Dimensions are preserved.
    pub fn apply(self, image: GrayImage) -> GrayImage {
        match self {
            Transform::Identity => image,
            Transform::FlipHorizontal => imageops::flip_horizontal(&image),
            Transform::FlipVertical => imageops::flip_vertical(&image),
            Transform::Rotate180 => imageops::rotate180(&image),
        }
    }
}


/// A training sample image at three resolutions.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    full: GrayImage,
    half: GrayImage,
    quarter: GrayImage,
}


impl Patch {
    /// Build a patch from its full resolution image.
    /// The half and quarter copies are derived deterministically,
    /// so a patch is fully determined by `full`.
    pub fn new(full: GrayImage) -> Self {
        let half = downscale(&full, 2);
        let quarter = downscale(&full, 4);
        Self { full, half, quarter }
    }


    /// Crop the square window `(x, y, size, size)` from `image`,
    /// apply `transform`, and resize it to `patch_size`.
    /// The window must lie inside `image`.
    pub fn from_window(
        image: &GrayImage,
        x: u32,
        y: u32,
        size: u32,
        transform: Transform,
        patch_size: u32,
    ) -> Self
    {
        debug_assert!(x + size <= image.width() && y + size <= image.height());
        let crop = imageops::crop_imm(image, x, y, size, size).to_image();
        let crop = transform.apply(crop);
        Self::new(resize(&crop, patch_size, patch_size))
    }


    /// The image at the given resolution.
    #[inline]
    pub fn at(&self, scale: Scale) -> &GrayImage {
        match scale {
            Scale::Full => &self.full,
            Scale::Half => &self.half,
            Scale::Quarter => &self.quarter,
        }
    }


    /// The full resolution image.
    #[inline]
    pub fn image(&self) -> &GrayImage {
        &self.full
    }


    /// Consume `self` and return the full resolution image.
    pub fn into_image(self) -> GrayImage {
        self.full
    }


    /// Width of the full resolution image.
    #[inline]
    pub fn width(&self) -> u32 {
        self.full.width()
    }


    /// Height of the full resolution image.
    #[inline]
    pub fn height(&self) -> u32 {
        self.full.height()
    }
}


/// Open an image file and convert it to gray scale.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    image::open(path)
        .map(|img| img.into_luma8())
        .map_err(|source| JdaError::Image { path: path.to_path_buf(), source })
}


/// Resize `image` to `width x height` with a triangle filter.
pub fn resize(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}


fn downscale(image: &GrayImage, factor: u32) -> GrayImage {
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    resize(image, width, height)
}
