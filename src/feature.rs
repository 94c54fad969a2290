//! Shape-indexed features.
//!
//! The feature a weak learner splits on is evaluated against
//! a sample's image and its *current* shape estimate.
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::patch::{Patch, Scale};
use crate::shape::Shape;


/// A feature evaluated on a patch under a shape estimate.
///
/// Implementors must be `Sync` because
/// [`DataSet::calc_feature_values`](crate::DataSet::calc_feature_values)
/// evaluates a feature pool in parallel.
pub trait Feature: Sync {
    /// Evaluate the feature.
    fn evaluate(&self, patch: &Patch, shape: &Shape) -> i32;
}


/// Difference of two pixel intensities,
/// each located relative to a landmark of the current shape.
///
/// Offsets are expressed in normalized patch coordinates,
/// so the same feature applies at every [`Scale`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelDifference {
    /// Resolution level the pixels are read from.
    pub scale: Scale,
    /// Landmark anchoring the first pixel.
    pub landmark1: usize,
    /// Offset of the first pixel from its landmark.
    pub offset1: (f64, f64),
    /// Landmark anchoring the second pixel.
    pub landmark2: usize,
    /// Offset of the second pixel from its landmark.
    pub offset2: (f64, f64),
}


impl PixelDifference {
    /// Draw a random feature whose offsets lie within `radius`
    /// of their landmarks.
    pub fn random<R: Rng>(n_landmarks: usize, radius: f64, rng: &mut R) -> Self {
        assert!(n_landmarks > 0, "a feature needs at least one landmark");
        let scale = match rng.gen_range(0..3) {
            0 => Scale::Full,
            1 => Scale::Half,
            _ => Scale::Quarter,
        };
        let mut offset = || {
            if radius > 0f64 {
                (rng.gen_range(-radius..=radius), rng.gen_range(-radius..=radius))
            } else {
                (0f64, 0f64)
            }
        };
        let offset1 = offset();
        let offset2 = offset();
        Self {
            scale,
            landmark1: rng.gen_range(0..n_landmarks),
            offset1,
            landmark2: rng.gen_range(0..n_landmarks),
            offset2,
        }
    }
}


impl Feature for PixelDifference {
    fn evaluate(&self, patch: &Patch, shape: &Shape) -> i32 {
        let image = patch.at(self.scale);
        let p1 = pixel_at(image, shape.landmark(self.landmark1), self.offset1);
        let p2 = pixel_at(image, shape.landmark(self.landmark2), self.offset2);
        p1 - p2
    }
}


// Intensity at `landmark + offset`, clamped into the image.
#[inline]
fn pixel_at(
    image: &image::GrayImage,
    landmark: (f64, f64),
    offset: (f64, f64),
) -> i32
{
    let (w, h) = image.dimensions();
    let x = clamp_coord((landmark.0 + offset.0) * w as f64, w);
    let y = clamp_coord((landmark.1 + offset.1) * h as f64, h);
    image.get_pixel(x, y)[0] as i32
}


#[inline]
fn clamp_coord(v: f64, len: u32) -> u32 {
    let max = len.saturating_sub(1) as f64;
    if v.is_nan() {
        return 0;
    }
    v.floor().clamp(0f64, max) as u32
}
