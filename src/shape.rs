//! Landmark shapes.
//!
//! A shape is stored as `(x_1, y_1, x_2, y_2, ..., x_n, y_n)` in
//! normalized patch coordinates, so `(0, 0)` is the top-left corner
//! and `(1, 1)` the bottom-right corner of a patch regardless of its size.
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Serialize, Deserialize};

use crate::config::PerturbationConfig;


/// An ordered sequence of 2D landmarks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    coords: Vec<f64>,
}


impl Shape {
    /// Construct a shape from interleaved coordinates.
    /// Panics if `coords` has odd length.
    pub fn new(coords: Vec<f64>) -> Self {
        assert!(
            coords.len() % 2 == 0,
            "a shape needs an even number of coordinates, got {}",
            coords.len()
        );
        Self { coords }
    }


    /// A shape with `n_landmarks` landmarks at the origin.
    pub fn zeros(n_landmarks: usize) -> Self {
        Self { coords: vec![0f64; 2 * n_landmarks] }
    }


    /// Number of landmarks.
    #[inline]
    pub fn n_landmarks(&self) -> usize {
        self.coords.len() / 2
    }


    /// Returns `true` if the shape has no landmark.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }


    /// Interleaved coordinates.
    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords[..]
    }


    /// Mutable interleaved coordinates.
    #[inline]
    pub fn coords_mut(&mut self) -> &mut [f64] {
        &mut self.coords[..]
    }


    /// The `k`-th landmark.
    #[inline]
    pub fn landmark(&self, k: usize) -> (f64, f64) {
        (self.coords[2 * k], self.coords[2 * k + 1])
    }


    /// Element-wise difference `self - other`.
    pub fn residual(&self, other: &Shape) -> Vec<f64> {
        assert_eq!(
            self.coords.len(), other.coords.len(),
            "shapes have different number of landmarks"
        );
        self.coords.iter()
            .zip(&other.coords)
            .map(|(a, b)| a - b)
            .collect()
    }


    /// Center of mass of the landmarks.
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.n_landmarks();
        if n == 0 {
            return (0f64, 0f64);
        }
        let (sx, sy) = self.coords.chunks_exact(2)
            .fold((0f64, 0f64), |(sx, sy), p| (sx + p[0], sy + p[1]));
        (sx / n as f64, sy / n as f64)
    }


    /// Average of the given shapes.
    /// Returns `None` if `shapes` is empty.
    pub fn mean<'a, I>(shapes: I) -> Option<Shape>
        where I: IntoIterator<Item = &'a Shape>
    {
        let mut shapes = shapes.into_iter();
        let mut acc = shapes.next()?.coords.clone();
        let mut n = 1usize;
        for shape in shapes {
            assert_eq!(acc.len(), shape.coords.len());
            acc.iter_mut()
                .zip(&shape.coords)
                .for_each(|(a, b)| { *a += b; });
            n += 1;
        }
        acc.iter_mut().for_each(|a| { *a /= n as f64; });
        Some(Shape { coords: acc })
    }


    /// Random similarity transform of `self` around its centroid:
    /// scale in `[1 - scale, 1 + scale]`,
    /// rotation in `[-rotation, rotation]`,
    /// translation in `[-shift, shift]` along each axis.
    pub fn perturb<R: Rng>(
        &self,
        config: &PerturbationConfig,
        rng: &mut R,
    ) -> Shape
    {
        let scale = 1f64 + uniform(rng, config.scale);
        let theta = uniform(rng, config.rotation);
        let dx = uniform(rng, config.shift);
        let dy = uniform(rng, config.shift);

        let (cx, cy) = self.centroid();
        let (sin, cos) = theta.sin_cos();
        let coords = self.coords.chunks_exact(2)
            .flat_map(|p| {
                let x = p[0] - cx;
                let y = p[1] - cy;
                let rx = scale * (cos * x - sin * y) + cx + dx;
                let ry = scale * (sin * x + cos * y) + cy + dy;
                [rx, ry]
            })
            .collect();
        Shape { coords }
    }
}


// Uniform draw in `[-bound, bound]`, `0` when `bound == 0`.
#[inline]
fn uniform<R: Rng>(rng: &mut R, bound: f64) -> f64 {
    if bound > 0f64 {
        Uniform::new_inclusive(-bound, bound).sample(rng)
    } else {
        0f64
    }
}
