use rand::Rng;
use rayon::prelude::*;

use super::data_set::{DataSet, ShapeMask};
use crate::{
    Feature,
    PerturbationConfig,
    Shape,
    common::checker,
};


impl DataSet {
    /// Evaluate every feature of `feature_pool` on the samples `indices`
    /// under their current shapes.
    ///
    /// Returns a feature-major matrix:
    /// `values[f][j] = feature_pool[f](sample[indices[j]])`.
    /// Features are evaluated in parallel; the data set is only read.
    pub fn calc_feature_values<F>(
        &self,
        feature_pool: &[F],
        indices: &[usize],
    ) -> Vec<Vec<i32>>
        where F: Feature,
    {
        indices.iter()
            .for_each(|&i| checker::index(self, i));

        feature_pool.par_iter()
            .map(|feature| {
                indices.iter()
                    .map(|&i| {
                        feature.evaluate(&self.images[i], &self.current_shapes[i])
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }


    /// Shape residual `gt_shape - current_shape` of the samples `indices`,
    /// one row per sample.
    ///
    /// Only the positive data set can call this method,
    /// and every requested sample must have a ground-truth shape.
    pub fn calc_shape_residual(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        checker::positive(self, "calc_shape_residual");
        indices.iter()
            .map(|&i| self.gt_shape_of(i).residual(&self.current_shapes[i]))
            .collect()
    }


    /// Residual of the `landmark`-th landmark only,
    /// one `[dx, dy]` row per sample.
    pub fn calc_shape_residual_of(
        &self,
        indices: &[usize],
        landmark: usize,
    ) -> Vec<Vec<f64>>
    {
        checker::positive(self, "calc_shape_residual_of");
        indices.iter()
            .map(|&i| {
                let (gx, gy) = self.gt_shape_of(i).landmark(landmark);
                let (cx, cy) = self.current_shapes[i].landmark(landmark);
                vec![gx - cx, gy - cy]
            })
            .collect()
    }


    fn gt_shape_of(&self, i: usize) -> &Shape {
        checker::index(self, i);
        match (&self.gt_shapes[i], self.shape_mask[i]) {
            (Some(shape), ShapeMask::Annotated) => shape,
            _ => panic!("the {i}-th sample has no ground-truth shape"),
        }
    }


    /// Average the ground-truth shapes of annotated samples and
    /// store the result as the mean shape of `self`.
    /// Samples without ground truth are left out of the average.
    ///
    /// Returns an empty shape if no sample is annotated.
    pub fn calc_mean_shape(&mut self) -> Shape {
        let annotated = self.gt_shapes.iter()
            .zip(&self.shape_mask)
            .filter_map(|(shape, mask)| match mask {
                ShapeMask::Annotated => shape.as_ref(),
                ShapeMask::Missing => None,
            });
        let mean = Shape::mean(annotated).unwrap_or_default();
        self.mean_shape = mean.clone();
        mean
    }


    /// A random perturbation of `mean_shape`.
    pub fn random_shape<R: Rng>(
        mean_shape: &Shape,
        config: &PerturbationConfig,
        rng: &mut R,
    ) -> Shape
    {
        mean_shape.perturb(config, rng)
    }


    /// `n` independent random perturbations of `mean_shape`.
    pub fn random_shapes<R: Rng>(
        mean_shape: &Shape,
        config: &PerturbationConfig,
        n: usize,
        rng: &mut R,
    ) -> Vec<Shape>
    {
        (0..n).map(|_| mean_shape.perturb(config, rng))
            .collect()
    }


    /// Re-initialize every current shape by a random perturbation
    /// of `mean_shape`.
    pub fn reset_current_shapes<R: Rng>(
        &mut self,
        mean_shape: &Shape,
        config: &PerturbationConfig,
        rng: &mut R,
    )
    {
        let n = self.len();
        self.current_shapes = Self::random_shapes(mean_shape, config, n, rng);
    }
}
