//! Evaluation contracts of the cascade under training.
//!
//! The boosted trees themselves live outside this crate.
//! The data plane only needs two capabilities from them:
//!
//! - [`Cart`] ... the response of one weak learner, used by
//!   [`DataSet::update_scores`](crate::DataSet::update_scores).
//! - [`Cascade`] ... the full cascade verdict on a candidate patch,
//!   used by hard negative mining.
//!
//! [`StagedCascade`] is the growing ordered sequence of stages
//! that implements [`Cascade`] for any [`Cart`].
use crate::patch::Patch;
use crate::shape::Shape;


/// A weak learner of the cascade.
pub trait Cart: Sync {
    /// Response of this cart on `patch` under the shape estimate `shape`.
    fn score(&self, patch: &Patch, shape: &Shape) -> f64;


    /// Rejection threshold applied to the running score
    /// right after this cart.
    /// A sample whose running score falls below it is a non-face.
    fn threshold(&self) -> f64 {
        f64::NEG_INFINITY
    }
}


impl<C: Cart + ?Sized> Cart for Box<C> {
    fn score(&self, patch: &Patch, shape: &Shape) -> f64 {
        (**self).score(patch, shape)
    }


    fn threshold(&self) -> f64 {
        (**self).threshold()
    }
}


/// The verdict of a cascade on one patch.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// `true` iff every trained stage accepted the patch.
    pub is_face: bool,
    /// Cumulative response at the point the cascade stopped.
    pub score: f64,
    /// Shape estimate at the point the cascade stopped.
    pub shape: Shape,
    /// Number of carts evaluated.
    pub n_carts: usize,
}


/// The cascade in training, as seen by the miner.
pub trait Cascade: Sync {
    /// Shape every candidate starts from.
    fn mean_shape(&self) -> &Shape;


    /// Run `patch` through every trained stage.
    fn validate(&self, patch: &Patch) -> Verdict;
}


/// An ordered sequence of stages.
/// New stages are appended, never replace earlier ones.
#[derive(Debug, Clone)]
pub struct StagedCascade<C> {
    mean_shape: Shape,
    stages: Vec<Vec<C>>,
}


impl<C> StagedCascade<C> {
    /// An empty cascade. It accepts every patch with score `0`.
    pub fn new(mean_shape: Shape) -> Self {
        Self { mean_shape, stages: Vec::new() }
    }


    /// Append a trained stage.
    pub fn push_stage(&mut self, carts: Vec<C>) {
        self.stages.push(carts);
    }


    /// Number of stages.
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }


    /// Number of carts over all stages.
    pub fn n_carts(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }


    /// Carts of every stage, in evaluation order.
    pub fn carts(&self) -> impl Iterator<Item = &C> + '_ {
        self.stages.iter().flatten()
    }
}


impl<C: Cart> StagedCascade<C> {
    /// Cumulative response of every cart, without early rejection.
    pub fn score(&self, patch: &Patch, shape: &Shape) -> f64 {
        self.carts()
            .map(|cart| cart.score(patch, shape))
            .sum()
    }
}


impl<C: Cart> Cascade for StagedCascade<C> {
    fn mean_shape(&self) -> &Shape {
        &self.mean_shape
    }


    fn validate(&self, patch: &Patch) -> Verdict {
        let shape = self.mean_shape.clone();
        let mut score = 0f64;
        let mut n_carts = 0usize;
        for cart in self.carts() {
            score += cart.score(patch, &shape);
            n_carts += 1;
            if score < cart.threshold() {
                return Verdict { is_face: false, score, shape, n_carts };
            }
        }
        Verdict { is_face: true, score, shape, n_carts }
    }
}
