#![warn(missing_docs)]

//!
//! A crate that provides the training data plane of
//! a Joint Cascade face detector and landmark aligner.
//!
//! Training a cascade stage needs two things from this crate.
//!
//! - A [`DataSet`] per class
//!     Faces and non-faces are kept in two stores.
//!     Each store keeps the image, the ground-truth and current shapes,
//!     the score, and the boosting weight of every sample
//!     in index-aligned columns.
//!     Boosting rounds update scores and weights,
//!     and the stage threshold prunes the samples that became easy.
//!
//!
//! - A [`NegGenerator`]
//!     Pruning shrinks the negative store.
//!     The generator refills it with hard negatives:
//!     crops of background images that the cascade trained so far
//!     still accepts as faces.
//!     Backgrounds are scanned by a pool of workers in parallel.
//!
//! The weak learners themselves are outside this crate.
//! They plug in through the [`Cart`], [`Cascade`], and [`Feature`] traits.
//!
//! # Example
//! ```no_run
//! use jda::prelude::*;
//!
//! let config = Config::from_json_file("config.json").unwrap();
//! let (pos, mut neg) = DataSetReader::new(&config)
//!     .seed(0)
//!     .read()
//!     .unwrap();
//!
//! let cascade = StagedCascade::<Box<dyn Cart>>::new(pos.mean_shape().clone());
//! neg.more_neg_samples(&cascade, pos.len(), config.mining.neg_pos_ratio);
//! DataSet::snapshot("jda.snapshot", &pos, &neg).unwrap();
//! ```

pub mod error;
pub mod config;
pub mod shape;
pub mod patch;
pub mod feature;
pub mod cascade;
pub mod dataset;
pub mod mining;

pub mod prelude;

mod common;


pub use error::{JdaError, Result};

pub use config::{
    Config,
    MiningConfig,
    PerturbationConfig,
};

pub use shape::Shape;
pub use patch::{Patch, Scale, Transform};

pub use feature::{Feature, PixelDifference};
pub use cascade::{
    Cart,
    Cascade,
    Verdict,
    StagedCascade,
};

pub use dataset::{
    DataSet,
    DataSetReader,
    Polarity,
    ShapeMask,
    Record,
    read_list,
    read_nested_list,
};

pub use mining::{
    NegGenerator,
    MiningState,
    MiningSink,
    MiningOutcome,
    MiningStats,
    Window,
};

pub use common::utils::{mean_and_std, log_sum_exp};
