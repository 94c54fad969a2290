//! The in-memory training data set.
//!
//! A [`DataSet`] holds one homogeneous pool of samples,
//! either faces ([`Polarity::Positive`]) or non-faces
//! ([`Polarity::Negative`]).
//! Every per-sample field lives in its own column and all columns are
//! kept index-aligned: index `i` refers to the same sample in each of them.

// Provides the `DataSet` struct and its column bookkeeping.
pub(crate) mod data_set;
// Feature values, shape residuals, mean/random shapes.
mod features;
// Weight and score update rules.
mod boosting;
// Threshold search, removal, and sorting.
mod threshold;
// Binary snapshot/resume and image dump.
mod snapshot;
// List and data set loaders.
pub(crate) mod reader;


pub use data_set::{
    DataSet,
    Polarity,
    ShapeMask,
    Record,
};

pub use reader::{
    DataSetReader,
    read_list,
    read_nested_list,
};
