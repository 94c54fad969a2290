//! This file defines some functions that checks some pre-conditions
//! E.g., polarity of a data set, index ranges.
//!
//! Every check panics on violation:
//! a failed check is a caller error, not a recoverable condition.

use crate::dataset::{DataSet, Polarity};


/// Check whether `data` is the positive data set.
#[inline(always)]
pub(crate) fn positive(data: &DataSet, operation: &str) {
    assert!(
        data.polarity() == Polarity::Positive,
        "`{operation}` can only be called on the positive data set"
    );
}


/// Check whether `data` is the negative data set.
#[inline(always)]
pub(crate) fn negative(data: &DataSet, operation: &str) {
    assert!(
        data.polarity() == Polarity::Negative,
        "`{operation}` can only be called on the negative data set"
    );
}


/// Check whether `index` is a live sample of `data`.
#[inline(always)]
pub(crate) fn index(data: &DataSet, index: usize) {
    let size = data.len();
    assert!(
        index < size,
        "sample index out of range: the size is {size} but the index is {index}"
    );
}


/// Check whether every column of `data` has the same length.
#[inline(always)]
pub(crate) fn aligned(data: &DataSet) {
    assert!(
        data.is_aligned(),
        "the columns of the data set are not index-aligned"
    );
}


/// Check the ratio of the scores to remove.
#[inline(always)]
pub(crate) fn rate(rate: f64) {
    assert!(
        (0f64..=1f64).contains(&rate),
        "rate must be in [0, 1]. got {rate}."
    );
}
