use super::data_set::DataSet;
use crate::common::{checker, utils};


impl DataSet {
    /// Threshold `th` such that the ratio of samples with `score < th`
    /// is as close to `rate` as possible.
    ///
    /// This is the order statistic at position `round(rate * len)`
    /// of the ascending scores. Sorts `self` if needed.
    /// Returns `0` for an empty data set.
    pub fn calc_threshold_by_rate(&mut self, rate: f64) -> f64 {
        checker::rate(rate);
        let remove = (rate * self.len() as f64).round() as usize;
        self.calc_threshold_by_number(remove)
    }


    /// Threshold that removes the `remove` lowest scoring samples.
    ///
    /// Ties at the threshold are kept, so fewer samples may fall below it.
    /// Removing everything gives `+inf`.
    /// Returns `0` for an empty data set.
    pub fn calc_threshold_by_number(&mut self, remove: usize) -> f64 {
        let n = self.len();
        if n == 0 {
            return 0f64;
        }
        if remove >= n {
            return f64::INFINITY;
        }
        if !self.is_sorted {
            self.qsort();
        }
        let th = self.scores[n - 1 - remove];
        tracing::debug!(remove, threshold = th, size = n, "threshold computed");
        th
    }


    /// Number of samples [`DataSet::remove`] would remove for `th`.
    pub fn pre_remove(&self, th: f64) -> usize {
        self.scores.iter()
            .filter(|&&f| f < th)
            .count()
    }


    /// Remove every sample with `score < th`.
    /// The order of the remaining samples is not preserved
    /// in general, but a sorted data set stays sorted.
    /// Returns the number of removed samples.
    pub fn remove(&mut self, th: f64) -> usize {
        let before = self.len();

        let mut i = 0;
        let mut end = before;
        while i < end {
            if self.scores[i] < th {
                end -= 1;
                self.swap_records(i, end);
            } else {
                i += 1;
            }
        }
        self.truncate(end);

        self.is_sorted = utils::first_ascent(&self.scores).is_none();
        checker::aligned(self);

        let removed = before - end;
        tracing::debug!(threshold = th, removed, remaining = end, "samples removed");
        removed
    }


    /// Sort every column by descending score.
    pub fn qsort(&mut self) {
        let n = self.len();
        if n > 1 {
            self.qsort_range(0, n - 1);
        }
        self.is_sorted = utils::first_ascent(&self.scores).is_none();
    }


    /// Sort the samples in `[left, right]` (both inclusive)
    /// by descending score.
    ///
    /// Hoare partitioning around a median-of-three pivot,
    /// recursing into the smaller half only.
    pub fn qsort_range(&mut self, mut left: usize, mut right: usize) {
        if left >= right {
            return;
        }
        checker::index(self, right);

        while left < right {
            let p = self.partition(left, right);
            // `left <= p < right`, so both halves shrink.
            if p - left < right - p {
                self.qsort_range(left, p);
                left = p + 1;
            } else {
                self.qsort_range(p + 1, right);
                right = p;
            }
        }
    }


    // Returns `p` with `left <= p < right` such that
    // every score in `[left, p]` is `>=` every score in `[p + 1, right]`.
    fn partition(&mut self, left: usize, right: usize) -> usize {
        let mid = left + (right - left) / 2;
        if self.scores[mid] > self.scores[left] {
            self.swap_records(mid, left);
        }
        if self.scores[right] > self.scores[left] {
            self.swap_records(right, left);
        }
        if self.scores[right] > self.scores[mid] {
            self.swap_records(right, mid);
        }
        let pivot = self.scores[mid];

        let mut i = left;
        let mut j = right;
        loop {
            while self.scores[i] > pivot {
                i += 1;
            }
            while self.scores[j] < pivot {
                j -= 1;
            }
            if i >= j {
                return j;
            }
            self.swap_records(i, j);
            i += 1;
            j -= 1;
        }
    }
}
