use rayon::prelude::*;

use super::data_set::DataSet;
use crate::{
    Cart,
    common::{checker, utils},
};


impl DataSet {
    /// Recompute `w_i = exp(-y_i * f_i)` for every sample,
    /// where `y_i` is the label of this data set and `f_i` the score.
    pub fn update_weights(&mut self) {
        let label = self.polarity.label();
        let scores = &self.scores;
        self.weights.par_iter_mut()
            .zip(scores.par_iter())
            .for_each(|(w, &f)| { *w = (-label * f).exp(); });
    }


    /// Apply [`DataSet::update_weights`] to both pools and
    /// normalize the weights over the union of them,
    /// so that the weights of `pos` and `neg` sum to `1` together.
    ///
    /// The normalization runs in the log domain,
    /// so large scores do not overflow.
    pub fn update_weights_jointly(pos: &mut DataSet, neg: &mut DataSet) {
        checker::positive(pos, "update_weights_jointly");
        checker::negative(neg, "update_weights_jointly");

        let log_weights = |data: &DataSet| {
            let label = data.polarity.label();
            data.scores.iter()
                .map(|&f| -label * f)
                .collect::<Vec<_>>()
        };
        let log_pos = log_weights(pos);
        let log_neg = log_weights(neg);

        let all = [&log_pos[..], &log_neg[..]].concat();
        if all.is_empty() {
            return;
        }
        let normalizer = utils::log_sum_exp(&all);

        for (data, logs) in [(pos, log_pos), (neg, log_neg)] {
            data.weights.par_iter_mut()
                .zip(logs)
                .for_each(|(w, l)| { *w = (l - normalizer).exp(); });
        }
    }


    /// Add the response of `cart` to every score:
    /// `f_i = f_i + cart(x_i, s_i)`.
    /// The previous scores are kept for [`DataSet::reset_scores`].
    pub fn update_scores<C>(&mut self, cart: &C)
        where C: Cart,
    {
        self.last_scores.copy_from_slice(&self.scores);

        let images = &self.images;
        let shapes = &self.current_shapes;
        self.scores.par_iter_mut()
            .enumerate()
            .for_each(|(i, f)| { *f += cart.score(&images[i], &shapes[i]); });

        self.is_sorted = utils::first_ascent(&self.scores).is_none();
    }


    /// Undo the last [`DataSet::update_scores`].
    pub fn reset_scores(&mut self) {
        self.scores.copy_from_slice(&self.last_scores);
        self.is_sorted = utils::first_ascent(&self.scores).is_none();
    }


    /// Population mean and standard deviation of
    /// the scores of both pools together.
    pub fn calc_mean_and_std(pos: &DataSet, neg: &DataSet) -> (f64, f64) {
        let scores = pos.scores.iter()
            .chain(neg.scores.iter())
            .copied();
        utils::mean_and_std(scores)
    }


    /// Standardize every score: `f_i = (f_i - mean) / std`.
    /// A non-positive `std` only shifts the scores.
    pub fn apply_mean_and_std(&mut self, mean: f64, std: f64) {
        let std = if std > 0f64 { std } else { 1f64 };
        self.scores.par_iter_mut()
            .for_each(|f| { *f = (*f - mean) / std; });
        // an affine map with positive slope keeps the order
    }
}
