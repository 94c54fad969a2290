//! This file provides some common functions
//! such as score statistics and weight normalization.


/// Population mean and standard deviation of the given values.
/// Returns `(0, 0)` for an empty input.
#[inline(always)]
pub fn mean_and_std<I>(values: I) -> (f64, f64)
    where I: IntoIterator<Item = f64> + Clone,
{
    let (n, sum) = values.clone()
        .into_iter()
        .fold((0usize, 0f64), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return (0f64, 0f64);
    }
    let mean = sum / n as f64;
    let var = values.into_iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / n as f64;
    (mean, var.sqrt())
}


/// Returns `ln(sum_i exp(x_i))` without overflow,
/// or `-inf` for an empty input.
#[inline(always)]
pub fn log_sum_exp(items: &[f64]) -> f64 {
    let max = items.iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum = items.iter()
        .map(|x| (x - max).exp())
        .sum::<f64>();
    max + sum.ln()
}


/// Returns the index of the first pair `(i, i + 1)` with
/// `items[i] < items[i + 1]`, i.e., the first violation of
/// the non-increasing order, or `None` if there is none.
#[inline(always)]
pub(crate) fn first_ascent(items: &[f64]) -> Option<usize> {
    items.windows(2).position(|w| w[0] < w[1])
}
