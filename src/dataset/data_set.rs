use crate::{
    Cascade,
    NegGenerator,
    Patch,
    Shape,
    common::{checker, utils},
    mining::MiningOutcome,
};


/// Whether a data set holds faces or non-faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Face samples. Label `+1`.
    Positive,
    /// Non-face samples. Label `-1`.
    Negative,
}


impl Polarity {
    /// The label `y` of this polarity, `+1` or `-1`.
    #[inline]
    pub fn label(self) -> f64 {
        match self {
            Polarity::Positive => 1f64,
            Polarity::Negative => -1f64,
        }
    }
}


/// Whether a sample carries a ground-truth shape.
/// Negative samples never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeMask {
    /// The ground-truth shape is present.
    Annotated,
    /// The ground-truth shape is absent.
    Missing,
}


impl ShapeMask {
    #[inline]
    pub(crate) fn to_i8(self) -> i8 {
        match self {
            ShapeMask::Annotated => 1,
            ShapeMask::Missing => -1,
        }
    }


    #[inline]
    pub(crate) fn from_i8(flag: i8) -> Option<Self> {
        match flag {
            1 => Some(ShapeMask::Annotated),
            -1 => Some(ShapeMask::Missing),
            _ => None,
        }
    }
}


/// One sample, used to append to a [`DataSet`] as a unit.
///
/// # Example
/// ```no_run
/// use jda::prelude::*;
/// # let patch: Patch = unimplemented!();
/// # let gt: Shape = unimplemented!();
/// let mut pos = DataSet::positive();
/// pos.push(
///     Record::new(patch, gt.clone())
///         .gt_shape(gt)
///         .score(0.5)
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    /// The sample image.
    pub image: Patch,
    /// Ground-truth shape, if annotated.
    pub gt_shape: Option<Shape>,
    /// Current shape estimate.
    pub current_shape: Shape,
    /// Cumulative score.
    pub score: f64,
    /// Boosting weight.
    pub weight: f64,
}


impl Record {
    /// A record with score `0`, weight `1`, and no ground truth.
    pub fn new(image: Patch, current_shape: Shape) -> Self {
        Self {
            image,
            gt_shape: None,
            current_shape,
            score: 0f64,
            weight: 1f64,
        }
    }


    /// Set the ground-truth shape.
    pub fn gt_shape(mut self, shape: Shape) -> Self {
        self.gt_shape = Some(shape);
        self
    }


    /// Set the score.
    pub fn score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }


    /// Set the weight.
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}


/// One pool of training samples stored column-wise.
///
/// Columns are only resized as a whole
/// ([`DataSet::push`], [`DataSet::remove`], [`DataSet::clear`], ...)
/// and only reordered as a whole ([`DataSet::swap`]),
/// so every column always has length [`DataSet::len`].
#[derive(Debug)]
pub struct DataSet {
    pub(super) polarity: Polarity,
    pub(super) images: Vec<Patch>,
    pub(super) gt_shapes: Vec<Option<Shape>>,
    pub(super) shape_mask: Vec<ShapeMask>,
    pub(super) current_shapes: Vec<Shape>,
    pub(super) scores: Vec<f64>,
    pub(super) last_scores: Vec<f64>,
    pub(super) weights: Vec<f64>,
    pub(super) mean_shape: Shape,
    pub(super) is_sorted: bool,
    pub(super) neg_generator: NegGenerator,
}


impl DataSet {
    /// An empty data set of the given polarity.
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            images: Vec::new(),
            gt_shapes: Vec::new(),
            shape_mask: Vec::new(),
            current_shapes: Vec::new(),
            scores: Vec::new(),
            last_scores: Vec::new(),
            weights: Vec::new(),
            mean_shape: Shape::default(),
            is_sorted: true,
            neg_generator: NegGenerator::default(),
        }
    }


    /// An empty positive data set.
    pub fn positive() -> Self {
        Self::new(Polarity::Positive)
    }


    /// An empty negative data set.
    pub fn negative() -> Self {
        Self::new(Polarity::Negative)
    }


    /// Attach the generator used by [`DataSet::more_neg_samples`].
    pub fn with_generator(mut self, generator: NegGenerator) -> Self {
        self.neg_generator = generator;
        self
    }


    /// The hard negative generator.
    pub fn generator(&self) -> &NegGenerator {
        &self.neg_generator
    }


    /// The hard negative generator, mutably.
    pub fn generator_mut(&mut self) -> &mut NegGenerator {
        &mut self.neg_generator
    }


    /// Polarity of this data set.
    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }


    /// Returns `true` for the positive data set.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.polarity == Polarity::Positive
    }


    /// Number of live samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.images.len()
    }


    /// Returns `true` if there is no sample.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }


    /// Returns `true` if the scores are known to be non-increasing.
    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }


    /// Sample images.
    pub fn images(&self) -> &[Patch] {
        &self.images[..]
    }


    /// Ground-truth shapes. `None` for samples without one.
    pub fn gt_shapes(&self) -> &[Option<Shape>] {
        &self.gt_shapes[..]
    }


    /// Shape masks.
    pub fn shape_masks(&self) -> &[ShapeMask] {
        &self.shape_mask[..]
    }


    /// Current shape estimates.
    pub fn current_shapes(&self) -> &[Shape] {
        &self.current_shapes[..]
    }


    /// Current shape estimates, mutably.
    /// The slice cannot change the number of samples.
    pub fn current_shapes_mut(&mut self) -> &mut [Shape] {
        &mut self.current_shapes[..]
    }


    /// Cumulative scores.
    pub fn scores(&self) -> &[f64] {
        &self.scores[..]
    }


    /// Scores before the last [`DataSet::update_scores`].
    pub fn last_scores(&self) -> &[f64] {
        &self.last_scores[..]
    }


    /// Boosting weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights[..]
    }


    /// Mean shape of this data set.
    pub fn mean_shape(&self) -> &Shape {
        &self.mean_shape
    }


    /// Replace the mean shape.
    pub fn set_mean_shape(&mut self, mean_shape: Shape) {
        self.mean_shape = mean_shape;
    }


    /// Returns `true` if the `index`-th face has a ground-truth shape.
    /// Only meaningful on the positive data set.
    #[inline]
    pub fn has_gt_shape(&self, index: usize) -> bool {
        checker::positive(self, "has_gt_shape");
        checker::index(self, index);
        self.shape_mask[index] == ShapeMask::Annotated
    }


    /// Returns `true` if every column has length [`DataSet::len`].
    pub fn is_aligned(&self) -> bool {
        let n = self.images.len();
        self.gt_shapes.len() == n
            && self.shape_mask.len() == n
            && self.current_shapes.len() == n
            && self.scores.len() == n
            && self.last_scores.len() == n
            && self.weights.len() == n
    }


    /// Append one sample.
    /// Its last score is set to its score.
    ///
    /// A ground-truth shape on a negative sample is a caller error.
    pub fn push(&mut self, record: Record) {
        let Record { image, gt_shape, current_shape, score, weight } = record;

        let mask = match (&gt_shape, self.polarity) {
            (Some(_), Polarity::Negative) => panic!(
                "negative samples cannot have a ground-truth shape"
            ),
            (Some(shape), Polarity::Positive)
                if !shape.is_empty()
                    && shape.coords().iter().all(|c| *c >= 0f64)
                => ShapeMask::Annotated,
            _ => ShapeMask::Missing,
        };

        if let Some(&last) = self.scores.last() {
            self.is_sorted = self.is_sorted && last >= score;
        }

        self.images.push(image);
        self.gt_shapes.push(gt_shape);
        self.shape_mask.push(mask);
        self.current_shapes.push(current_shape);
        self.scores.push(score);
        self.last_scores.push(score);
        self.weights.push(weight);
    }


    /// Append every sample of `records`.
    pub fn extend<I>(&mut self, records: I)
        where I: IntoIterator<Item = Record>
    {
        records.into_iter()
            .for_each(|record| self.push(record));
    }


    /// Exchange the `i`-th and `j`-th samples across every column.
    pub fn swap(&mut self, i: usize, j: usize) {
        checker::index(self, i);
        checker::index(self, j);
        if i == j {
            return;
        }
        self.swap_records(i, j);
        self.is_sorted = utils::first_ascent(&self.scores).is_none();
    }


    /// Column-wise swap without bookkeeping of the sorted flag.
    #[inline]
    pub(super) fn swap_records(&mut self, i: usize, j: usize) {
        self.images.swap(i, j);
        self.gt_shapes.swap(i, j);
        self.shape_mask.swap(i, j);
        self.current_shapes.swap(i, j);
        self.scores.swap(i, j);
        self.last_scores.swap(i, j);
        self.weights.swap(i, j);
    }


    /// Keep the first `len` samples in every column.
    #[inline]
    pub(super) fn truncate(&mut self, len: usize) {
        self.images.truncate(len);
        self.gt_shapes.truncate(len);
        self.shape_mask.truncate(len);
        self.current_shapes.truncate(len);
        self.scores.truncate(len);
        self.last_scores.truncate(len);
        self.weights.truncate(len);
    }


    /// Remove every sample and reset the mean shape.
    /// The attached generator is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
        self.mean_shape = Shape::default();
        self.is_sorted = true;
    }


    /// Take over every sample field of `other`, keeping the own generator.
    pub(super) fn adopt(&mut self, other: DataSet) {
        let DataSet {
            polarity,
            images,
            gt_shapes,
            shape_mask,
            current_shapes,
            scores,
            last_scores,
            weights,
            mean_shape,
            is_sorted,
            neg_generator: _,
        } = other;
        debug_assert_eq!(self.polarity, polarity);

        self.images = images;
        self.gt_shapes = gt_shapes;
        self.shape_mask = shape_mask;
        self.current_shapes = current_shapes;
        self.scores = scores;
        self.last_scores = last_scores;
        self.weights = weights;
        self.mean_shape = mean_shape;
        self.is_sorted = is_sorted;
    }


    /// Mine hard negatives until `N(negative) / N(positive)` reaches `rate`.
    ///
    /// The deficit is `floor(pos_size * rate) - self.len()`.
    /// Mining may come back short when the backgrounds run out,
    /// so callers must look at [`DataSet::len`] afterwards.
    /// Returns the number of appended samples.
    ///
    /// Only the negative data set can call this method.
    pub fn more_neg_samples<K>(
        &mut self,
        cascade: &K,
        pos_size: usize,
        rate: f64,
    ) -> usize
        where K: Cascade,
    {
        checker::negative(self, "more_neg_samples");

        let target = (pos_size as f64 * rate).max(0f64) as usize;
        let deficit = target.saturating_sub(self.len());
        if deficit == 0 {
            return 0;
        }

        let outcome = self.neg_generator.generate(cascade, deficit);
        let n_mined = outcome.real_size();
        if n_mined < deficit {
            tracing::warn!(
                requested = deficit,
                mined = n_mined,
                "hard negative mining came back short"
            );
        }
        self.append_mined(outcome);
        n_mined
    }


    /// Append the samples of a mining round.
    /// Weights follow `w = exp(-y * score)` with `y = -1`.
    pub fn append_mined(&mut self, outcome: MiningOutcome) {
        checker::negative(self, "append_mined");
        let MiningOutcome { images, scores, shapes, .. } = outcome;
        let label = self.polarity.label();
        let records = images.into_iter()
            .zip(scores)
            .zip(shapes)
            .map(|((image, score), shape)| {
                Record::new(image, shape)
                    .score(score)
                    .weight((-label * score).exp())
            });
        self.extend(records);
        checker::aligned(self);
    }
}
