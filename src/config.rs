//! Training configuration.
//!
//! [`Config`] is read from a JSON file.
//! Every field has a default, so a partial file such as
//! ```json
//! { "patch_size": 40, "mining": { "pool_size": 16 } }
//! ```
//! is accepted.
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{JdaError, Result};


/// Default number of landmarks per shape.
pub const DEFAULT_N_LANDMARKS: usize = 5;
/// Default side length of a training patch, in pixels.
pub const DEFAULT_PATCH_SIZE: u32 = 80;


/// Parameters of the random perturbation applied to the mean shape
/// when a sample's current shape is initialized.
///
/// Shapes live in normalized patch coordinates,
/// so `shift` is a fraction of the patch side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    /// Maximal translation along each axis.
    pub shift: f64,
    /// Maximal relative scale change, i.e. scale is drawn from
    /// `[1 - scale, 1 + scale]`.
    pub scale: f64,
    /// Maximal rotation in radians.
    pub rotation: f64,
}


impl Default for PerturbationConfig {
    fn default() -> Self {
        Self { shift: 0.05, scale: 0.05, rotation: 0.1 }
    }
}


/// Parameters of hard negative mining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Smallest square window cropped from a background image.
    pub min_window: u32,
    /// Growth factor of the window between two scale levels.
    /// Must be greater than `1`.
    pub scale_factor: f64,
    /// Sliding step as a fraction of the current window size.
    pub step_ratio: f64,
    /// How many transform variants of a background are scanned.
    /// See [`Transform`](crate::Transform). Takes a value in `1..=4`.
    pub n_transforms: usize,
    /// Number of candidates a worker extracts before
    /// evaluating them and taking the shared lock once.
    pub pool_size: usize,
    /// Target ratio `N(negative) / N(positive)`.
    pub neg_pos_ratio: f64,
    /// Print the colored mining report.
    pub verbose: bool,
}


impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_window: 24,
            scale_factor: 1.3,
            step_ratio: 0.25,
            n_transforms: 4,
            pool_size: 8,
            neg_pos_ratio: 1.0,
            verbose: true,
        }
    }
}


/// Top-level configuration of a training run.
///
/// # Example
/// ```no_run
/// use jda::Config;
///
/// let config = Config::from_json_file("config.json")
///     .unwrap()
///     .n_threads(4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of landmarks of every shape.
    pub n_landmarks: usize,
    /// Side length of every training patch.
    pub patch_size: u32,
    /// Number of mining workers. `0` means "use every rayon thread".
    pub n_threads: usize,
    /// Shape perturbation.
    pub perturbation: PerturbationConfig,
    /// Hard negative mining.
    pub mining: MiningConfig,
    /// Positive sample list.
    pub face_list: Option<PathBuf>,
    /// Master lists of pre-generated negative samples.
    pub negative_lists: Vec<PathBuf>,
    /// Master lists of background images used for mining.
    pub background_lists: Vec<PathBuf>,
    /// Where `snapshot` writes and `resume` reads.
    pub snapshot_path: Option<PathBuf>,
}


impl Default for Config {
    fn default() -> Self {
        Self {
            n_landmarks: DEFAULT_N_LANDMARKS,
            patch_size: DEFAULT_PATCH_SIZE,
            n_threads: 0,
            perturbation: PerturbationConfig::default(),
            mining: MiningConfig::default(),
            face_list: None,
            negative_lists: Vec::new(),
            background_lists: Vec::new(),
            snapshot_path: None,
        }
    }
}


impl Config {
    /// Read a JSON configuration file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }


    /// Parse a JSON configuration string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }


    /// Check every value range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(JdaError::InvalidConfig(reason));

        if self.patch_size < 4 {
            return invalid(format!(
                "patch_size must be at least 4, got {}", self.patch_size
            ));
        }
        let m = &self.mining;
        if m.min_window == 0 {
            return invalid("mining.min_window must be positive".into());
        }
        if m.scale_factor.is_nan() || m.scale_factor <= 1.0 {
            return invalid(format!(
                "mining.scale_factor must be > 1, got {}", m.scale_factor
            ));
        }
        if !(m.step_ratio > 0.0 && m.step_ratio <= 1.0) {
            return invalid(format!(
                "mining.step_ratio must be in (0, 1], got {}", m.step_ratio
            ));
        }
        if !(1..=4).contains(&m.n_transforms) {
            return invalid(format!(
                "mining.n_transforms must be in 1..=4, got {}", m.n_transforms
            ));
        }
        if m.pool_size == 0 {
            return invalid("mining.pool_size must be positive".into());
        }
        if m.neg_pos_ratio.is_nan() || m.neg_pos_ratio < 0.0 {
            return invalid(format!(
                "mining.neg_pos_ratio must be non-negative, got {}",
                m.neg_pos_ratio
            ));
        }
        let p = &self.perturbation;
        if p.shift < 0.0 || p.rotation < 0.0 || !(0.0..1.0).contains(&p.scale) {
            return invalid(format!("perturbation out of range: {p:?}"));
        }
        Ok(())
    }


    /// Resolved number of mining workers.
    pub fn workers(&self) -> usize {
        if self.n_threads == 0 {
            rayon::current_num_threads()
        } else {
            self.n_threads
        }
    }


    /// Set the number of landmarks.
    pub fn n_landmarks(mut self, n_landmarks: usize) -> Self {
        self.n_landmarks = n_landmarks;
        self
    }


    /// Set the patch side length.
    pub fn patch_size(mut self, patch_size: u32) -> Self {
        self.patch_size = patch_size;
        self
    }


    /// Set the number of mining workers.
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }


    /// Replace the mining parameters.
    pub fn mining(mut self, mining: MiningConfig) -> Self {
        self.mining = mining;
        self
    }


    /// Replace the perturbation parameters.
    pub fn perturbation(mut self, perturbation: PerturbationConfig) -> Self {
        self.perturbation = perturbation;
        self
    }
}
