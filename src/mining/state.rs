use image::GrayImage;

use crate::{
    MiningConfig,
    Patch,
    Transform,
};


/// A square candidate region of a background image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Side length.
    pub size: u32,
    /// Variant applied to the crop.
    pub transform: Transform,
}


/// Cursor of one mining worker.
///
/// A state sweeps the background it holds in a fixed order:
/// the transform loop is the outermost one, then the scale loop,
/// then the raster order over positions.
/// Each worker owns its state exclusively during a mining round,
/// and the state is kept by the generator between rounds.
#[derive(Debug)]
pub struct MiningState {
    thread_id: usize,
    current_idx: Option<usize>,
    pub(super) current_hd_idx: Option<usize>,
    factor: f64,
    x: u32,
    y: u32,
    win_size: u32,
    transform_idx: usize,
    step: u32,
    reset: bool,
    bg_img: Option<GrayImage>,
    // backgrounds claimed since the last flush into the shared counters
    pub(super) claimed: usize,
}


impl MiningState {
    /// A fresh state. It holds no background yet.
    pub fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            current_idx: None,
            current_hd_idx: None,
            factor: 1f64,
            x: 0,
            y: 0,
            win_size: 0,
            transform_idx: 0,
            step: 1,
            reset: true,
            bg_img: None,
            claimed: 0,
        }
    }


    /// Index of the worker owning this state.
    #[inline]
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }


    /// Index of the background being scanned, if any.
    #[inline]
    pub fn current_bg_index(&self) -> Option<usize> {
        self.current_idx
    }


    /// Index of the last hard negative taken from the pool, if any.
    #[inline]
    pub fn current_hard_index(&self) -> Option<usize> {
        self.current_hd_idx
    }


    /// Returns `true` if the current background is exhausted
    /// and a new one must be claimed.
    #[inline]
    pub fn is_reset(&self) -> bool {
        self.reset
    }


    /// Start sweeping the `idx`-th background.
    ///
    /// Returns `false` if the background is smaller than
    /// the minimal window; the state then stays reset.
    pub fn begin(&mut self, idx: usize, image: GrayImage, config: &MiningConfig) -> bool {
        self.current_idx = Some(idx);
        let side = image.width().min(image.height());
        if side < config.min_window {
            self.bg_img = None;
            self.reset = true;
            return false;
        }

        self.bg_img = Some(image);
        self.factor = 1f64;
        self.x = 0;
        self.y = 0;
        self.win_size = config.min_window;
        self.transform_idx = 0;
        self.step = step_for(self.win_size, config.step_ratio);
        self.reset = false;
        true
    }


    /// The next window of the sweep, or `None` once the background
    /// is exhausted.
    pub fn next_window(&mut self, config: &MiningConfig) -> Option<Window> {
        if self.reset {
            return None;
        }
        let (width, height) = self.bg_img.as_ref()?.dimensions();
        let transform = match Transform::nth(self.transform_idx) {
            Some(t) => t,
            None => {
                self.reset = true;
                return None;
            },
        };

        let window = Window {
            x: self.x,
            y: self.y,
            size: self.win_size,
            transform,
        };
        self.advance(config, width, height);
        Some(window)
    }


    /// The next candidate patch cropped from the current background.
    pub fn next_patch(&mut self, config: &MiningConfig, patch_size: u32) -> Option<Patch> {
        let window = self.next_window(config)?;
        let image = self.bg_img.as_ref()?;
        Some(Patch::from_window(
            image,
            window.x,
            window.y,
            window.size,
            window.transform,
            patch_size,
        ))
    }


    fn advance(&mut self, config: &MiningConfig, width: u32, height: u32) {
        self.x += self.step;
        if self.x + self.win_size <= width {
            return;
        }
        self.x = 0;
        self.y += self.step;
        if self.y + self.win_size <= height {
            return;
        }

        // next scale level
        self.y = 0;
        self.factor *= config.scale_factor;
        let grown = (config.min_window as f64 * self.factor).round() as u32;
        self.win_size = grown.max(self.win_size + 1);

        if self.win_size > width.min(height) {
            // next transform
            self.transform_idx += 1;
            self.factor = 1f64;
            self.win_size = config.min_window;
            if self.transform_idx >= config.n_transforms {
                self.reset = true;
            }
        }
        self.step = step_for(self.win_size, config.step_ratio);
    }
}


fn step_for(win_size: u32, step_ratio: f64) -> u32 {
    ((win_size as f64 * step_ratio).round() as u32).max(1)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_transforms: usize) -> MiningConfig {
        MiningConfig {
            min_window: 16,
            scale_factor: 2.0,
            step_ratio: 0.5,
            n_transforms,
            ..MiningConfig::default()
        }
    }

    fn sweep(state: &mut MiningState, config: &MiningConfig) -> Vec<Window> {
        std::iter::from_fn(|| state.next_window(config)).collect()
    }

    #[test]
    fn fresh_state_is_reset() {
        let mut state = MiningState::new(3);
        assert!(state.is_reset());
        assert_eq!(state.thread_id(), 3);
        assert!(state.next_window(&config(1)).is_none());
    }

    #[test]
    fn sweeps_positions_then_scales() {
        let config = config(1);
        let mut state = MiningState::new(0);
        assert!(state.begin(0, GrayImage::new(32, 32), &config));

        let windows = sweep(&mut state, &config);
        assert_eq!(windows.len(), 10);
        assert_eq!(windows[0], Window { x: 0, y: 0, size: 16, transform: Transform::Identity });
        assert_eq!(windows[1].x, 8);
        assert_eq!(windows[3], Window { x: 0, y: 8, size: 16, transform: Transform::Identity });
        assert_eq!(windows[9].size, 32);
        assert!(state.is_reset());
    }

    #[test]
    fn transforms_are_the_outer_loop() {
        let config = config(2);
        let mut state = MiningState::new(0);
        state.begin(0, GrayImage::new(32, 32), &config);

        let windows = sweep(&mut state, &config);
        assert_eq!(windows.len(), 20);
        assert!(windows[..10].iter().all(|w| w.transform == Transform::Identity));
        assert!(windows[10..].iter().all(|w| w.transform == Transform::FlipHorizontal));
    }

    #[test]
    fn windows_stay_inside_the_background() {
        let config = MiningConfig {
            min_window: 10,
            scale_factor: 1.3,
            step_ratio: 0.3,
            n_transforms: 1,
            ..MiningConfig::default()
        };
        let mut state = MiningState::new(0);
        state.begin(0, GrayImage::new(47, 29), &config);
        let windows = sweep(&mut state, &config);
        assert!(!windows.is_empty());
        assert!(windows.iter().all(|w| w.x + w.size <= 47 && w.y + w.size <= 29));
    }

    #[test]
    fn small_background_is_skipped() {
        let config = config(1);
        let mut state = MiningState::new(0);
        assert!(!state.begin(5, GrayImage::new(8, 40), &config));
        assert!(state.is_reset());
        assert_eq!(state.current_bg_index(), Some(5));
        assert!(state.next_patch(&config, 8).is_none());
    }
}
