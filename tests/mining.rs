mod common;

use std::path::PathBuf;

use jda::prelude::*;

use common::*;


fn quiet_config(n_threads: usize, pool_size: usize) -> Config {
    let mining = MiningConfig {
        min_window: 16,
        scale_factor: 2.0,
        step_ratio: 0.5,
        n_transforms: 2,
        pool_size,
        verbose: false,
        ..MiningConfig::default()
    };
    Config::default()
        .patch_size(12)
        .n_threads(n_threads)
        .mining(mining)
}


/// Tests for `NegGenerator`.
#[cfg(test)]
pub mod neg_generator_tests {
    use super::*;

    #[test]
    fn accept_all_fills_the_request() {
        let dir = temp_dir("accept-all");
        // 20 windows per background with the config above
        let list = write_backgrounds(&dir, 6, 32, 32);
        let config = quiet_config(3, 4);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.75 };
        let outcome = generator.generate(&cascade, 50);

        assert!(outcome.real_size() >= 50);
        assert!(outcome.real_size() < 50 + 3 * 4);
        assert_eq!(outcome.scores.len(), outcome.real_size());
        assert_eq!(outcome.shapes.len(), outcome.real_size());
        assert!(outcome.scores.iter().all(|&s| s == 0.75));
        assert!(outcome.images.iter().all(|p| p.image().dimensions() == (12, 12)));
        assert!(outcome.stats.carts_n >= outcome.real_size());
        assert!(generator.report_bg_image_used() <= 6);
    }

    #[test]
    fn exhaustion_returns_short() {
        let dir = temp_dir("exhaustion");
        let list = write_backgrounds(&dir, 2, 32, 32);
        let config = quiet_config(2, 3);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        let outcome = generator.generate(&cascade, 1_000);
        assert_eq!(outcome.real_size(), 40);
        assert_eq!(outcome.stats.nega_n, 2);
        assert_eq!(generator.report_bg_image_used(), 2);

        // every background was scanned, so a second round finds nothing
        let outcome = generator.generate(&cascade, 10);
        assert_eq!(outcome.real_size(), 0);

        generator.rewind();
        let outcome = generator.generate(&cascade, 10);
        assert!(outcome.real_size() >= 10);
    }

    #[test]
    fn half_scanned_background_is_resumed() {
        let dir = temp_dir("resume-sweep");
        // 20 windows per background
        let list = write_backgrounds(&dir, 2, 32, 32);
        let config = quiet_config(1, 4);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        let first = generator.generate(&cascade, 5);
        assert_eq!(first.real_size(), 8);
        assert_eq!(generator.report_bg_image_used(), 1);

        // the 12 windows left in the first background come before the second one
        let second = generator.generate(&cascade, 100);
        assert_eq!(second.real_size(), 32);
        assert_eq!(second.stats.nega_n, 1);
        assert_eq!(first.real_size() + second.real_size(), 40);
    }

    #[test]
    fn rewind_drops_backgrounds_in_flight() {
        let dir = temp_dir("rewind-sweep");
        let list = write_backgrounds(&dir, 1, 32, 32);
        let config = quiet_config(1, 4);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        assert_eq!(generator.generate(&cascade, 4).real_size(), 4);

        generator.rewind();
        assert_eq!(generator.generate(&cascade, 100).real_size(), 20);
    }

    #[test]
    fn reject_all_finds_nothing() {
        let dir = temp_dir("reject-all");
        let list = write_backgrounds(&dir, 3, 32, 32);
        let config = quiet_config(2, 5);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());

        let outcome = generator.generate(&RejectAll(Shape::zeros(2)), 5);
        assert_eq!(outcome.real_size(), 0);
        assert_eq!(outcome.stats.carts_n, 60);
        assert_eq!(outcome.stats.ratio, 0.0);
    }

    #[test]
    fn no_background_and_zero_size() {
        let config = quiet_config(2, 4);
        let mut generator = NegGenerator::new(&config);
        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };

        assert_eq!(generator.generate(&cascade, 10).real_size(), 0);
        assert_eq!(generator.generate(&cascade, 0).real_size(), 0);
        assert_eq!(generator.report_bg_image_used(), 0);
    }

    #[test]
    fn unreadable_backgrounds_are_skipped() {
        let dir = temp_dir("unreadable");
        let list = write_backgrounds(&dir, 1, 32, 32);
        let mut paths = vec![PathBuf::from("/nonexistent/bg.png")];
        paths.extend(read_list(&list).unwrap());

        let mut generator = NegGenerator::new(&quiet_config(1, 4));
        generator.load(paths);

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        let outcome = generator.generate(&cascade, 100);
        assert_eq!(outcome.real_size(), 20);
        assert_eq!(outcome.stats.nega_n, 2);
    }

    #[test]
    fn hard_negatives_are_used_first() {
        let config = quiet_config(1, 2);
        let mut generator = NegGenerator::new(&config);
        generator.push_hard_negatives((0..3).map(|v| patch(200 + v, 12)));

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        let outcome = generator.generate(&cascade, 3);
        assert_eq!(outcome.real_size(), 3);
        assert_eq!(outcome.stats.hard_used, 3);
        assert_eq!(generator.n_hard_negatives(), 0);

        let mut values = outcome.images.iter()
            .map(|p| p.image().get_pixel(0, 0)[0])
            .collect::<Vec<_>>();
        values.sort_unstable();
        assert_eq!(values, vec![200, 201, 202]);
    }

    #[test]
    fn staged_cascade_filters_candidates() {
        let dir = temp_dir("staged");
        let list = write_backgrounds(&dir, 2, 32, 32);
        let mut generator = NegGenerator::new(&quiet_config(2, 4));
        generator.load(read_list(&list).unwrap());

        struct Bright;
        impl Cart for Bright {
            fn score(&self, patch: &Patch, _: &Shape) -> f64 {
                patch.image().get_pixel(0, 0)[0] as f64 - 128.0
            }
            fn threshold(&self) -> f64 {
                0.0
            }
        }
        let mut cascade = StagedCascade::new(Shape::zeros(2));
        cascade.push_stage(vec![Bright]);

        let outcome = generator.generate(&cascade, 1_000);
        assert!(outcome.real_size() < 40);
        for (patch, &score) in outcome.images.iter().zip(&outcome.scores) {
            assert!(score >= 0.0);
            assert_eq!(cascade.score(patch, &Shape::zeros(2)), score);
        }
    }
}


/// Tests for `DataSet::more_neg_samples`.
#[cfg(test)]
pub mod more_neg_samples_tests {
    use super::*;

    #[test]
    fn fills_the_deficit() {
        let dir = temp_dir("more-neg");
        let list = write_backgrounds(&dir, 4, 32, 32);
        let config = quiet_config(2, 2);

        let mut generator = NegGenerator::new(&config);
        generator.load(read_list(&list).unwrap());
        let mut neg = negatives(&[0.0; 5]).with_generator(generator);

        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.5 };
        let added = neg.more_neg_samples(&cascade, 10, 2.0);

        assert!(added >= 15);
        assert_eq!(neg.len(), 5 + added);
        assert!(neg.is_aligned());
        let expected = 0.5f64.exp();
        assert!(neg.weights()[5..].iter().all(|w| (w - expected).abs() < 1e-12));
    }

    #[test]
    fn no_deficit_means_no_mining() {
        let mut neg = negatives(&[0.0; 8]);
        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        assert_eq!(neg.more_neg_samples(&cascade, 4, 1.0), 0);
        assert_eq!(neg.len(), 8);
        assert_eq!(neg.generator().report_bg_image_used(), 0);
    }

    #[test]
    fn shortfall_is_tolerated() {
        let mut neg = DataSet::negative();
        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        assert_eq!(neg.more_neg_samples(&cascade, 100, 1.0), 0);
        assert!(neg.is_empty());
    }

    #[test]
    #[should_panic]
    fn positives_cannot_mine() {
        let mut pos = positives(&[0.0]);
        let cascade = AcceptAll { mean_shape: Shape::zeros(2), score: 0.0 };
        pos.more_neg_samples(&cascade, 1, 1.0);
    }
}


/// Tests for the per-worker cursor.
#[cfg(test)]
pub mod mining_state_tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn patches_have_the_patch_size() {
        let config = quiet_config(1, 1).mining;
        let mut state = MiningState::new(0);
        state.begin(0, GrayImage::new(40, 40), &config);

        let mut n = 0;
        while let Some(patch) = state.next_patch(&config, 12) {
            assert_eq!(patch.image().dimensions(), (12, 12));
            n += 1;
        }
        assert!(n > 0);
        assert!(state.is_reset());
    }
}
