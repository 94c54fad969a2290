#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use jda::prelude::*;


/// A fresh directory under the system temp dir, unique per test.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("jda-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}


/// A constant gray patch.
pub fn patch(value: u8, size: u32) -> Patch {
    Patch::new(GrayImage::from_pixel(size, size, Luma([value])))
}


/// A negative data set with the given scores.
pub fn negatives(scores: &[f64]) -> DataSet {
    let mut neg = DataSet::negative();
    for (i, &s) in scores.iter().enumerate() {
        neg.push(Record::new(patch(i as u8, 8), Shape::zeros(2)).score(s));
    }
    neg
}


/// A positive data set with the given scores.
/// Every even sample has a ground-truth shape.
pub fn positives(scores: &[f64]) -> DataSet {
    let mut pos = DataSet::positive();
    for (i, &s) in scores.iter().enumerate() {
        let current = Shape::new(vec![0.3, 0.4, 0.7, 0.4]);
        let record = Record::new(patch(i as u8, 8), current).score(s);
        let record = if i % 2 == 0 {
            let v = 0.1 * i as f64;
            record.gt_shape(Shape::new(vec![0.3 + v, 0.5, 0.7, 0.5 - v / 2.0]))
        } else {
            record
        };
        pos.push(record);
    }
    pos
}


/// Write `n` noisy backgrounds of `width x height` pixels
/// and a list file naming them. Returns the list file.
pub fn write_backgrounds(dir: &Path, n: usize, width: u32, height: u32) -> PathBuf {
    let mut lines = Vec::new();
    for k in 0..n {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 7 + y * 13 + k as u32 * 31) % 251) as u8])
        });
        let path = dir.join(format!("bg{k}.png"));
        image.save(&path).unwrap();
        lines.push(path.display().to_string());
    }
    let list = dir.join("bg.txt");
    fs::write(&list, lines.join("\n")).unwrap();
    list
}


/// Accepts every candidate with a fixed score.
pub struct AcceptAll {
    pub mean_shape: Shape,
    pub score: f64,
}


impl Cascade for AcceptAll {
    fn mean_shape(&self) -> &Shape {
        &self.mean_shape
    }

    fn validate(&self, _: &Patch) -> Verdict {
        Verdict {
            is_face: true,
            score: self.score,
            shape: self.mean_shape.clone(),
            n_carts: 1,
        }
    }
}


/// Rejects every candidate.
pub struct RejectAll(pub Shape);


impl Cascade for RejectAll {
    fn mean_shape(&self) -> &Shape {
        &self.0
    }

    fn validate(&self, _: &Patch) -> Verdict {
        Verdict {
            is_face: false,
            score: -1.0,
            shape: self.0.clone(),
            n_carts: 1,
        }
    }
}


/// A cart returning the mean intensity of the patch, scaled.
pub struct MeanIntensity(pub f64);


impl Cart for MeanIntensity {
    fn score(&self, patch: &Patch, _: &Shape) -> f64 {
        let pixels = patch.image().as_raw();
        let sum = pixels.iter().map(|&p| p as f64).sum::<f64>();
        self.0 * sum / pixels.len() as f64
    }
}
