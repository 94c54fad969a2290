use std::fs;
use std::path::{Path, PathBuf};

use image::imageops;
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use super::data_set::{DataSet, Record};
use crate::{
    Config,
    NegGenerator,
    Patch,
    Shape,
    error::{JdaError, Result},
    patch::{load_gray, resize},
};


/// Read a list file: one path per line.
/// Blank lines and lines starting with `#` are skipped.
pub fn read_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path.as_ref())?;
    let paths = text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect();
    Ok(paths)
}


/// Read a master list whose lines are list files,
/// and concatenate the paths of every listed file in order.
pub fn read_nested_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for list in read_list(path)? {
        paths.extend(read_list(list)?);
    }
    Ok(paths)
}


// One parsed line of a face list.
struct FaceEntry {
    line: usize,
    path: PathBuf,
    bbox: [f64; 4],
    landmarks: Vec<f64>,
}


fn parse_face_line(
    list: &Path,
    line: usize,
    text: &str,
    n_landmarks: usize,
) -> Result<FaceEntry>
{
    let malformed = |reason: String| JdaError::MalformedList {
        path: list.to_path_buf(),
        line,
        reason,
    };

    let mut tokens = text.split_whitespace();
    let path = tokens.next()
        .map(PathBuf::from)
        .ok_or_else(|| malformed("empty line".into()))?;
    let values = tokens
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| malformed(format!("`{tok}` is not a number")))
        })
        .collect::<Result<Vec<_>>>()?;

    let expected = 4 + 2 * n_landmarks;
    if values.len() != expected {
        return Err(malformed(format!(
            "expected {expected} numbers after the path, found {}",
            values.len()
        )));
    }
    let bbox = [values[0], values[1], values[2], values[3]];
    if bbox[2] < 1f64 || bbox[3] < 1f64 {
        return Err(malformed("the face box is empty".into()));
    }
    let landmarks = values[4..].to_vec();
    Ok(FaceEntry { line, path, bbox, landmarks })
}


fn load_face(list: &Path, entry: &FaceEntry, patch_size: u32) -> Result<Record> {
    let image = load_gray(&entry.path)?;
    let [x, y, w, h] = entry.bbox;

    let left = x.max(0f64).round() as u32;
    let top = y.max(0f64).round() as u32;
    let right = ((x + w).round() as u32).min(image.width());
    let bottom = ((y + h).round() as u32).min(image.height());
    if right <= left || bottom <= top {
        return Err(JdaError::MalformedList {
            path: list.to_path_buf(),
            line: entry.line,
            reason: format!("the face box lies outside `{}`", entry.path.display()),
        });
    }
    let crop = imageops::crop_imm(&image, left, top, right - left, bottom - top)
        .to_image();
    let patch = Patch::new(resize(&crop, patch_size, patch_size));

    let n_landmarks = entry.landmarks.len() / 2;
    let record = Record::new(patch, Shape::zeros(n_landmarks));
    if entry.landmarks.iter().any(|c| *c < 0f64) {
        return Ok(record);
    }
    // normalize to the cropped region, which is clamped to the image
    let (x0, y0) = (left as f64, top as f64);
    let (cw, ch) = ((right - left) as f64, (bottom - top) as f64);
    let coords = entry.landmarks
        .chunks_exact(2)
        .flat_map(|p| [(p[0] - x0) / cw, (p[1] - y0) / ch])
        .collect::<Vec<_>>();
    Ok(record.gt_shape(Shape::new(coords)))
}


/// Read the positive data set from a face list.
///
/// Each line reads `path x y w h x1 y1 ... xL yL`,
/// the face box followed by absolute landmark coordinates.
/// The box is cropped and resized to `patch_size`,
/// and the landmarks are normalized to the box clamped to the image.
/// A line with any negative landmark coordinate yields a face
/// without ground-truth shape.
pub(crate) fn read_positive<P>(path: P, config: &Config) -> Result<DataSet>
    where P: AsRef<Path>
{
    let list = path.as_ref();
    let text = fs::read_to_string(list)?;
    let entries = text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| parse_face_line(list, line, text, config.n_landmarks))
        .collect::<Result<Vec<_>>>()?;

    let records = entries.par_iter()
        .map(|entry| load_face(list, entry, config.patch_size))
        .collect::<Result<Vec<_>>>()?;

    let mut pos = DataSet::positive();
    pos.extend(records);
    Ok(pos)
}


/// Read pre-generated negative samples.
/// Every entry of `lists` is a master list (see [`read_nested_list`]),
/// and every image is resized to `patch_size`.
pub(crate) fn read_negative(lists: &[PathBuf], config: &Config) -> Result<DataSet> {
    let mut paths = Vec::new();
    for list in lists {
        paths.extend(read_nested_list(list)?);
    }

    let size = config.patch_size;
    let n_landmarks = config.n_landmarks;
    let records = paths.par_iter()
        .map(|path| {
            let image = load_gray(path)?;
            let patch = Patch::new(resize(&image, size, size));
            Ok(Record::new(patch, Shape::zeros(n_landmarks)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut neg = DataSet::negative();
    neg.extend(records);
    Ok(neg)
}


/// Loads the positive and the negative data sets together.
///
/// The paths default to those of the [`Config`];
/// each setter overrides or extends them.
///
/// # Example
/// ```no_run
/// use jda::prelude::*;
///
/// let config = Config::from_json_file("config.json").unwrap();
/// let (pos, neg) = DataSetReader::new(&config)
///     .face_list("data/face.txt")
///     .background_list("data/bg.txt")
///     .seed(1234)
///     .read()
///     .unwrap();
/// ```
pub struct DataSetReader<'a> {
    config: &'a Config,
    face_list: Option<PathBuf>,
    negative_lists: Vec<PathBuf>,
    background_lists: Vec<PathBuf>,
    seed: Option<u64>,
}


impl<'a> DataSetReader<'a> {
    /// Construct a new instance of [`DataSetReader`].
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            face_list: config.face_list.clone(),
            negative_lists: config.negative_lists.clone(),
            background_lists: config.background_lists.clone(),
            seed: None,
        }
    }


    /// Set the face list.
    pub fn face_list<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.face_list = Some(path.as_ref().to_path_buf());
        self
    }


    /// Add a master list of pre-generated negative samples.
    pub fn negative_list<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.negative_lists.push(path.as_ref().to_path_buf());
        self
    }


    /// Add a master list of background images.
    pub fn background_list<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.background_lists.push(path.as_ref().to_path_buf());
        self
    }


    /// Seed of the shape initialization.
    /// Without a seed, the generator is seeded from the OS.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }


    /// Reads both data sets.
    ///
    /// The mean shape is computed from the annotated faces and
    /// shared by both pools, every current shape is a random perturbation
    /// of it, and the background images are handed to
    /// the [`NegGenerator`] of the negative data set.
    pub fn read(self) -> Result<(DataSet, DataSet)> {
        let config = self.config;
        config.validate()?;
        let face_list = self.face_list
            .ok_or_else(|| JdaError::InvalidConfig("the face list is not set".into()))?;

        let mut pos = read_positive(&face_list, config)?;
        let mut neg = read_negative(&self.negative_lists, config)?;

        let mut mean_shape = pos.calc_mean_shape();
        if mean_shape.is_empty() {
            tracing::warn!("no annotated face, the mean shape falls back to zeros");
            mean_shape = Shape::zeros(config.n_landmarks);
            pos.set_mean_shape(mean_shape.clone());
        }
        neg.set_mean_shape(mean_shape.clone());

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        pos.reset_current_shapes(&mean_shape, &config.perturbation, &mut rng);
        neg.reset_current_shapes(&mean_shape, &config.perturbation, &mut rng);

        let mut generator = NegGenerator::new(config);
        for list in &self.background_lists {
            generator.load(read_nested_list(list)?);
        }
        let n_backgrounds = generator.n_backgrounds();
        let neg = neg.with_generator(generator);

        tracing::info!(
            positives = pos.len(),
            negatives = neg.len(),
            backgrounds = n_backgrounds,
            "data sets loaded"
        );
        Ok((pos, neg))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_line_is_parsed() {
        let entry = parse_face_line(
            Path::new("face.txt"), 1, "a.png 10 20 30 40 12 22 35 50", 2
        ).unwrap();
        assert_eq!(entry.path, PathBuf::from("a.png"));
        assert_eq!(entry.bbox, [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(entry.landmarks, vec![12.0, 22.0, 35.0, 50.0]);
    }

    #[test]
    fn face_line_with_wrong_arity_fails() {
        let err = parse_face_line(Path::new("face.txt"), 7, "a.png 1 2 3 4 5", 2);
        match err {
            Err(JdaError::MalformedList { line, .. }) => assert_eq!(line, 7),
            _ => panic!("expected a malformed list error"),
        }
    }

    #[test]
    fn clamped_box_normalizes_landmarks() {
        let dir = std::env::temp_dir()
            .join(format!("jda-clamped-box-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("face.png");
        image::GrayImage::new(64, 48).save(&path).unwrap();

        // the box reaches past the right and bottom edges
        let entry = FaceEntry {
            line: 1,
            path,
            bbox: [40.0, 20.0, 40.0, 40.0],
            landmarks: vec![46.0, 27.0, 58.0, 41.0],
        };
        let record = load_face(Path::new("face.txt"), &entry, 16).unwrap();
        let gt = record.gt_shape.unwrap();
        assert_eq!(gt.coords(), &[0.25, 0.25, 0.75, 0.75]);
    }

    #[test]
    fn face_line_with_garbage_fails() {
        let err = parse_face_line(Path::new("face.txt"), 1, "a.png 1 2 x 4", 0);
        assert!(matches!(err, Err(JdaError::MalformedList { .. })));
    }
}
