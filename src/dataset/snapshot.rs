use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::GrayImage;

use super::data_set::{DataSet, Polarity, ShapeMask};
use crate::{
    Patch,
    Shape,
    common::{checker, utils},
    error::{JdaError, Result},
};


const MAGIC: &[u8; 4] = b"JDAD";
const VERSION: u32 = 1;
const GRAY: u8 = 1;


impl DataSet {
    /// Write both pools to `path`.
    ///
    /// The file is first written to `<path>.tmp` and then renamed,
    /// so a crash never leaves a half-written snapshot at `path`.
    pub fn snapshot<P>(path: P, pos: &DataSet, neg: &DataSet) -> Result<()>
        where P: AsRef<Path>
    {
        checker::positive(pos, "snapshot");
        checker::negative(neg, "snapshot");

        let path = path.as_ref();
        let tmp = tmp_path(path);

        let written = File::create(&tmp)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                writer.write_all(MAGIC)?;
                writer.write_u32::<LittleEndian>(VERSION)?;
                write_pool(&mut writer, pos)?;
                write_pool(&mut writer, neg)?;
                writer.flush()
            })
            .and_then(|_| fs::rename(&tmp, path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::info!(
            path = %path.display(),
            positives = pos.len(),
            negatives = neg.len(),
            "snapshot written"
        );
        Ok(())
    }


    /// Restore both pools from a file written by [`DataSet::snapshot`].
    ///
    /// Everything is decoded before `pos` and `neg` are touched,
    /// so on error both stores keep their previous state.
    /// The hard negative generator attached to `neg` is kept.
    pub fn resume<P>(path: P, pos: &mut DataSet, neg: &mut DataSet) -> Result<()>
        where P: AsRef<Path>
    {
        checker::positive(pos, "resume");
        checker::negative(neg, "resume");

        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let (new_pos, new_neg) = decode(&bytes).map_err(|e| match e {
            JdaError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                JdaError::Snapshot("truncated record".into())
            },
            e => e,
        })?;

        tracing::info!(
            path = %path.display(),
            positives = new_pos.len(),
            negatives = new_neg.len(),
            "snapshot resumed"
        );
        pos.adopt(new_pos);
        neg.adopt(new_neg);
        Ok(())
    }


    /// Write every sample image to `dir/{index:06}.png`.
    /// `dir` is created if needed.
    pub fn dump<P>(&self, dir: P) -> Result<()>
        where P: AsRef<Path>
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for (i, patch) in self.images.iter().enumerate() {
            let path = dir.join(format!("{i:06}.png"));
            patch.image()
                .save(&path)
                .map_err(|source| JdaError::Image { path, source })?;
        }
        tracing::debug!(dir = %dir.display(), size = self.len(), "images dumped");
        Ok(())
    }
}


fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}


fn write_shape<W: Write>(writer: &mut W, shape: &Shape) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(shape.coords().len() as u32)?;
    for &c in shape.coords() {
        writer.write_f64::<LittleEndian>(c)?;
    }
    Ok(())
}


fn write_pool<W: Write>(writer: &mut W, data: &DataSet) -> io::Result<()> {
    let polarity = match data.polarity {
        Polarity::Positive => 1u8,
        Polarity::Negative => 0u8,
    };
    writer.write_u8(polarity)?;
    writer.write_u64::<LittleEndian>(data.len() as u64)?;

    for i in 0..data.len() {
        let image = data.images[i].image();
        writer.write_u32::<LittleEndian>(image.width())?;
        writer.write_u32::<LittleEndian>(image.height())?;
        writer.write_u8(GRAY)?;
        writer.write_all(image.as_raw())?;

        match &data.gt_shapes[i] {
            Some(shape) => {
                writer.write_u8(1)?;
                write_shape(writer, shape)?;
            },
            None => writer.write_u8(0)?,
        }
        write_shape(writer, &data.current_shapes[i])?;

        writer.write_f64::<LittleEndian>(data.scores[i])?;
        writer.write_f64::<LittleEndian>(data.last_scores[i])?;
        writer.write_f64::<LittleEndian>(data.weights[i])?;
        writer.write_i8(data.shape_mask[i].to_i8())?;
    }

    write_shape(writer, &data.mean_shape)?;
    writer.write_u8(data.is_sorted as u8)
}


fn decode(bytes: &[u8]) -> Result<(DataSet, DataSet)> {
    let mut reader = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(JdaError::Snapshot("bad magic".into()));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(JdaError::Snapshot(
            format!("unsupported version {version}")
        ));
    }

    let pos = read_pool(&mut reader, Polarity::Positive)?;
    let neg = read_pool(&mut reader, Polarity::Negative)?;

    let rest = remaining(&reader);
    if rest != 0 {
        return Err(JdaError::Snapshot(
            format!("{rest} trailing bytes")
        ));
    }
    Ok((pos, neg))
}


fn remaining(reader: &Cursor<&[u8]>) -> usize {
    reader.get_ref()
        .len()
        .saturating_sub(reader.position() as usize)
}


// Lengths are checked against the unread bytes before allocating.
fn ensure(reader: &Cursor<&[u8]>, n_bytes: u64) -> Result<()> {
    if n_bytes > remaining(reader) as u64 {
        return Err(JdaError::Snapshot("truncated record".into()));
    }
    Ok(())
}


fn read_shape(reader: &mut Cursor<&[u8]>) -> Result<Shape> {
    let n_coords = reader.read_u32::<LittleEndian>()?;
    if n_coords % 2 != 0 {
        return Err(JdaError::Snapshot(
            format!("shape with odd number of coordinates {n_coords}")
        ));
    }
    ensure(reader, n_coords as u64 * 8)?;
    let coords = (0..n_coords)
        .map(|_| reader.read_f64::<LittleEndian>())
        .collect::<io::Result<Vec<_>>>()?;
    Ok(Shape::new(coords))
}


fn read_pool(reader: &mut Cursor<&[u8]>, expected: Polarity) -> Result<DataSet> {
    let polarity = match reader.read_u8()? {
        1 => Polarity::Positive,
        0 => Polarity::Negative,
        flag => {
            return Err(JdaError::Snapshot(format!("unknown polarity {flag}")));
        },
    };
    if polarity != expected {
        return Err(JdaError::Snapshot(
            format!("expected a {expected:?} pool, found {polarity:?}")
        ));
    }

    let count = reader.read_u64::<LittleEndian>()?;
    let mut data = DataSet::new(polarity);

    for _ in 0..count {
        let width = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;
        let channels = reader.read_u8()?;
        if channels != GRAY {
            return Err(JdaError::Snapshot(
                format!("expected a gray image, found {channels} channels")
            ));
        }
        let n_pixels = width as u64 * height as u64;
        ensure(reader, n_pixels)?;
        let mut pixels = vec![0u8; n_pixels as usize];
        reader.read_exact(&mut pixels)?;
        let image = GrayImage::from_raw(width, height, pixels)
            .ok_or_else(|| JdaError::Snapshot("inconsistent image size".into()))?;

        let gt_shape = match reader.read_u8()? {
            1 => Some(read_shape(reader)?),
            0 => None,
            flag => {
                return Err(JdaError::Snapshot(
                    format!("unknown ground-truth marker {flag}")
                ));
            },
        };
        let current_shape = read_shape(reader)?;

        let score = reader.read_f64::<LittleEndian>()?;
        let last_score = reader.read_f64::<LittleEndian>()?;
        let weight = reader.read_f64::<LittleEndian>()?;
        let mask = ShapeMask::from_i8(reader.read_i8()?)
            .ok_or_else(|| JdaError::Snapshot("unknown shape mask".into()))?;

        let consistent = match (polarity, &gt_shape, mask) {
            (Polarity::Negative, None, ShapeMask::Missing) => true,
            (Polarity::Negative, _, _) => false,
            (Polarity::Positive, None, ShapeMask::Annotated) => false,
            (Polarity::Positive, _, _) => true,
        };
        if !consistent {
            return Err(JdaError::Snapshot(
                "shape mask disagrees with the ground-truth shape".into()
            ));
        }

        data.images.push(Patch::new(image));
        data.gt_shapes.push(gt_shape);
        data.shape_mask.push(mask);
        data.current_shapes.push(current_shape);
        data.scores.push(score);
        data.last_scores.push(last_score);
        data.weights.push(weight);
    }

    data.mean_shape = read_shape(reader)?;
    // the stored flag byte is skipped, the scores decide
    reader.read_u8()?;
    data.is_sorted = utils::first_ascent(&data.scores).is_none();

    Ok(data)
}
