mod common;

use std::fs;

use image::{GrayImage, Luma};
use jda::prelude::*;

use common::*;


/// Tests for the list readers and `DataSetReader`.
#[cfg(test)]
pub mod reader_tests {
    use super::*;

    fn write_faces(dir: &std::path::Path) -> std::path::PathBuf {
        let face = GrayImage::from_fn(64, 48, |x, y| Luma([(x + y) as u8]));
        let path = dir.join("face.png");
        face.save(&path).unwrap();

        let p = path.display();
        let list = dir.join("face.txt");
        fs::write(
            &list,
            format!(
                "# path x y w h landmarks\n\
                {p} 8 8 32 32 16 16 32 24\n\
                \n\
                {p} 0 0 40 40 -1 -1 20 20\n\
                {p} 10 4 20 20 15 9 25 14\n"
            ),
        ).unwrap();
        list
    }

    #[test]
    fn read_list_skips_comments_and_blanks() {
        let dir = temp_dir("read-list");
        let list = dir.join("list.txt");
        fs::write(&list, "a.png\n\n# comment\n  b.png  \n").unwrap();

        let paths = read_list(&list).unwrap();
        assert_eq!(paths, vec![
            std::path::PathBuf::from("a.png"),
            std::path::PathBuf::from("b.png"),
        ]);
    }

    #[test]
    fn nested_list_concatenates_in_order() {
        let dir = temp_dir("nested-list");
        let first = dir.join("first.txt");
        let second = dir.join("second.txt");
        fs::write(&first, "a.png\nb.png\n").unwrap();
        fs::write(&second, "c.png\n").unwrap();
        let master = dir.join("master.txt");
        fs::write(&master, format!("{}\n{}\n", first.display(), second.display())).unwrap();

        let paths = read_nested_list(&master).unwrap();
        let names = paths.iter()
            .map(|p| p.to_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn reads_both_pools() {
        let dir = temp_dir("data-set-reader");
        let faces = write_faces(&dir);

        let bg_list = write_backgrounds(&dir, 3, 32, 32);
        let master = dir.join("bg-master.txt");
        fs::write(&master, bg_list.display().to_string()).unwrap();

        let config = Config::default()
            .n_landmarks(2)
            .patch_size(16);
        let (pos, neg) = DataSetReader::new(&config)
            .face_list(&faces)
            .negative_list(&master)
            .background_list(&master)
            .seed(17)
            .read()
            .unwrap();

        assert_eq!(pos.len(), 3);
        assert!(pos.has_gt_shape(0));
        assert!(!pos.has_gt_shape(1));
        assert!(pos.has_gt_shape(2));
        assert!(pos.images().iter().all(|p| p.image().dimensions() == (16, 16)));

        // landmarks are normalized to the face box
        let gt = pos.gt_shapes()[0].as_ref().unwrap();
        assert_eq!(gt.coords(), &[0.25, 0.25, 0.75, 0.5]);

        assert_eq!(neg.len(), 3);
        assert_eq!(neg.generator().n_backgrounds(), 3);
        assert_eq!(neg.mean_shape(), pos.mean_shape());
        assert_eq!(pos.mean_shape().n_landmarks(), 2);

        assert!(pos.scores().iter().chain(neg.scores()).all(|&s| s == 0.0));
        assert!(pos.weights().iter().chain(neg.weights()).all(|&w| w == 1.0));
        assert!(pos.current_shapes().iter().all(|s| s.n_landmarks() == 2));
        assert!(neg.current_shapes().iter().all(|s| s.n_landmarks() == 2));
    }

    #[test]
    fn same_seed_same_shapes() {
        let dir = temp_dir("seeded-reader");
        let faces = write_faces(&dir);
        let config = Config::default().n_landmarks(2).patch_size(16);

        let read = || {
            DataSetReader::new(&config)
                .face_list(&faces)
                .seed(5)
                .read()
                .unwrap()
                .0
        };
        assert_eq!(read().current_shapes(), read().current_shapes());
    }

    #[test]
    fn malformed_face_line_reports_its_number() {
        let dir = temp_dir("malformed");
        let list = dir.join("face.txt");
        fs::write(&list, "# header\nface.png 1 2 3\n").unwrap();

        let config = Config::default().n_landmarks(2);
        let result = DataSetReader::new(&config).face_list(&list).read();
        match result {
            Err(JdaError::MalformedList { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_face_list_is_a_config_error() {
        let config = Config::default();
        let result = DataSetReader::new(&config).read();
        assert!(matches!(result, Err(JdaError::InvalidConfig(_))));
    }

    #[test]
    fn missing_image_is_an_image_error() {
        let dir = temp_dir("missing-image");
        let list = dir.join("face.txt");
        fs::write(&list, "/nonexistent/face.png 0 0 10 10 1 1\n").unwrap();

        let config = Config::default().n_landmarks(1);
        let result = DataSetReader::new(&config).face_list(&list).read();
        assert!(matches!(result, Err(JdaError::Image { .. })));
    }
}
