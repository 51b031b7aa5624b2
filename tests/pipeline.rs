mod common;

use std::sync::Arc;

use common::{
    synthetic_photo, ChromaSegmenter, FixedRecognizer, UnavailableRecognizer, CORE_COLOR,
};
use corebox::{
    CoreBoxError, CoreBoxesImageFile, CoreImageCategory, DepthTableEntry, LoadOptions, Pipeline,
};
use image::{Rgb, RgbImage};

fn unloaded(name: &str, options: LoadOptions, pipeline: Pipeline) -> CoreBoxesImageFile {
    let options = LoadOptions {
        load: false,
        ..options
    };
    CoreBoxesImageFile::with_pipeline(name, options, pipeline).unwrap()
}

fn pipeline_with(recognizer: Arc<dyn corebox::TextRecognizer>) -> Pipeline {
    Pipeline::default()
        .with_recognizer(recognizer)
        .with_segmenter(Arc::new(ChromaSegmenter))
}

#[test]
fn test_three_boxes_from_ocr_and_scale_bar() {
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let pipeline = pipeline_with(recognizer.clone());
    let mut file = unloaded("1cx1-3_3.png", LoadOptions::default(), pipeline);

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    let cores = file.list();

    assert_eq!(cores.len(), 3);
    assert_eq!(recognizer.calls(), 1);
    for (i, (core, start)) in cores.iter().zip([100.0, 100.5, 101.0]).enumerate() {
        assert_eq!(core.box_number(), i);
        assert_eq!(core.core_id(), 1);
        assert_eq!(core.category(), CoreImageCategory::CoreWithoutPlugImage);
        assert!((core.start_depth() - start).abs() < 1e-9);
        // ~219 px of core over a ~196 px scale bar
        assert!((core.height() - 1.1).abs() < 0.08, "height {}", core.height());
        assert_eq!(core.image().get_pixel(0, 0), &Rgb(CORE_COLOR));
    }

    let records = file.records();
    assert_eq!(records[2].physical_box_number, 3);
    assert!(file.total_height().unwrap() > 2.0);
}

#[test]
fn test_reload_rebuilds_cores() {
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let pipeline = pipeline_with(recognizer.clone());
    let mut file = unloaded("1cx1-3_3_uv.png", LoadOptions::default(), pipeline);

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    file.load_cores_from_image(&synthetic_photo()).unwrap();

    assert_eq!(file.list().len(), 3);
    assert_eq!(recognizer.calls(), 2);
    assert!(file.list().iter().all(|c| c.category() == CoreImageCategory::FullCoreUVImage));
}

#[test]
fn test_depth_table_skips_ocr_and_scale_bar() {
    // no scale bar in the photo: measuring it would fail
    let mut photo = RgbImage::new(700, 300);
    for y in 40..260 {
        for x in 100..400 {
            photo.put_pixel(x, y, Rgb(CORE_COLOR));
        }
    }

    let options = LoadOptions {
        depth_table: vec![
            DepthTableEntry { start: 50.0, height: 0.95 },
            DepthTableEntry { start: 51.0, height: 0.97 },
            DepthTableEntry { start: 52.0, height: 0.99 },
            DepthTableEntry { start: 53.0, height: 1.0 },
        ],
        start_depth: Some(900.0),
        default_depth: Some(1.0),
        ..LoadOptions::default()
    };
    let pipeline = pipeline_with(Arc::new(UnavailableRecognizer));
    let mut file = unloaded("7cx2-4_3_serrado.png", options, pipeline);

    file.load_cores_from_image(&photo).unwrap();
    let cores = file.list();

    assert_eq!(cores.len(), 3);
    assert_eq!(cores[0].start_depth(), 51.0);
    assert_eq!(cores[0].height(), 0.97);
    assert_eq!(cores[2].start_depth(), 53.0);
    assert_eq!(cores[2].category(), CoreImageCategory::FullCoreImage);
    assert!((file.total_height().unwrap() - 3.0).abs() < 1e-9);
}

#[test]
fn test_depth_table_overrides_ocr_labels() {
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let options = LoadOptions {
        depth_table: vec![DepthTableEntry { start: 7.0, height: 0.5 }],
        ..LoadOptions::default()
    };
    let mut file = unloaded("1cx1-3_3.png", options, pipeline_with(recognizer.clone()));

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    let cores = file.list();

    assert_eq!(recognizer.calls(), 1);
    assert_eq!(cores.len(), 3);
    assert_eq!((cores[0].start_depth(), cores[0].height()), (7.0, 0.5));
    assert!((cores[1].start_depth() - 100.5).abs() < 1e-9);
    assert!((cores[2].start_depth() - 101.0).abs() < 1e-9);
    for core in &cores[1..] {
        assert!((core.height() - 1.1).abs() < 0.08, "height {}", core.height());
    }
}

#[test]
fn test_invalid_box_is_skipped() {
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let options = LoadOptions {
        depth_table: vec![DepthTableEntry { start: 7.0, height: 0.0 }],
        ..LoadOptions::default()
    };
    let mut file = unloaded("1cx1-3_3.png", options, pipeline_with(recognizer));

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    let boxes: Vec<usize> = file.list().iter().map(|c| c.box_number()).collect();

    assert_eq!(boxes, vec![1, 2]);
    assert_eq!(file.records()[0].physical_box_number, 2);
    assert!((file.list()[0].start_depth() - 100.5).abs() < 1e-9);
}

#[test]
fn test_height_follows_segmented_core() {
    // lower quarter of the last box is blue tray, not core
    let mut photo = synthetic_photo();
    for y in 200..260 {
        for x in 300..400 {
            photo.put_pixel(x, y, Rgb([60, 100, 150]));
        }
    }
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let mut file = unloaded("1cx1-3_3.png", LoadOptions::default(), pipeline_with(recognizer));

    file.load_cores_from_image(&photo).unwrap();
    let cores = file.list();

    assert_eq!(cores.len(), 3);
    assert!(cores[2].image().height() + 40 < cores[0].image().height());
    assert!(cores[2].height() < cores[0].height());
    // one scale bar length for every box
    let per_px: Vec<f64> = cores
        .iter()
        .map(|c| c.height() / c.image().height() as f64)
        .collect();
    assert!((per_px[0] - per_px[2]).abs() < 1e-12);
    assert!((per_px[1] - per_px[2]).abs() < 1e-12);
}

#[test]
fn test_default_depths_skip_ocr() {
    let options = LoadOptions {
        start_depth: Some(200.0),
        default_depth: Some(0.8),
        ..LoadOptions::default()
    };
    let pipeline = pipeline_with(Arc::new(UnavailableRecognizer));
    let mut file = unloaded("2cx5-7_3.png", options, pipeline);

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    let starts: Vec<f64> = file.list().iter().map(|c| c.start_depth()).collect();

    assert_eq!(file.list().len(), 3);
    assert!((starts[1] - 200.8).abs() < 1e-9);
    assert!((starts[2] - 201.6).abs() < 1e-9);
    assert!(file.list().iter().all(|c| c.height() == 0.8));
}

#[test]
fn test_box_count_follows_labels_found() {
    let recognizer = Arc::new(FixedRecognizer::new(&["100,00", "100,50", "101,00"]));
    let mut file = unloaded("1cx1-4_4.png", LoadOptions::default(), pipeline_with(recognizer));

    file.load_cores_from_image(&synthetic_photo()).unwrap();
    assert_eq!(file.list().len(), 3);
}

#[test]
fn test_unreadable_depths_are_fatal() {
    let recognizer = Arc::new(FixedRecognizer::new(&["101,00", "100,00", "100,50"]));
    let pipeline = pipeline_with(recognizer.clone());
    let mut file = unloaded("1cx1-3_3.png", LoadOptions::default(), pipeline);

    let err = file.load_cores_from_image(&synthetic_photo()).unwrap_err();
    assert!(matches!(err, CoreBoxError::DepthRecognition(_)));
    assert!(err.is_fatal());
    assert!(file.list().is_empty());
    // broad pass plus the label-row retry
    assert_eq!(recognizer.calls(), 2);
}

#[test]
fn test_invalid_file_name_is_rejected() {
    let err = CoreBoxesImageFile::with_pipeline(
        "/tmp/IMG_0042.png",
        LoadOptions::default(),
        pipeline_with(Arc::new(UnavailableRecognizer)),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CoreBoxError::FilenameParse { .. }));
}

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("3cx1-3_3.png");
    synthetic_photo().save(&path).unwrap();

    let recognizer = Arc::new(FixedRecognizer::new(&["10,00", "11,00", "12,00"]));
    let pipeline = pipeline_with(recognizer);
    let file = CoreBoxesImageFile::with_pipeline(&path, LoadOptions::default(), pipeline).unwrap();

    assert_eq!(file.metadata().core_id, 3);
    assert_eq!(file.list().len(), 3);
    assert_eq!(file.list()[1].start_depth(), 11.0);
}
