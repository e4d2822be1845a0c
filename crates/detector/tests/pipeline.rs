//! End-to-end runs of the change detection pipeline on small GeoTIFF scenes

use landchange_algorithms::change::ChangeCategory;
use landchange_algorithms::classification::{BinaryEstimator, MultiOutputClassifier};
use landchange_algorithms::imagery::FEATURE_COUNT;
use landchange_core::io::write_band_stack;
use landchange_core::{Aoi, BandStack, GeoTransform, Raster, CRS};
use landchange_detector::{
    ChangeDetector, DetectorConfig, ErrorKind, ModelPair, ModelSource, TrainingParams, CLASSIFIER_FILE,
    CLASS_OVERLAY, NDVI_CHANGE_OVERLAY,
};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const VEGETATION: [f64; 4] = [0.1, 0.0, 0.0, 0.9];
const BARE: [f64; 4] = [0.1, 0.0, 0.0, 0.1];

fn training() -> TrainingParams {
    TrainingParams {
        samples_per_group: 400,
        n_trees: 20,
        ..TrainingParams::default()
    }
}

fn shared_models() -> &'static ModelPair {
    static MODELS: OnceLock<ModelPair> = OnceLock::new();
    MODELS.get_or_init(|| ModelPair::train(&training()).unwrap())
}

/// The pair a detector trains when its model directory is empty
fn default_models() -> &'static ModelPair {
    static MODELS: OnceLock<ModelPair> = OnceLock::new();
    MODELS.get_or_init(|| ModelPair::train(&TrainingParams::default()).unwrap())
}

fn detector(root: &Path) -> ChangeDetector {
    let config = DetectorConfig::new(root.join("models"), root.join("outputs")).with_training(training());
    ChangeDetector::with_models(config, shared_models().clone())
}

/// A rows x cols scene whose pixel (0,0) is all zeros and pixel (0,1) all
/// ones, so every band normalizes over [0, 1]; the rest is `bulk`.
fn write_scene(dir: &Path, name: &str, bulk: [f64; 4], rows: usize, cols: usize, epsg: u32) -> PathBuf {
    let bands = (0..4)
        .map(|b| {
            let data = (0..rows * cols)
                .map(|i| match i {
                    0 => 0.0,
                    1 => 1.0,
                    _ => bulk[b],
                })
                .collect();
            Raster::from_vec(data, rows, cols).unwrap()
        })
        .collect();
    let stack = BandStack::new(
        bands,
        GeoTransform::new(500000.0, 2000000.0, 10.0, -10.0),
        Some(CRS::from_epsg(epsg)),
    )
    .unwrap();
    let path = dir.join(name);
    write_band_stack(&stack, &path).unwrap();
    path
}

fn png_dimensions(path: &Path) -> (u32, u32) {
    let bytes = std::fs::read(path).unwrap();
    let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
    let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
    (width, height)
}

#[test]
fn identical_scenes_report_no_change() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let detector = detector(dir.path());

    let report = detector.run_on_pair(&before, &before, None, Some("same")).unwrap();

    assert_eq!(report.summary.job_id, "same");
    assert_eq!(report.summary.percent_change, 0.0);
    assert_eq!(report.summary.confidence_pct, 85.5);
    assert_eq!(report.summary.categories.total(), 0);
    assert_eq!(report.overlays.len(), 2);
    for path in report.overlays.values() {
        assert!(path.exists(), "{} missing", path.display());
        assert!(path.starts_with(dir.path().join("outputs").join("same")));
        assert_eq!(png_dimensions(path), (4, 4));
    }
}

#[test]
fn vegetation_loss_is_deforestation() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);

    let report = detector(dir.path()).run_on_pair(&before, &after, None, None).unwrap();
    let summary = &report.summary;

    assert_eq!(summary.categories.get(ChangeCategory::Deforestation), 14);
    assert_eq!(summary.categories.total(), 14);
    assert_eq!(summary.percent_change, 87.5);
    assert!(report.overlays[CLASS_OVERLAY].ends_with("class_map.png"));
    assert!(report.overlays[NDVI_CHANGE_OVERLAY].ends_with("ndvi_change.png"));
}

#[test]
fn default_model_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let vegetated = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let bare = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let config = DetectorConfig::new(dir.path().join("models"), dir.path().join("outputs"));
    let detector = ChangeDetector::with_models(config, default_models().clone());

    let same = detector.run_on_pair(&vegetated, &vegetated, None, Some("same")).unwrap();
    assert_eq!(same.summary.percent_change, 0.0);
    assert_eq!(same.summary.categories.total(), 0);

    let loss = detector.run_on_pair(&vegetated, &bare, None, Some("loss")).unwrap();
    assert_eq!(loss.summary.categories.get(ChangeCategory::Deforestation), 14);
    assert_eq!(loss.summary.percent_change, 87.5);
}

#[test]
fn aoi_inside_one_pixel_is_not_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    // Within pixel (0, 0), away from its centre
    let aoi = Aoi::from_bounds(500001.0, 1999991.0, 500002.0, 1999992.0).unwrap();

    let report = detector(dir.path())
        .run_on_pair(&before, &after, Some(&aoi), Some("tiny"))
        .unwrap();

    assert_eq!(png_dimensions(&report.overlays[CLASS_OVERLAY]), (1, 1));
    assert_eq!(report.summary.percent_change, 0.0);
}

#[test]
fn partial_aoi_clips_both_scenes() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let aoi = Aoi::from_bounds(500000.0, 1999980.0, 500020.0, 2000000.0).unwrap();

    let report = detector(dir.path())
        .run_on_pair(&before, &after, Some(&aoi), Some("clip"))
        .unwrap();

    assert_eq!(png_dimensions(&report.overlays[CLASS_OVERLAY]), (2, 2));
    assert_eq!(report.summary.categories.get(ChangeCategory::Deforestation), 2);
    assert_eq!(report.summary.percent_change, 50.0);
}

#[test]
fn aoi_outside_scene_is_input_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let aoi = Aoi::from_bounds(0.0, 0.0, 10.0, 10.0).unwrap();

    let err = detector(dir.path())
        .run_on_pair(&before, &before, Some(&aoi), Some("outside"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InputBounds);
    assert!(!dir.path().join("outputs").join("outside").exists());
}

#[test]
fn misaligned_scenes_are_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let wider = write_scene(dir.path(), "wider.tif", BARE, 4, 5, 32643);
    let other_crs = write_scene(dir.path(), "other_crs.tif", BARE, 4, 4, 32644);
    let detector = detector(dir.path());

    for (after, job) in [(&wider, "wider"), (&other_crs, "crs")] {
        let err = detector.run_on_pair(&before, after, None, Some(job)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch, "{}", err);
        assert!(!dir.path().join("outputs").join(job).exists());
    }
}

#[test]
fn missing_scene_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);

    let err = detector(dir.path())
        .run_on_pair(&before, &dir.path().join("nope.tif"), None, Some("missing"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("after"));
    assert!(!dir.path().join("outputs").join("missing").exists());
}

#[test]
fn job_ids() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let detector = detector(dir.path());

    let report = detector.run_on_pair(&before, &before, None, None).unwrap();
    assert_eq!(report.summary.job_id.len(), 8);
    assert!(dir.path().join("outputs").join(&report.summary.job_id).is_dir());

    let err = detector.run_on_pair(&before, &before, None, Some("../up")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn persisted_models_give_identical_results() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let config = DetectorConfig::new(dir.path().join("models"), dir.path().join("outputs")).with_training(
        TrainingParams {
            samples_per_group: 200,
            n_trees: 5,
            ..TrainingParams::default()
        },
    );

    let first = ChangeDetector::new(config.clone()).unwrap();
    assert_eq!(first.model_source(), ModelSource::Trained);
    let second = ChangeDetector::new(config).unwrap();
    assert_eq!(second.model_source(), ModelSource::Loaded);
    assert_eq!(first.models(), second.models());

    let a = first.run_on_pair(&before, &after, None, Some("first")).unwrap();
    let b = second.run_on_pair(&before, &after, None, Some("second")).unwrap();
    assert_eq!(a.summary.percent_change, b.summary.percent_change);
    assert_eq!(a.summary.categories, b.summary.categories);
}

#[test]
fn corrupt_model_is_retrained() {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("models");
    std::fs::create_dir_all(&model_dir).unwrap();
    std::fs::write(model_dir.join(CLASSIFIER_FILE), b"garbage").unwrap();
    let config = DetectorConfig::new(&model_dir, dir.path().join("outputs")).with_training(TrainingParams {
        samples_per_group: 100,
        n_trees: 3,
        ..TrainingParams::default()
    });

    let detector = ChangeDetector::new(config).unwrap();
    assert_eq!(detector.model_source(), ModelSource::Trained);
    assert!(ModelPair::load(&model_dir).is_ok());
}

#[test]
fn concurrent_runs_share_one_detector() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let detector = detector(dir.path());

    let reports: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let (detector, before, after) = (&detector, &before, &after);
                scope.spawn(move || {
                    detector
                        .run_on_pair(before, after, None, Some(format!("job{}", i).as_str()))
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for report in &reports {
        assert_eq!(report.summary.categories, reports[0].summary.categories);
        assert!(report.overlays[CLASS_OVERLAY].exists());
    }
}

#[test]
fn constant_estimators() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let config = DetectorConfig::new(dir.path().join("models"), dir.path().join("outputs"));
    let regressor = shared_models().regressor.clone();

    let never = MultiOutputClassifier::from_estimators(
        vec![BinaryEstimator::Constant { label: 0 }; 4],
        FEATURE_COUNT,
    )
    .unwrap();
    let detector = ChangeDetector::with_models(
        config.clone(),
        ModelPair {
            classifier: never,
            regressor: regressor.clone(),
        },
    );
    let report = detector.run_on_pair(&before, &after, None, Some("never")).unwrap();
    assert_eq!(report.summary.percent_change, 0.0);

    let mut estimators = vec![BinaryEstimator::Constant { label: 0 }; 4];
    estimators[ChangeCategory::Water.index()] = BinaryEstimator::Constant { label: 1 };
    let always_water = MultiOutputClassifier::from_estimators(estimators, FEATURE_COUNT).unwrap();
    let detector = ChangeDetector::with_models(
        config,
        ModelPair {
            classifier: always_water,
            regressor,
        },
    );
    let report = detector.run_on_pair(&before, &after, None, Some("water")).unwrap();
    assert_eq!(report.summary.percent_change, 100.0);
    assert_eq!(report.summary.categories.get(ChangeCategory::Water), 16);
}

#[test]
fn magnitude_follows_feature_grid() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_scene(dir.path(), "before.tif", VEGETATION, 4, 4, 32643);
    let after = write_scene(dir.path(), "after.tif", BARE, 4, 4, 32643);
    let stack_before = landchange_core::io::read_band_stack(&before).unwrap();
    let stack_after = landchange_core::io::read_band_stack(&after).unwrap();
    let features = landchange_algorithms::imagery::build_change_features(&stack_before, &stack_after).unwrap();

    let magnitude = detector(dir.path()).estimate_magnitude(&features).unwrap();
    assert_eq!(magnitude.dim(), (4, 4));
    assert!(magnitude.iter().all(|m| m.is_finite() && *m >= 0.0));
}
