use painting_restoration as pr;
use rand::SeedableRng;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("painting-restoration-{}-{}", name, std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// Small enough to train in a couple of seconds
fn tiny_model() -> pr::ContextEncoderConfig {
    pr::ContextEncoderConfig::new()
        .with_height(32)
        .with_width(48)
        .with_base_channels(4)
}

#[test]
fn train_then_restore() {
    let root = scratch_dir("train");
    let dataset = root.join("train");
    // the recorder always writes `.bin`, whatever extension is asked for
    let weights = root.join("weights").join("tiny.pt");

    pr::SyntheticArt::new()
        .count(5)
        .dims(pr::Dims::new(96, 64))
        .seed(1)
        .generate(&dataset)
        .unwrap();

    let batches_seen = Arc::new(AtomicUsize::new(0));
    let progress = {
        let batches_seen = Arc::clone(&batches_seen);
        move |update: pr::TrainingUpdate| {
            assert_eq!(update.batches, 2);
            assert!(update.batch < update.batches);
            assert!(update.loss.is_finite());
            batches_seen.fetch_add(1, Ordering::SeqCst);
        }
    };

    let trainer = pr::Trainer::builder()
        .dataset(&dataset)
        .weights(&weights)
        .model(tiny_model())
        .epochs(2)
        .batch_size(2)
        .seed(3)
        .build()
        .unwrap();
    assert_eq!(trainer.len(), 5);

    let report = trainer.run(Some(Box::new(progress))).unwrap();

    // 5 images in batches of 2 leaves one image out of every epoch
    assert_eq!(batches_seen.load(Ordering::SeqCst), 2 * 2);

    assert_eq!(report.epoch_losses.len(), 2);
    assert!(report.epoch_losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    assert_eq!(report.weights, root.join("weights").join("tiny.bin"));
    assert!(report.weights.exists());
    assert!(!weights.exists());

    // the freshly trained model restores to the model's size
    let trained = pr::Restorer::from_model(report.model, &tiny_model());
    assert_eq!(trained.dims(), pr::Dims::new(48, 32));
    let sample = pr::image::open(dataset.join("art_1.jpg")).unwrap();
    assert_eq!(trained.restore(&sample).unwrap().dimensions(), (48, 32));

    // loading with the same path the weights were saved under finds them
    let restorer = pr::Restorer::new(tiny_model(), &weights).unwrap();
    assert!(restorer.weights_loaded());

    let upload = dataset.join("art_0.jpg");
    let results = root.join("results");
    let names = pr::Pipeline::new(restorer).run(&upload, &results, 42).unwrap();
    assert_eq!(names, pr::ResultNames::new("art_0", 42));

    // the edge map keeps the upload's size, the restoration the model's
    let edge = pr::image::open(results.join(&names.edge)).unwrap();
    assert_eq!((edge.width(), edge.height()), (96, 64));

    for name in [&names.restored, &names.enhanced] {
        let img = pr::image::open(results.join(name)).unwrap();
        assert_eq!((img.width(), img.height()), (48, 32));
    }

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn untrained_model_still_restores() {
    let root = scratch_dir("untrained");

    let restorer = pr::Restorer::new(tiny_model(), root.join("missing.bin"))
        .unwrap()
        .keep_original_size(true);
    assert!(!restorer.weights_loaded());

    let img = pr::image::DynamicImage::ImageRgb8(pr::image::RgbImage::new(100, 70));
    let restored = restorer.restore(&img).unwrap();
    assert_eq!(restored.dimensions(), (100, 70));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn upload_with_wrong_extension() {
    let root = scratch_dir("misnamed");
    let results = root.join("results");

    // a png that the client called a jpg
    let upload = root.join("scan.jpg");
    let img = pr::SyntheticArt::new()
        .dims(pr::Dims::new(60, 40))
        .paint(&mut rand_pcg::Pcg32::seed_from_u64(5));
    img.save_with_format(&upload, pr::image::ImageFormat::Png)
        .unwrap();

    let restorer = pr::Restorer::new(tiny_model(), root.join("missing.bin")).unwrap();
    let names = pr::Pipeline::new(restorer).run(&upload, &results, 9).unwrap();

    let edge = pr::image::open(results.join(&names.edge)).unwrap();
    assert_eq!((edge.width(), edge.height()), (60, 40));
    assert!(results.join(&names.enhanced).exists());

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn training_needs_images() {
    let root = scratch_dir("empty");

    let err = pr::Trainer::builder()
        .dataset(&root)
        .model(tiny_model())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, pr::Error::NoTrainingImages(_)));

    pr::SyntheticArt::new()
        .count(2)
        .dims(pr::Dims::new(48, 32))
        .generate(&root)
        .unwrap();

    // 2 images can never fill a batch of 4
    let err = pr::Trainer::builder()
        .dataset(&root)
        .model(tiny_model())
        .batch_size(4)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, pr::Error::InvalidRange(_)));

    let err = pr::Trainer::builder()
        .dataset(&root)
        .model(tiny_model())
        .epochs(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, pr::Error::InvalidRange(_)));

    std::fs::remove_dir_all(&root).unwrap();
}

#[test]
fn batch_edge_maps() {
    let root = scratch_dir("edges");
    let source = root.join("train");
    let target = root.join("edges");

    pr::SyntheticArt::new()
        .count(3)
        .dims(pr::Dims::new(64, 48))
        .generate(&source)
        .unwrap();
    // non-jpg files are skipped
    std::fs::write(source.join("notes.txt"), "not an image").unwrap();

    let count = pr::EdgeDetector::new()
        .generate_edge_maps(&source, &target)
        .unwrap();
    assert_eq!(count, 3);

    let written = pr::list_images(&target, &["jpg"]).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(written[1].file_name().unwrap(), "art_1.jpg");

    let edge = pr::image::open(&written[0]).unwrap();
    assert_eq!((edge.width(), edge.height()), (64, 48));

    std::fs::remove_dir_all(&root).unwrap();
}
