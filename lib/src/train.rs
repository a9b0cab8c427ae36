use crate::{
    errors::{check_range, InvalidRange},
    mask::{apply_hole, random_hole},
    model::{image_to_planar, ContextEncoder, ContextEncoderConfig, TrainingBackend},
    restore::{weights_file, WeightsRecorder},
    utils, Error, ImageSource,
};
use burn::{
    module::{AutodiffModule, Module},
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{ElementConversion, Tensor, TensorData},
};
use rand::{seq::SliceRandom, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type B = TrainingBackend;

struct Parameters {
    dataset: PathBuf,
    weights: PathBuf,
    epochs: u32,
    batch_size: usize,
    learning_rate: f64,
    seed: u64,
    model: ContextEncoderConfig,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("dataset/train"),
            weights: PathBuf::from(crate::restore::DEFAULT_WEIGHTS_PATH),
            epochs: 10,
            batch_size: 4,
            learning_rate: 0.0002,
            seed: 0,
            model: ContextEncoderConfig::new(),
        }
    }
}

/// The state of training after a batch
pub struct TrainingUpdate {
    /// 0-based epoch
    pub epoch: u32,
    pub epochs: u32,
    /// 0-based batch within the epoch
    pub batch: usize,
    pub batches: usize,
    /// Reconstruction loss of this batch
    pub loss: f32,
}

/// Allows the trainer to update external callers with its progress
pub trait TrainingProgress {
    fn update(&mut self, info: TrainingUpdate);
}

impl<G> TrainingProgress for G
where
    G: FnMut(TrainingUpdate) + Send,
{
    fn update(&mut self, info: TrainingUpdate) {
        self(info);
    }
}

/// The outcome of a training run
pub struct TrainingReport {
    /// The loss of the last batch of each epoch
    pub epoch_losses: Vec<f32>,
    /// Where the weights were saved
    pub weights: PathBuf,
    /// The trained model, ready for inference
    pub model: ContextEncoder<crate::InferenceBackend>,
}

/// Trains the context encoder to reconstruct images from masked copies.
///
/// # Example
/// ```no_run
/// let report = painting_restoration::Trainer::builder()
///     .dataset("dataset/train")
///     .epochs(10)
///     .build()
///     .expect("failed to load training data")
///     .run(None)
///     .expect("training failed");
///
/// println!("final loss {:?}", report.epoch_losses.last());
/// ```
pub struct Trainer {
    images: Vec<Vec<f32>>,
    params: Parameters,
}

impl Trainer {
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// The number of images in the training set
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Trains a freshly initialized model and saves its weights
    pub fn run(self, mut progress: Option<Box<dyn TrainingProgress>>) -> Result<TrainingReport, Error> {
        let device = Default::default();
        let dims = self.params.model.dims();
        let (height, width) = (dims.height as usize, dims.width as usize);
        let batch_size = self.params.batch_size;
        let batches = self.images.len() / batch_size;

        let mut model: ContextEncoder<B> = self.params.model.init(&device);
        let mut optim = AdamConfig::new().init();
        let loss_fn = MseLoss::new();
        let mut rng = rand_pcg::Pcg32::seed_from_u64(self.params.seed);
        let mut order: Vec<usize> = (0..self.images.len()).collect();
        let mut epoch_losses = Vec::with_capacity(self.params.epochs as usize);

        info!(
            images = self.images.len(),
            epochs = self.params.epochs,
            batch_size,
            "starting training"
        );

        for epoch in 0..self.params.epochs {
            order.shuffle(&mut rng);
            let mut loss_value = 0.0;

            // an incomplete trailing batch is dropped
            for (batch, indices) in order.chunks_exact(batch_size).enumerate() {
                let mut targets = Vec::with_capacity(indices.len() * 3 * height * width);
                let mut masked = Vec::with_capacity(targets.capacity());

                for &i in indices {
                    let img = &self.images[i];
                    targets.extend_from_slice(img);

                    let mut occluded = img.clone();
                    apply_hole(&mut occluded, dims, random_hole(&mut rng, dims));
                    masked.extend_from_slice(&occluded);
                }

                let shape = [indices.len(), 3, height, width];
                let input = Tensor::<B, 4>::from_data(TensorData::new(masked, shape), &device);
                let target = Tensor::<B, 4>::from_data(TensorData::new(targets, shape), &device);

                let output = model.forward(input);
                let loss = loss_fn.forward(output, target, Reduction::Mean);
                loss_value = loss.clone().into_scalar().elem::<f32>();

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.params.learning_rate, model, grads);

                debug!(epoch, batch, loss = loss_value, "batch complete");

                if let Some(ref mut progress) = progress {
                    progress.update(TrainingUpdate {
                        epoch,
                        epochs: self.params.epochs,
                        batch,
                        batches,
                        loss: loss_value,
                    });
                }
            }

            info!(
                "epoch {}/{}, loss: {:.5}",
                epoch + 1,
                self.params.epochs,
                loss_value
            );
            epoch_losses.push(loss_value);
        }

        let weights = &self.params.weights;
        if let Some(parent) = weights.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        model
            .clone()
            .save_file(weights.clone(), &WeightsRecorder::new())?;
        info!(path = %weights.display(), "weights saved");

        Ok(TrainingReport {
            epoch_losses,
            weights: weights.clone(),
            model: model.valid(),
        })
    }
}

/// Configures a training run, calling `build` loads the dataset and checks
/// the parameters
#[derive(Default)]
pub struct TrainerBuilder {
    params: Parameters,
}

impl TrainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory of `*.jpg` training images.
    ///
    /// Default: `dataset/train`
    pub fn dataset<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.params.dataset = dir.as_ref().to_owned();
        self
    }

    /// Where the trained weights are written. The extension is always
    /// replaced with `.bin`, see [`weights_file`].
    ///
    /// Default: `weights/context_encoder.bin`
    pub fn weights<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.params.weights = weights_file(path);
        self
    }

    /// Default: 10
    pub fn epochs(mut self, epochs: u32) -> Self {
        self.params.epochs = epochs;
        self
    }

    /// Default: 4
    pub fn batch_size(mut self, size: usize) -> Self {
        self.params.batch_size = size;
        self
    }

    /// Learning rate of the Adam optimizer.
    ///
    /// Default: 0.0002
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.params.learning_rate = lr;
        self
    }

    /// Seed for shuffling and mask placement.
    ///
    /// Default: 0
    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn model(mut self, config: ContextEncoderConfig) -> Self {
        self.params.model = config;
        self
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        self.params.model.validate()?;

        if self.params.epochs == 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: u32::MAX as f32,
                value: 0.0,
                name: "epochs",
            }));
        }

        if self.params.batch_size == 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: 1024.0,
                value: 0.0,
                name: "batch-size",
            }));
        }

        // the range is exclusive at both ends
        let lr = self.params.learning_rate as f32;
        if lr >= 1.0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 0.0,
                max: 1.0,
                value: lr,
                name: "learning-rate",
            }));
        }
        check_range("learning-rate", lr, f32::MIN_POSITIVE, 1.0)?;

        Ok(())
    }

    /// Loads and resizes the dataset
    pub fn build(self) -> Result<Trainer, Error> {
        self.check_parameters_validity()?;

        let dataset = &self.params.dataset;
        let files = utils::list_images(dataset, &["jpg"])?;
        if files.is_empty() {
            return Err(Error::NoTrainingImages(dataset.clone()));
        }

        let dims = self.params.model.dims();
        let images = files
            .iter()
            .map(|path| {
                utils::load_rgb(ImageSource::from_path(path), Some(dims)).map(|img| image_to_planar(&img))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        if images.len() < self.params.batch_size {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: images.len() as f32,
                value: self.params.batch_size as f32,
                name: "batch-size",
            }));
        }

        info!(count = images.len(), dir = %dataset.display(), "training images loaded");

        Ok(Trainer {
            images,
            params: self.params,
        })
    }
}
