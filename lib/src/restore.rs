use crate::{
    model::{image_to_tensor, tensor_to_image, ContextEncoder, ContextEncoderConfig, InferenceBackend},
    utils, Dims, Error, ImageSource,
};
use burn::{
    module::Module,
    record::{BinFileRecorder, FullPrecisionSettings},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The recorder used for persisting model weights
pub type WeightsRecorder = BinFileRecorder<FullPrecisionSettings>;

/// Default location of the trained weights
pub const DEFAULT_WEIGHTS_PATH: &str = "weights/context_encoder.bin";

/// The file the [`WeightsRecorder`] actually reads or writes for `path`. The
/// recorder always swaps the extension for `.bin`, so `weights/model.pt`
/// ends up as `weights/model.bin`
pub fn weights_file<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().with_extension("bin")
}

/// Runs the trained context encoder over images.
///
/// # Example
/// ```no_run
/// let restorer = painting_restoration::Restorer::new(
///     painting_restoration::ContextEncoderConfig::new(),
///     "weights/context_encoder.bin",
/// )
/// .expect("failed to create restorer");
///
/// restorer
///     .restore_file("uploads/fresco.jpg", "results/fresco_restored.jpg")
///     .expect("failed to restore image");
/// ```
pub struct Restorer {
    model: ContextEncoder<InferenceBackend>,
    dims: Dims,
    weights_loaded: bool,
    keep_original_size: bool,
}

impl Restorer {
    /// Builds the model and loads its weights from `weights`. A missing
    /// weights file is not an error, the model is left randomly initialized
    /// so the rest of the pipeline can still be exercised.
    pub fn new<P: AsRef<Path>>(config: ContextEncoderConfig, weights: P) -> Result<Self, Error> {
        config.validate()?;

        let weights = weights_file(weights);
        let device = Default::default();
        let model = config.init::<InferenceBackend>(&device);

        info!("loading context encoder");
        let (model, weights_loaded) = if weights.exists() {
            let model = model.load_file(weights.clone(), &WeightsRecorder::new(), &device)?;
            info!(path = %weights.display(), "weights loaded");
            (model, true)
        } else {
            warn!(path = %weights.display(), "weights not found, using an untrained model");
            (model, false)
        };

        Ok(Self {
            model,
            dims: config.dims(),
            weights_loaded,
            keep_original_size: false,
        })
    }

    /// Wraps an already built model, eg one that was just trained
    pub fn from_model(model: ContextEncoder<InferenceBackend>, config: &ContextEncoderConfig) -> Self {
        Self {
            model,
            dims: config.dims(),
            weights_loaded: true,
            keep_original_size: false,
        }
    }

    /// Resizes the model output back to the dimensions of the input image.
    ///
    /// Default: false, the output keeps the model's dimensions
    pub fn keep_original_size(mut self, keep: bool) -> Self {
        self.keep_original_size = keep;
        self
    }

    pub fn weights_loaded(&self) -> bool {
        self.weights_loaded
    }

    /// The size images are resized to before being fed to the model
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Fills in the damaged regions of an image
    pub fn restore(&self, img: &image::DynamicImage) -> Result<image::RgbImage, Error> {
        use image::GenericImageView;

        let (orig_width, orig_height) = img.dimensions();
        let resized = utils::resize_rgb(img, Some(self.dims));

        let device = Default::default();
        let input = image_to_tensor::<InferenceBackend>(&resized, &device);
        let restored = tensor_to_image(self.model.forward(input))?;

        debug!(
            width = self.dims.width,
            height = self.dims.height,
            "inference complete"
        );

        if self.keep_original_size && (orig_width, orig_height) != restored.dimensions() {
            Ok(image::imageops::resize(
                &restored,
                orig_width,
                orig_height,
                image::imageops::FilterType::Triangle,
            ))
        } else {
            Ok(restored)
        }
    }

    /// Restores the image at `input` and saves the result to `output`
    pub fn restore_file<'a, I: Into<ImageSource<'a>>, P: AsRef<Path>>(
        &self,
        input: I,
        output: P,
    ) -> Result<PathBuf, Error> {
        let output = output.as_ref();
        let img = utils::load_dynamic_image(input.into())?;
        let restored = self.restore(&img)?;
        utils::save_image(&restored, output)?;

        debug!(path = %output.display(), "restored image written");
        Ok(output.to_owned())
    }
}
