//! The context encoder: a fully convolutional autoencoder that learns to
//! reconstruct an image from a copy with a rectangular region blanked out.
//!
//! The encoder reduces the input by 16x in both dimensions (one strided
//! convolution followed by three 2x2 max pools), a convolutional bottleneck
//! mixes the features, and the decoder scales back up with four nearest
//! neighbor upsamplings. The last layer is squashed through a sigmoid so the
//! output is directly an image in the `0..1` range.

use crate::{
    errors::{InvalidDims, InvalidRange},
    Dims, Error,
};
use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    tensor::{
        activation::{relu, sigmoid},
        backend::Backend,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
        Tensor, TensorData,
    },
};

/// Total downsampling factor of the encoder
pub const DOWNSAMPLE: u32 = 16;

/// Backend used for inference
pub type InferenceBackend = burn::backend::NdArray<f32>;
/// Backend used for training
pub type TrainingBackend = burn::backend::Autodiff<InferenceBackend>;

#[derive(Config, Debug)]
pub struct ContextEncoderConfig {
    /// Height of the images the model consumes and produces
    #[config(default = 256)]
    pub height: usize,
    /// Width of the images the model consumes and produces
    #[config(default = 384)]
    pub width: usize,
    /// Channels of the first convolution, every other layer is a multiple or
    /// fraction of it
    #[config(default = 64)]
    pub base_channels: usize,
}

impl ContextEncoderConfig {
    pub fn dims(&self) -> Dims {
        Dims::new(self.width as u32, self.height as u32)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let dims = self.dims();
        if dims.width == 0
            || dims.height == 0
            || dims.width % DOWNSAMPLE != 0
            || dims.height % DOWNSAMPLE != 0
        {
            return Err(Error::InvalidDims(InvalidDims {
                dims,
                multiple: DOWNSAMPLE,
            }));
        }

        if self.base_channels < 2 || self.base_channels % 2 != 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 2.0,
                max: 1024.0,
                value: self.base_channels as f32,
                name: "base-channels",
            }));
        }

        Ok(())
    }

    /// Builds a randomly initialized model
    pub fn init<B: Backend>(&self, device: &B::Device) -> ContextEncoder<B> {
        let b = self.base_channels;
        let conv3 = |cin: usize, cout: usize| {
            Conv2dConfig::new([cin, cout], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };

        ContextEncoder {
            // 4x4 kernel with stride 2, a padding of 1 gives exactly half the size
            enc1: Conv2dConfig::new([3, b], [4, 4])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            enc2: conv3(b, 2 * b),
            enc3: conv3(2 * b, 4 * b),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),

            neck1: conv3(4 * b, 8 * b),
            neck2: conv3(8 * b, 8 * b),
            neck3: conv3(8 * b, 4 * b),

            dec1: conv3(4 * b, 2 * b),
            dec2: conv3(2 * b, b),
            dec3: conv3(b, b / 2),
            out: conv3(b / 2, 3),
        }
    }
}

#[derive(Module, Debug)]
pub struct ContextEncoder<B: Backend> {
    enc1: Conv2d<B>,
    enc2: Conv2d<B>,
    enc3: Conv2d<B>,
    pool: MaxPool2d,
    neck1: Conv2d<B>,
    neck2: Conv2d<B>,
    neck3: Conv2d<B>,
    dec1: Conv2d<B>,
    dec2: Conv2d<B>,
    dec3: Conv2d<B>,
    out: Conv2d<B>,
}

fn upsample<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, height, width] = x.dims();
    interpolate(
        x,
        [height * 2, width * 2],
        InterpolateOptions::new(InterpolateMode::Nearest),
    )
}

impl<B: Backend> ContextEncoder<B> {
    /// `[batch, 3, height, width]` in, `[batch, 3, height, width]` out
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.pool.forward(relu(self.enc1.forward(input)));
        let x = self.pool.forward(relu(self.enc2.forward(x)));
        let x = self.pool.forward(relu(self.enc3.forward(x)));

        let x = relu(self.neck1.forward(x));
        let x = relu(self.neck2.forward(x));
        let x = relu(self.neck3.forward(x));

        let x = relu(self.dec1.forward(upsample(x)));
        let x = relu(self.dec2.forward(upsample(x)));
        let x = relu(self.dec3.forward(upsample(x)));
        sigmoid(self.out.forward(upsample(x)))
    }
}

/// Converts an image into planar (CHW) floats in the `0..1` range
pub fn image_to_planar(img: &image::RgbImage) -> Vec<f32> {
    let plane = (img.width() * img.height()) as usize;
    let mut planar = vec![0.0; plane * 3];

    for (i, pixel) in img.pixels().enumerate() {
        for (c, v) in pixel.0.iter().enumerate() {
            planar[c * plane + i] = f32::from(*v) / 255.0;
        }
    }

    planar
}

/// Converts an image into a `[1, 3, height, width]` tensor
pub fn image_to_tensor<B: Backend>(img: &image::RgbImage, device: &B::Device) -> Tensor<B, 4> {
    let shape = [1, 3, img.height() as usize, img.width() as usize];
    Tensor::from_data(TensorData::new(image_to_planar(img), shape), device)
}

/// Converts the first image of a `[batch, 3, height, width]` tensor back
/// into an 8-bit image
pub fn tensor_to_image<B: Backend>(tensor: Tensor<B, 4>) -> Result<image::RgbImage, Error> {
    let [_, channels, height, width] = tensor.dims();
    if channels != 3 {
        return Err(Error::Model(format!(
            "expected 3 output channels, the model produced {}",
            channels
        )));
    }

    let first: Tensor<B, 3> = tensor.narrow(0, 0, 1).squeeze(0);
    let values = first.into_data().convert::<f32>().to_vec::<f32>()?;
    let plane = height * width;

    let img = image::RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let i = y as usize * width + x as usize;
        let px = |c: usize| (values[c * plane + i] * 255.0).clamp(0.0, 255.0) as u8;
        image::Rgb([px(0), px(1), px(2)])
    });

    Ok(img)
}

#[cfg(test)]
mod test {
    use super::*;

    type B = InferenceBackend;

    #[test]
    fn forward_preserves_shape() {
        let device = Default::default();
        let config = ContextEncoderConfig::new()
            .with_height(32)
            .with_width(48)
            .with_base_channels(4);
        config.validate().unwrap();

        let model = config.init::<B>(&device);
        let input = Tensor::<B, 4>::zeros([2, 3, 32, 48], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 3, 32, 48]);

        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn rejects_sizes_the_encoder_cannot_halve() {
        let config = ContextEncoderConfig::new().with_height(250);
        assert!(matches!(config.validate(), Err(Error::InvalidDims(_))));

        let config = ContextEncoderConfig::new().with_base_channels(3);
        assert!(matches!(config.validate(), Err(Error::InvalidRange(_))));

        assert!(ContextEncoderConfig::new().validate().is_ok());
    }

    #[test]
    fn tensor_image_conversion() {
        let img = image::RgbImage::from_fn(5, 3, |x, y| {
            image::Rgb([(x * 50) as u8, (y * 100) as u8, 255])
        });

        let device = Default::default();
        let tensor = image_to_tensor::<B>(&img, &device);
        assert_eq!(tensor.dims(), [1, 3, 3, 5]);

        let back = tensor_to_image(tensor).unwrap();
        assert_eq!(back.dimensions(), (5, 3));
        // truncation can lose at most one step per channel
        for (a, b) in img.pixels().zip(back.pixels()) {
            for c in 0..3 {
                assert!(i16::from(a[c]) - i16::from(b[c]) <= 1);
            }
        }
    }
}
