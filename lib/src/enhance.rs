use crate::{errors::check_range, utils, Error, ImageSource};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::debug;

struct Parameters {
    contrast: f32,
    color: f32,
    sharpen_sigma: f32,
    sharpen_amount: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            contrast: 1.15,
            color: 1.1,
            sharpen_sigma: 3.0,
            sharpen_amount: 0.4,
        }
    }
}

/// Light post-processing applied to the model output: a mild contrast boost,
/// a saturation boost to bring back faded pigments, and an unsharp mask.
#[derive(Default)]
pub struct Enhancer {
    params: Parameters,
}

impl Enhancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contrast factor, 1.0 leaves the image untouched.
    ///
    /// Default: 1.15
    pub fn contrast(mut self, factor: f32) -> Self {
        self.params.contrast = factor;
        self
    }

    /// Saturation factor, 1.0 leaves the image untouched and 0.0 produces a
    /// grayscale image.
    ///
    /// Default: 1.1
    pub fn color(mut self, factor: f32) -> Self {
        self.params.color = factor;
        self
    }

    /// The blur used to build the unsharp mask, and how much of the
    /// difference between the image and the blurred image is added back.
    ///
    /// Default: 3.0, 0.4
    pub fn sharpen(mut self, sigma: f32, amount: f32) -> Self {
        self.params.sharpen_sigma = sigma;
        self.params.sharpen_amount = amount;
        self
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        check_range("contrast", self.params.contrast, 0.0, 10.0)?;
        check_range("color", self.params.color, 0.0, 10.0)?;
        check_range("sharpen-sigma", self.params.sharpen_sigma, f32::EPSILON, 100.0)?;
        check_range("sharpen-amount", self.params.sharpen_amount, 0.0, 5.0)?;
        Ok(())
    }

    /// Runs contrast, color and sharpening, in that order
    pub fn enhance(&self, img: RgbImage) -> Result<RgbImage, Error> {
        self.check_parameters_validity()?;

        let img = adjust_contrast(&img, self.params.contrast);
        let img = adjust_color(&img, self.params.color);
        Ok(unsharp_mask(
            &img,
            self.params.sharpen_sigma,
            self.params.sharpen_amount,
        ))
    }

    /// Enhances a single image file
    pub fn enhance_image<'a, I: Into<ImageSource<'a>>, P: AsRef<Path>>(
        &self,
        input: I,
        output: P,
    ) -> Result<PathBuf, Error> {
        let output = output.as_ref();
        let img = utils::load_rgb(input.into(), None)?;
        let enhanced = self.enhance(img)?;
        utils::save_image(&enhanced, output)?;

        debug!(path = %output.display(), "enhanced image written");
        Ok(output.to_owned())
    }
}

/// ITU-R 601-2 luma, in the fixed point form PIL uses
#[inline]
fn luma(p: &Rgb<u8>) -> u8 {
    let [r, g, b] = p.0;
    ((u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16) as u8
}

#[inline]
fn blend(degenerate: f32, value: u8, factor: f32) -> u8 {
    (degenerate + factor * (f32::from(value) - degenerate)).clamp(0.0, 255.0) as u8
}

/// Interpolates every channel between the mean luminance of the image and
/// its actual value.
pub fn adjust_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return img.clone();
    }

    let sum: u64 = img.pixels().map(|p| u64::from(luma(p))).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = blend(mean, *c, factor);
        }
    }
    out
}

/// Interpolates every pixel between its own luminance and its color.
pub fn adjust_color(img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let gray = f32::from(luma(pixel));
        for c in pixel.0.iter_mut() {
            *c = blend(gray, *c, factor);
        }
    }
    out
}

/// `(1 + amount) * img - amount * blur(img)`, saturated to the u8 range
pub fn unsharp_mask(img: &RgbImage, sigma: f32, amount: f32) -> RgbImage {
    let blurred = imageproc::filter::gaussian_blur_f32(img, sigma);

    let mut out = img.clone();
    for (pixel, smooth) in out.pixels_mut().zip(blurred.pixels()) {
        for (c, s) in pixel.0.iter_mut().zip(smooth.0.iter()) {
            let v = (1.0 + amount) * f32::from(*c) - amount * f32::from(*s);
            *c = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
