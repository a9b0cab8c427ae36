//! Structural edge maps, the "second modality" shown next to the restored
//! image. The grayscale image is run through Canny, and inverted so edges
//! read as pencil strokes on paper.
//!
//! Canny smooths its input with a gaussian of sigma 1.4 before taking
//! gradients, which covers the 5x5 blur used to suppress photographic noise,
//! so no separate blur pass is applied.

use crate::{errors::check_range, utils, Error, ImageSource};
use image::GrayImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct Parameters {
    low_threshold: f32,
    high_threshold: f32,
    invert: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 150.0,
            invert: true,
        }
    }
}

/// Extracts edge maps from images.
///
/// ```no_run
/// let detector = painting_restoration::EdgeDetector::default();
/// detector
///     .create_edge_map("uploads/fresco.jpg", "results/fresco_edge.jpg")
///     .expect("failed to create edge map");
/// ```
#[derive(Default)]
pub struct EdgeDetector {
    params: Parameters,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hysteresis thresholds for Canny. Gradients above `high` start an
    /// edge, which is then followed while the gradient stays above `low`.
    ///
    /// Default: 50, 150
    pub fn thresholds(mut self, low: f32, high: f32) -> Self {
        self.params.low_threshold = low;
        self.params.high_threshold = high;
        self
    }

    /// Whether edges are drawn black on white rather than white on black.
    ///
    /// Default: true
    pub fn invert(mut self, invert: bool) -> Self {
        self.params.invert = invert;
        self
    }

    pub(crate) fn check_parameters_validity(&self) -> Result<(), Error> {
        check_range("low-threshold", self.params.low_threshold, 0.0, 1000.0)?;
        check_range(
            "high-threshold",
            self.params.high_threshold,
            self.params.low_threshold,
            1000.0,
        )?;
        Ok(())
    }

    /// Computes the edge map of an image. The output has the same dimensions
    /// as the input.
    pub fn edge_map(&self, img: &image::DynamicImage) -> Result<GrayImage, Error> {
        self.check_parameters_validity()?;

        let gray = img.to_luma8();
        let mut edges = imageproc::edges::canny(
            &gray,
            self.params.low_threshold,
            self.params.high_threshold,
        );

        if self.params.invert {
            image::imageops::invert(&mut edges);
        }

        Ok(edges)
    }

    /// Generates the edge map for a single image file.
    pub fn create_edge_map<'a, I: Into<ImageSource<'a>>, P: AsRef<Path>>(
        &self,
        input: I,
        output: P,
    ) -> Result<PathBuf, Error> {
        let output = output.as_ref();
        let img = utils::load_dynamic_image(input.into())?;
        let edges = self.edge_map(&img)?;
        utils::save_image(&edges, output)?;

        debug!(path = %output.display(), "edge map written");
        Ok(output.to_owned())
    }

    /// Generates edge maps for every `*.jpg` in `source`, writing them into
    /// `target` with the same file names. Returns the number of images
    /// processed.
    pub fn generate_edge_maps<S: AsRef<Path>, T: AsRef<Path>>(
        &self,
        source: S,
        target: T,
    ) -> Result<usize, Error> {
        let (source, target) = (source.as_ref(), target.as_ref());
        self.check_parameters_validity()?;
        std::fs::create_dir_all(target)?;

        let images = utils::list_images(source, &["jpg"])?;
        info!(
            count = images.len(),
            source = %source.display(),
            "generating edge maps"
        );

        for path in &images {
            if let Some(name) = path.file_name() {
                self.create_edge_map(path, target.join(name))?;
            }
        }

        info!(target = %target.display(), "edge maps saved");
        Ok(images.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{DynamicImage, Luma, Rgb, RgbImage};

    fn split_image() -> DynamicImage {
        let img = RgbImage::from_fn(64, 48, |x, _| {
            if x < 32 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([120, 90, 60])));
        let edges = EdgeDetector::new().edge_map(&img).unwrap();

        assert_eq!(edges.dimensions(), (40, 30));
        assert!(edges.pixels().all(|p| *p == Luma([255])));
    }

    #[test]
    fn step_produces_a_vertical_edge() {
        let edges = EdgeDetector::new().edge_map(&split_image()).unwrap();

        // The only edge is the boundary between the two halves
        let dark: Vec<_> = edges
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] == 0)
            .map(|(x, _, _)| x)
            .collect();

        assert!(!dark.is_empty());
        assert!(dark.iter().all(|x| (28..36).contains(x)));
    }

    #[test]
    fn grayscale_goes_straight_to_canny() {
        let img = split_image();
        let edges = EdgeDetector::new()
            .invert(false)
            .edge_map(&img)
            .unwrap();

        let expected = imageproc::edges::canny(&img.to_luma8(), 50.0, 150.0);
        assert_eq!(edges, expected);
    }

    #[test]
    fn invert_flag() {
        let edges = EdgeDetector::new()
            .invert(false)
            .edge_map(&split_image())
            .unwrap();

        assert_eq!(edges.get_pixel(2, 2), &Luma([0]));
        assert!(edges.pixels().any(|p| p[0] == 255));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = EdgeDetector::new()
            .thresholds(200.0, 100.0)
            .edge_map(&split_image())
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRange(ref ir) if ir.name == "high-threshold"));
    }
}
