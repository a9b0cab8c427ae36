//! Procedurally generated "paintings" used to train the context encoder when
//! no real dataset is at hand: a sepia toned canvas covered with random
//! strokes and blobs of paint.

use crate::{utils, Dims, Error};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

const SHAPES_PER_IMAGE: usize = 10;

/// Generator for synthetic training images
pub struct SyntheticArt {
    count: usize,
    dims: Dims,
    seed: u64,
}

impl Default for SyntheticArt {
    fn default() -> Self {
        Self {
            count: 20,
            dims: Dims::new(384, 256),
            seed: 0,
        }
    }
}

impl SyntheticArt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images to generate.
    ///
    /// Default: 20
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Dimensions of the generated images.
    ///
    /// Default: 384x256
    pub fn dims(mut self, dims: Dims) -> Self {
        self.dims = dims;
        self
    }

    /// Default: 0
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Paints a single image
    pub fn paint<R: Rng>(&self, rng: &mut R) -> RgbImage {
        let Dims { width, height } = self.dims;

        let mut img = RgbImage::from_pixel(width, height, background(rng));
        if width == 0 || height == 0 {
            return img;
        }

        for _ in 0..SHAPES_PER_IMAGE {
            let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);

            let start = (rng.gen_range(0..width) as f32, rng.gen_range(0..height) as f32);
            let end = (rng.gen_range(0..width) as f32, rng.gen_range(0..height) as f32);
            let thickness = rng.gen_range(1..5);
            draw_thick_line(&mut img, start, end, thickness, color);

            let center = (
                rng.gen_range(0..width) as i32,
                rng.gen_range(0..height) as i32,
            );
            let radius = rng.gen_range(5..50);
            draw_filled_circle_mut(&mut img, center, radius, color);
        }

        img
    }

    /// Writes `art_{i}.jpg` images into `dir`, returning their paths
    pub fn generate<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, Error> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        info!(count = self.count, dir = %dir.display(), "generating synthetic images");

        let mut rng = rand_pcg::Pcg32::seed_from_u64(self.seed);
        let mut paths = Vec::with_capacity(self.count);

        for i in 0..self.count {
            let path = dir.join(format!("art_{}.jpg", i));
            utils::save_image(&self.paint(&mut rng), &path)?;
            paths.push(path);
        }

        Ok(paths)
    }
}

/// A brownish, faded canvas color
fn background<R: Rng>(rng: &mut R) -> Rgb<u8> {
    Rgb([
        rng.gen_range(100..200),
        rng.gen_range(100..200),
        rng.gen_range(100..200),
    ])
}

/// Strokes a line `thickness` pixels wide by drawing offset copies of it
/// along its normal
fn draw_thick_line(
    img: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let len = (dx * dx + dy * dy).sqrt();
    let (nx, ny) = if len > 0.0 {
        (-dy / len, dx / len)
    } else {
        (0.0, 1.0)
    };

    let half = (thickness as f32 - 1.0) / 2.0;
    for i in 0..thickness {
        let offset = i as f32 - half;
        draw_line_segment_mut(
            img,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            color,
        );
    }
}

/// Generates the default training and test splits under `root`, 20 images
/// in `root/train` and 5 in `root/test`
pub fn generate_dataset<P: AsRef<Path>>(root: P, seed: u64) -> Result<(), Error> {
    let root = root.as_ref();

    SyntheticArt::new()
        .count(20)
        .seed(seed)
        .generate(root.join("train"))?;
    SyntheticArt::new()
        .count(5)
        .seed(seed.wrapping_add(1))
        .generate(root.join("test"))?;

    info!("synthetic dataset complete");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_seed_same_painting() {
        let art = SyntheticArt::new().dims(Dims::new(64, 48));

        let a = art.paint(&mut rand_pcg::Pcg32::seed_from_u64(5));
        let b = art.paint(&mut rand_pcg::Pcg32::seed_from_u64(5));
        let c = art.paint(&mut rand_pcg::Pcg32::seed_from_u64(6));

        assert_eq!(a.dimensions(), (64, 48));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn background_is_sepia_range() {
        let mut rng = rand_pcg::Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            assert!(background(&mut rng).0.iter().all(|c| (100..200).contains(c)));
        }
    }

    #[test]
    fn generate_writes_numbered_jpegs() {
        let dir = std::env::temp_dir().join(format!("synth-test-{}", std::process::id()));
        let paths = SyntheticArt::new()
            .count(3)
            .dims(Dims::new(32, 16))
            .generate(&dir)
            .unwrap();

        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2], dir.join("art_2.jpg"));

        let img = image::open(&paths[0]).unwrap();
        assert_eq!((img.width(), img.height()), (32, 16));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
