//! Rectangular occlusions used to train the context encoder.

use crate::Dims;
use rand::Rng;

const MIN_SIDE: u32 = 40;
const MAX_SIDE: u32 = 100;

/// A rectangular region that is blanked out of a training image
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hole {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Hole {
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

fn side_range(extent: u32) -> (u32, u32) {
    if extent >= MAX_SIDE {
        (MIN_SIDE, MAX_SIDE)
    } else {
        // small images used in tests and previews
        let max = (extent / 2).max(1);
        ((max / 2).max(1).min(MIN_SIDE), max)
    }
}

fn random_side<R: Rng>(rng: &mut R, extent: u32) -> u32 {
    let (min, max) = side_range(extent);
    if min >= max {
        min
    } else {
        rng.gen_range(min..max)
    }
}

/// Picks a random hole that lies completely inside an image of size `dims`
pub fn random_hole<R: Rng>(rng: &mut R, dims: Dims) -> Hole {
    let height = random_side(rng, dims.height);
    let width = random_side(rng, dims.width);

    let y = rng.gen_range(0..=dims.height - height);
    let x = rng.gen_range(0..=dims.width - width);

    Hole {
        x,
        y,
        width,
        height,
    }
}

/// Zeroes every channel inside `hole` of a planar (CHW) image buffer
pub fn apply_hole(planar: &mut [f32], dims: Dims, hole: Hole) {
    let plane = (dims.width * dims.height) as usize;
    debug_assert_eq!(planar.len() % plane.max(1), 0);

    for channel in planar.chunks_mut(plane) {
        for y in hole.y..(hole.y + hole.height).min(dims.height) {
            let row = (y * dims.width) as usize;
            let start = row + hole.x as usize;
            let end = row + (hole.x + hole.width).min(dims.width) as usize;
            channel[start..end].iter_mut().for_each(|v| *v = 0.0);
        }
    }
}
