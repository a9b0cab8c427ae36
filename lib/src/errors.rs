use std::{fmt, path::PathBuf};

use crate::Dims;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct InvalidDims {
    pub(crate) dims: Dims,
    pub(crate) multiple: u32,
}

impl fmt::Display for InvalidDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the model size ({}x{}) must be a multiple of {} in both dimensions",
            self.dims.width, self.dims.height, self.multiple
        )
    }
}

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    Image(image::ImageError),
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// The encoder downsamples 4 times, so the model size has to survive that
    InvalidDims(InvalidDims),
    Io(std::io::Error),
    /// The user specified an image format we don't support
    UnsupportedFormat(String),
    /// The training directory did not contain a single usable image
    NoTrainingImages(PathBuf),
    /// The tensor backend or the weight recorder failed
    Model(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::InvalidDims(id) => write!(f, "{}", id),
            Self::Io(io) => write!(f, "{}", io),
            Self::UnsupportedFormat(fmt) => {
                write!(f, "the image format '{}' is not supported", fmt)
            }
            Self::NoTrainingImages(dir) => write!(
                f,
                "no training images found in '{}', generate some with the `synth` command first",
                dir.display()
            ),
            Self::Model(msg) => write!(f, "model error: {}", msg),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}

impl From<burn::record::RecorderError> for Error {
    fn from(re: burn::record::RecorderError) -> Self {
        Self::Model(format!("{:?}", re))
    }
}

impl From<burn::tensor::DataError> for Error {
    fn from(de: burn::tensor::DataError) -> Self {
        Self::Model(format!("{:?}", de))
    }
}

/// Checks that `value` lies in `min..=max`
pub(crate) fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), Error> {
    if value.is_nan() || value < min || value > max {
        return Err(Error::InvalidRange(InvalidRange {
            min,
            max,
            value,
            name,
        }));
    }

    Ok(())
}
