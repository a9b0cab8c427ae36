use crate::{Dims, Error};
use std::path::{Path, PathBuf};

/// Image formats that can be read and written by the pipeline
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Helper type used to define the source of an image
#[derive(Clone)]
pub enum ImageSource<'a> {
    /// A raw buffer of image data, see `image::load_from_memory` for details
    /// on what is supported
    Memory(&'a [u8]),
    /// The path to an image to load from disk. The image format is inferred
    /// from the file extension, see `image::open` for details
    Path(&'a Path),
    /// An already loaded image
    Image(image::DynamicImage),
}

impl<'a> ImageSource<'a> {
    pub fn from_path(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<image::DynamicImage> for ImageSource<'a> {
    fn from(img: image::DynamicImage) -> Self {
        Self::Image(img)
    }
}

impl<'a, S> From<&'a S> for ImageSource<'a>
where
    S: AsRef<Path> + ?Sized + 'a,
{
    fn from(path: &'a S) -> Self {
        Self::Path(path.as_ref())
    }
}

/// Decodes an image. The format is guessed from the data itself rather than
/// the file extension, which is only a hint from whoever named the file
pub fn load_dynamic_image(src: ImageSource<'_>) -> Result<image::DynamicImage, image::ImageError> {
    match src {
        ImageSource::Memory(data) => image::load_from_memory(data),
        ImageSource::Path(path) => image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode(),
        ImageSource::Image(img) => Ok(img),
    }
}

/// Loads an image as 8-bit RGB, optionally resizing it with bilinear
/// filtering if its dimensions differ from `resize`
pub fn load_rgb(src: ImageSource<'_>, resize: Option<Dims>) -> Result<image::RgbImage, Error> {
    let img = load_dynamic_image(src)?;
    Ok(resize_rgb(&img, resize))
}

pub(crate) fn resize_rgb(img: &image::DynamicImage, resize: Option<Dims>) -> image::RgbImage {
    match resize {
        Some(size) if img.width() != size.width || img.height() != size.height => {
            image::imageops::resize(
                &img.to_rgb8(),
                size.width,
                size.height,
                image::imageops::FilterType::Triangle,
            )
        }
        _ => img.to_rgb8(),
    }
}

/// Ensures the extension of `path` is one of the formats we can write
pub fn check_output_format(path: &Path) -> Result<(), Error> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if SUPPORTED_FORMATS.contains(&ext.to_ascii_lowercase().as_str()) => Ok(()),
        Some(other) => Err(Error::UnsupportedFormat(other.to_owned())),
        None => Err(Error::UnsupportedFormat(String::new())),
    }
}

/// Saves an image, creating any missing parent directories first
pub fn save_image<P, C>(img: &image::ImageBuffer<P, C>, path: &Path) -> Result<(), Error>
where
    P: image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    check_output_format(path)?;

    if let Some(parent_path) = path.parent() {
        if !parent_path.as_os_str().is_empty() {
            std::fs::create_dir_all(parent_path)?;
        }
    }

    img.save(path)?;
    Ok(())
}

/// Lists the files in `dir` with one of the given extensions (case
/// insensitive), sorted by path so runs are reproducible
pub fn list_images(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| {
                extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            });

        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn output_formats() {
        assert!(check_output_format(Path::new("out/a.jpg")).is_ok());
        assert!(check_output_format(Path::new("out/a.JPEG")).is_ok());
        assert!(check_output_format(Path::new("a.png")).is_ok());
        assert!(matches!(
            check_output_format(Path::new("a.gif")),
            Err(Error::UnsupportedFormat(ref f)) if f == "gif"
        ));
        assert!(check_output_format(Path::new("noext")).is_err());
    }

    #[test]
    fn format_comes_from_the_contents() {
        let path = std::env::temp_dir().join(format!(
            "painting-restoration-misnamed-{}.jpg",
            std::process::id()
        ));

        let img = image::RgbImage::from_pixel(5, 3, image::Rgb([10, 200, 30]));
        img.save_with_format(&path, image::ImageFormat::Png).unwrap();

        let loaded = load_rgb(ImageSource::from_path(&path), None).unwrap();
        std::fs::remove_file(&path).unwrap();

        // png is lossless, so the pixels survive exactly
        assert_eq!(loaded, img);
    }

    #[test]
    fn resize_only_when_needed() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(10, 6));

        let same = resize_rgb(&img, Some(Dims::new(10, 6)));
        assert_eq!(same.dimensions(), (10, 6));

        let resized = resize_rgb(&img, Some(Dims::new(20, 4)));
        assert_eq!(resized.dimensions(), (20, 4));

        let untouched = resize_rgb(&img, None);
        assert_eq!(untouched.dimensions(), (10, 6));
    }
}
