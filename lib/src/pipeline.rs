//! Runs one uploaded photograph through every stage of the restoration and
//! names the resulting files.

use crate::{utils, EdgeDetector, Enhancer, Error, ImageSource, Restorer};
use std::path::{Path, PathBuf};
use tracing::info;

/// Extensions accepted for uploads
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Whether a file name has one of the [`ALLOWED_EXTENSIONS`]
pub fn allowed_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Reduces an untrusted file name to something safe to join onto a
/// directory: only the last path component is kept, whitespace becomes `_`,
/// anything other than ASCII alphanumerics, `.`, `-` and `_` is dropped, as
/// are dots and underscores at either end. Returns `None` if nothing is left.
pub fn secure_filename(name: &str) -> Option<String> {
    let last = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = last
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_owned())
    }
}

/// File names of the results produced for a single upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultNames {
    pub edge: String,
    pub restored: String,
    pub enhanced: String,
}

impl ResultNames {
    pub fn new(stem: &str, timestamp: i64) -> Self {
        Self {
            edge: format!("{}_edge_{}.jpg", stem, timestamp),
            restored: format!("{}_restored_{}.jpg", stem, timestamp),
            enhanced: format!("{}_enhanced_{}.jpg", stem, timestamp),
        }
    }
}

/// The three stages, edge map, restoration and enhancement, bundled together
pub struct Pipeline {
    pub edges: EdgeDetector,
    pub restorer: Restorer,
    pub enhancer: Enhancer,
}

impl Pipeline {
    pub fn new(restorer: Restorer) -> Self {
        Self {
            edges: EdgeDetector::default(),
            restorer,
            enhancer: Enhancer::default(),
        }
    }

    /// Processes the image at `upload`, writing all results into
    /// `results_dir`. The returned names are relative to `results_dir`.
    pub fn run<U: AsRef<Path>, R: AsRef<Path>>(
        &self,
        upload: U,
        results_dir: R,
        timestamp: i64,
    ) -> Result<ResultNames, Error> {
        let (upload, results_dir) = (upload.as_ref(), results_dir.as_ref());
        let stem = upload
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let names = ResultNames::new(stem, timestamp);

        // the extension comes from the client, the decoder from the contents
        let img = utils::load_dynamic_image(ImageSource::from_path(upload))?;

        info!(upload = %upload.display(), "generating edge map");
        let edges = self.edges.edge_map(&img)?;
        utils::save_image(&edges, &results_dir.join(&names.edge))?;

        info!("restoring image");
        let restored_path: PathBuf = results_dir.join(&names.restored);
        let restored = self.restorer.restore(&img)?;
        utils::save_image(&restored, &restored_path)?;

        info!("enhancing restored image");
        self.enhancer
            .enhance_image(&restored_path, results_dir.join(&names.enhanced))?;

        Ok(names)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allowed_extensions() {
        assert!(allowed_file("fresco.jpg"));
        assert!(allowed_file("fresco.JPEG"));
        assert!(allowed_file("a.b.png"));
        assert!(!allowed_file("fresco.gif"));
        assert!(!allowed_file("jpg"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn secure_filenames() {
        assert_eq!(secure_filename("My Painting.jpg").as_deref(), Some("My_Painting.jpg"));
        assert_eq!(
            secure_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            secure_filename("C:\\Users\\me\\scan 1.png").as_deref(),
            Some("scan_1.png")
        );
        assert_eq!(secure_filename(".hidden.jpg").as_deref(), Some("hidden.jpg"));
        assert_eq!(secure_filename("żółw.jpg").as_deref(), Some("w.jpg"));
        assert_eq!(secure_filename("fresco.jpg.").as_deref(), Some("fresco.jpg"));
        assert_eq!(secure_filename("__init__.png").as_deref(), Some("init__.png"));
        assert_eq!(secure_filename("._.").as_deref(), None);
        assert_eq!(secure_filename("../.."), None);
        assert_eq!(secure_filename(""), None);
    }

    #[test]
    fn result_names() {
        let names = ResultNames::new("fresco", 1_700_000_000);
        assert_eq!(names.edge, "fresco_edge_1700000000.jpg");
        assert_eq!(names.restored, "fresco_restored_1700000000.jpg");
        assert_eq!(names.enhanced, "fresco_enhanced_1700000000.jpg");
    }
}
