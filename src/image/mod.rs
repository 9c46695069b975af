//! Uploaded image handling.
//!
//! - intake: spool an upload through a temp file and persist it as
//!   `<data_dir>/<id>.jpg` only once the JPEG magic check passed
//! - `ExifImage`: thumbnail extraction, metadata dump, and metadata
//!   strip over one stored image
//! - `exif`: the segment walker and TIFF reader underneath

pub mod errors;
pub mod exif;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use errors::{ImageError, ImageResult};
pub use exif::{ExifData, TagValue, JPEG_MAGIC};

/// One stored JPEG and its sibling artifacts
#[derive(Debug, Clone)]
pub struct ExifImage {
    path: PathBuf,
}

impl ExifImage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the stored image, for serving later
    pub fn name(&self) -> String {
        self.path.file_name().map_or_else(String::new, |name| {
            name.to_string_lossy().into_owned()
        })
    }

    /// File name of the metadata dump artifact
    pub fn json_name(&self) -> String {
        self.json_path().file_name().map_or_else(String::new, |name| {
            name.to_string_lossy().into_owned()
        })
    }

    /// File name of the thumbnail artifact
    pub fn thumb_name(&self) -> String {
        self.thumb_path().file_name().map_or_else(String::new, |name| {
            name.to_string_lossy().into_owned()
        })
    }

    fn json_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    fn thumb_path(&self) -> PathBuf {
        self.path.with_extension("thumb.jpg")
    }

    fn read_exif(&self) -> ImageResult<exif::ExifData> {
        let data = fs::read(&self.path)?;
        exif::parse(&data)
    }

    /// Orientation flag of the stored image; 1 when there is none
    pub fn orientation(&self) -> ImageResult<u16> {
        Ok(self.read_exif()?.orientation())
    }

    pub fn rotated(&self) -> ImageResult<bool> {
        Ok(self.read_exif()?.rotated())
    }

    /// Extract the embedded thumbnail to the sibling `.thumb.jpg`
    /// artifact. Returns the artifact path, or `None` when the image
    /// carries no thumbnail.
    pub fn thumb(&self) -> ImageResult<Option<PathBuf>> {
        match self.read_exif()?.thumbnail {
            Some(bytes) => {
                let path = self.thumb_path();
                fs::write(&path, bytes)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    /// Write the metadata dump (sans thumbnail bytes) to the sibling
    /// `.json` artifact and return its path.
    pub fn dump(&self) -> ImageResult<PathBuf> {
        let json = self.read_exif()?.to_json();
        let path = self.json_path();
        fs::write(&path, serde_json::to_vec(&json)?)?;
        Ok(path)
    }

    /// Strip the metadata in place, keeping the orientation flag of
    /// rotated images. The rewrite lands through a temp file so a
    /// concurrent reader never sees a half-written image.
    pub fn clean(&self) -> ImageResult<()> {
        let data = fs::read(&self.path)?;
        let stripped = exif::strip_preserving_orientation(&data)?;

        let directory = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(directory)?;
        staged.write_all(&stripped)?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

/// Spool upload bytes into `<dest>/<id>.jpg`.
///
/// The JPEG magic check runs before anything reaches the final path;
/// a rejected upload leaves no artifact behind.
///
/// # Errors
///
/// `NotAJpeg` when the first two bytes are wrong.
pub fn intake(source: &[u8], id: &str, dest: &Path) -> ImageResult<ExifImage> {
    if source.len() < 2 || source[0..2] != JPEG_MAGIC {
        return Err(ImageError::NotAJpeg);
    }

    let path = dest.join(format!("{id}.jpg"));
    let mut staged = tempfile::NamedTempFile::new_in(dest)?;
    staged.write_all(source)?;
    staged.persist(&path).map_err(|err| err.error)?;

    Ok(ExifImage::new(path))
}
