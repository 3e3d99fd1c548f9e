// 📷 Photo Manager - copies patient photos into a managed directory
// Rows point at their photo through PhotoPath; deletes go by that path.

use crate::error::{Result, StoreError};
use log::info;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

pub trait PhotoManager {
    /// Store a copy of `source` for the patient and return where it now lives.
    /// Every call gets a fresh file; nothing already stored is touched.
    fn save_image_for(&self, identifier: &str, source: &Path) -> Result<PathBuf>;

    /// Remove a stored photo. Ok(false) when the file was already gone.
    fn delete_image(&self, path: &Path) -> Result<bool>;
}

/// Photos kept as `<dir>/patient_<serial>_<id>.<ext>`. The serial is only a
/// readable prefix: rows find their photo through PhotoPath, so renumbered
/// patients never share a file.
pub struct PhotoDirectory {
    dir: PathBuf,
}

impl PhotoDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(identifier: &str, ext: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("patient_{}_{}.{}", identifier, &id[..12], ext)
    }
}

impl PhotoManager for PhotoDirectory {
    fn save_image_for(&self, identifier: &str, source: &Path) -> Result<PathBuf> {
        let ext = image_extension(source)
            .ok_or_else(|| StoreError::UnsupportedFormat(source.to_path_buf()))?;

        fs::create_dir_all(&self.dir)?;

        let dest = self.dir.join(Self::file_name(identifier, &ext));
        fs::copy(source, &dest)?;

        info!("Stored photo for patient {} at {}", identifier, dest.display());
        Ok(dest)
    }

    fn delete_image(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed photo {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
