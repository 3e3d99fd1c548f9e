// 🛟 Backup - timestamped, verified copies of the backing file

use crate::error::{Result, StoreError};
use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub source: PathBuf,
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// `<stem>_backup_<YYYYmmdd_HHMMSS>.<ext>`
pub fn backup_file_name(data_file: &Path, now: NaiveDateTime) -> String {
    let stem = data_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("patients");
    let ext = data_file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    format!("{}_backup_{}.{}", stem, now.format("%Y%m%d_%H%M%S"), ext)
}

/// Copy `data_file` into `dest_dir` and check the copy hashes the same
pub fn create_backup(data_file: &Path, dest_dir: &Path, now: NaiveDateTime) -> Result<BackupReport> {
    if !data_file.is_file() {
        return Err(StoreError::MissingDataFile(data_file.to_path_buf()));
    }

    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(backup_file_name(data_file, now));

    let bytes = fs::copy(data_file, &dest)?;
    let expected = sha256_file(data_file)?;
    let actual = sha256_file(&dest)?;

    if expected != actual {
        let _ = fs::remove_file(&dest);
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("backup copy {} does not match its source", dest.display()),
        )));
    }

    info!("Backed up {} to {} ({} bytes)", data_file.display(), dest.display(), bytes);
    Ok(BackupReport {
        source: data_file.to_path_buf(),
        path: dest,
        bytes,
        sha256: actual,
    })
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(fs::read(path)?);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_backup_name_uses_timestamp() {
        let name = backup_file_name(Path::new("/data/patients.csv"), fixed_time());
        assert_eq!(name, "patients_backup_20240309_140507.csv");
    }

    #[test]
    fn test_backup_copies_and_verifies() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("patients.csv");
        fs::write(&data, "SerialNo,Name\n1,Asha\n").unwrap();

        let report = create_backup(&data, &tmp.path().join("backups"), fixed_time()).unwrap();

        assert!(report.path.exists());
        assert_eq!(fs::read(&report.path).unwrap(), fs::read(&data).unwrap());
        assert_eq!(report.sha256, sha256_file(&data).unwrap());
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(report.bytes, 21);
    }

    #[test]
    fn test_missing_data_file() {
        let tmp = TempDir::new().unwrap();
        let err = create_backup(&tmp.path().join("nope.csv"), tmp.path(), fixed_time()).unwrap_err();
        assert!(matches!(err, StoreError::MissingDataFile(_)));
    }
}
