// 🗂️ Record Store - the single writer of the patient table
// Every mutation builds a candidate table, saves it, then reloads it from
// storage so the in-memory copy always matches what is on disk.

use crate::error::{Result, StoreError};
use crate::persistence::{read_external, FileStorage, TableStorage};
use crate::photos::PhotoManager;
use crate::record::{serials_exhausted, Record, RecordPatch, Table};
use crate::schema::Column;
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;

pub struct RecordStore<S: TableStorage = FileStorage> {
    storage: S,
    table: Table,
}

impl RecordStore<FileStorage> {
    /// Open the backing file, creating it if missing. `.xlsx` paths are kept
    /// as a workbook, anything else as CSV.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::new(FileStorage::new(path))
    }
}

impl<S: TableStorage> RecordStore<S> {
    /// Initialize storage and load the table. Never fails: unreadable storage
    /// gives an empty store.
    pub fn new(mut storage: S) -> Self {
        if let Err(e) = storage.ensure_initialized() {
            warn!("Could not initialize patient table: {}", e);
        }
        let table = storage.load();
        info!("Loaded {} patient records", table.len());
        Self { storage, table }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Read-only view of the current table
    pub fn snapshot(&self) -> &Table {
        &self.table
    }

    pub fn snapshot_owned(&self) -> Table {
        self.table.clone()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn find(&self, serial: &str) -> Option<&Record> {
        self.table.find(serial)
    }

    /// Identifier to pre-fill on a new registration
    pub fn next_serial(&self) -> Result<u64> {
        self.table.next_serial()
    }

    /// Rows whose identifiers are in `serials`, in table order
    pub fn select_rows<I, T>(&self, serials: I) -> Vec<Record>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let wanted: HashSet<String> = serials.into_iter().map(|s| s.as_ref().to_string()).collect();
        self.table
            .iter()
            .filter(|r| wanted.contains(&r.serial_no))
            .cloned()
            .collect()
    }

    /// Re-read storage, discarding the in-memory copy
    pub fn refresh(&mut self) {
        self.table = self.storage.load();
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Register a new patient. Returns the row as it was reloaded.
    pub fn create(&mut self, record: Record) -> Result<Record> {
        let record = record.normalized();
        record.validate()?;

        if self.table.contains_serial(&record.serial_no) {
            return Err(StoreError::Conflict(record.serial_no));
        }

        let serial = record.serial_no.clone();
        let mut candidate = self.table.clone();
        candidate.push(record.clone());
        self.commit(candidate)?;

        info!("Registered patient {} ({})", serial, record.name);
        Ok(self.table.find(&serial).cloned().unwrap_or(record))
    }

    /// Overwrite fields of the row identified by `serial`
    pub fn update(&mut self, serial: &str, patch: &RecordPatch) -> Result<Record> {
        let index = self
            .table
            .position(serial)
            .ok_or_else(|| StoreError::NotFound(serial.to_string()))?;

        patch.validate()?;

        let mut candidate = self.table.clone();
        let updated = match candidate.get_mut(index) {
            Some(row) => {
                patch.apply_to(row);
                row.clone()
            }
            None => return Err(StoreError::NotFound(serial.to_string())),
        };

        if updated.serial_no != serial && self.table.contains_serial(&updated.serial_no) {
            return Err(StoreError::Conflict(updated.serial_no));
        }

        self.commit(candidate)?;

        info!("Updated patient {}", updated.serial_no);
        Ok(self.table.find(&updated.serial_no).cloned().unwrap_or(updated))
    }

    /// Remove every row whose identifier is listed. Unknown identifiers are
    /// ignored. Returns the number of rows removed.
    pub fn delete<I, T>(&mut self, serials: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let targets: HashSet<String> = serials.into_iter().map(|s| s.as_ref().to_string()).collect();

        let mut candidate = self.table.clone();
        candidate.retain(|r| !targets.contains(&r.serial_no));
        let removed = self.table.len() - candidate.len();

        self.commit(candidate)?;

        info!("Deleted {} patient records", removed);
        Ok(removed)
    }

    /// Append external rows with fresh identifiers continuing after the
    /// current maximum. Incoming SerialNo values are discarded.
    pub fn import(&mut self, external: Table) -> Result<usize> {
        let start = self.table.next_serial()?;
        let count = external.len();

        let mut candidate = self.table.clone();
        for (offset, mut record) in external.into_rows().into_iter().enumerate() {
            let serial = u64::try_from(offset)
                .ok()
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(serials_exhausted)?;
            record.serial_no = serial.to_string();
            candidate.push(record);
        }

        self.commit(candidate)?;

        info!("Imported {} patient records starting at serial {}", count, start);
        Ok(count)
    }

    /// Import from a .csv or spreadsheet file
    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let external = read_external(path.as_ref())?;
        self.import(external)
    }

    // ========================================================================
    // PHOTOS
    // ========================================================================

    /// Copy a photo into the managed directory and record its path. The
    /// patient's previous photo file is removed once the new path is saved.
    pub fn set_photo<P: PhotoManager + ?Sized>(
        &mut self,
        serial: &str,
        source: &Path,
        photos: &P,
    ) -> Result<Record> {
        let previous = self
            .table
            .find(serial)
            .ok_or_else(|| StoreError::NotFound(serial.to_string()))?
            .photo()
            .map(Path::to_path_buf);

        let stored = photos.save_image_for(serial, source)?;
        let patch = RecordPatch::new().set(Column::PhotoPath, stored.to_string_lossy());
        let updated = match self.update(serial, &patch) {
            Ok(updated) => updated,
            Err(e) => {
                // The new copy is not referenced by any row
                if let Err(cleanup) = photos.delete_image(&stored) {
                    warn!("Could not remove unused photo {}: {}", stored.display(), cleanup);
                }
                return Err(e);
            }
        };

        if let Some(old) = previous.filter(|old| *old != stored) {
            if let Err(e) = photos.delete_image(&old) {
                warn!("Could not remove replaced photo {}: {}", old.display(), e);
            }
        }
        Ok(updated)
    }

    /// Delete the file the row's PhotoPath points at and clear PhotoPath.
    /// Ok(false) when the patient has no photo on disk.
    pub fn remove_photo<P: PhotoManager + ?Sized>(&mut self, serial: &str, photos: &P) -> Result<bool> {
        let record = self
            .table
            .find(serial)
            .ok_or_else(|| StoreError::NotFound(serial.to_string()))?;

        let Some(path) = record.photo().map(Path::to_path_buf) else {
            return Ok(false);
        };

        let removed = photos.delete_image(&path)?;
        self.update(serial, &RecordPatch::new().set(Column::PhotoPath, ""))?;
        Ok(removed)
    }

    // ========================================================================
    // PERSIST THEN RELOAD
    // ========================================================================

    fn commit(&mut self, candidate: Table) -> Result<()> {
        // Nothing changes in memory unless the save went through
        self.storage.save(&candidate)?;

        match self.storage.read() {
            Ok(reloaded) => {
                self.table = reloaded;
                Ok(())
            }
            Err(e) => {
                warn!("Saved table could not be re-read, in-memory table left as before: {}", e);
                Err(e)
            }
        }
    }
}
