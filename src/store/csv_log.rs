use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::Result;
use crate::models::SnapshotRecord;

/// Append-only CSV log of snapshot rows. The header is written once, when
/// the file is new.
pub struct SnapshotLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SnapshotLog {
    /// Open a fresh `{site}_{timestamp}.csv` under `dir`.
    pub fn create(dir: &Path, site: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        Self::open(dir.join(format!("{site}_{stamp}.csv")))
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, records: &[SnapshotRecord]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingKey;
    use chrono::Utc;

    fn record(price: i64) -> SnapshotRecord {
        SnapshotRecord {
            price: Some(price),
            title: Some("2015 Subaru Outback".to_string()),
            num_photos: None,
            photo_url: None,
            location: None,
            mileage: Some("150,000 km".to_string()),
            description: None,
            listing_url: Some(ListingKey::from_canonical("https://www.autotrader.ca/a/subaru/outback/bc/5_77")),
            dealer_name: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.csv");

        let mut log = SnapshotLog::open(path.clone()).unwrap();
        log.append(&[record(12000), record(11500)]).unwrap();
        log.close().unwrap();

        let mut log = SnapshotLog::open(path.clone()).unwrap();
        log.append(&[record(11000)]).unwrap();
        log.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("price,title,num_photos"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("price,")).count(), 1);
        assert!(lines[3].starts_with("11000,2015 Subaru Outback,"));
        assert!(lines[3].contains("https://www.autotrader.ca/a/subaru/outback/bc/5_77"));
    }

    #[test]
    fn test_create_names_file_after_site() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::create(&dir.path().join("scraped_data"), "autotrader").unwrap();
        let name = log.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("autotrader_"));
        assert!(name.ends_with(".csv"));
        assert!(log.path().exists());
    }
}
