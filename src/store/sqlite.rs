use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::ListingStore;
use crate::error::Result;
use crate::models::{DetailRecord, ListingKey, SnapshotRecord};

/// SQLite-backed listing store.
///
/// `scraped_listing` is the append-only snapshot log, `listing_details`
/// holds one row per listing key.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("Opened listing store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS scraped_listing (
                id           INTEGER PRIMARY KEY,
                price        INTEGER,
                title        TEXT,
                num_photos   INTEGER,
                photo_url    TEXT,
                location     TEXT,
                mileage      TEXT,
                description  TEXT,
                listing_url  TEXT,
                dealer_name  TEXT,
                scraped_at   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scraped_listing_url ON scraped_listing(listing_url);

            CREATE TABLE IF NOT EXISTS listing_details (
                url                  TEXT PRIMARY KEY,
                original_price       INTEGER,
                lowest_price         INTEGER,
                make                 TEXT,
                model                TEXT,
                year                 INTEGER,
                vin                  TEXT,
                dealer_name          TEXT,
                kilometres           INTEGER,
                status               TEXT,
                trim                 TEXT,
                body_type            TEXT,
                engine               TEXT,
                cylinder             INTEGER,
                transmission         TEXT,
                drivetrain           TEXT,
                stock_number         TEXT,
                exterior_colour      TEXT,
                interior_colour      TEXT,
                passengers           INTEGER,
                doors                INTEGER,
                fuel_type            TEXT,
                city_fuel_economy    TEXT,
                highway_fuel_economy TEXT,
                created_at           TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    pub fn snapshot_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scraped_listing", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ListingStore for SqliteStore {
    fn exists(&self, key: &ListingKey) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM listing_details WHERE url = ?1",
                [key.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn lowest_price(&self, key: &ListingKey) -> Result<Option<i64>> {
        let price = self
            .conn
            .query_row(
                "SELECT lowest_price FROM listing_details WHERE url = ?1",
                [key.as_str()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(price.flatten())
    }

    fn insert_snapshot(&mut self, r: &SnapshotRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO scraped_listing
             (price, title, num_photos, photo_url, location, mileage, description, listing_url, dealer_name, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                r.price,
                r.title,
                r.num_photos,
                r.photo_url,
                r.location,
                r.mileage,
                r.description,
                r.listing_url.as_ref().map(ListingKey::as_str),
                r.dealer_name,
                r.scraped_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_detail(&mut self, r: &DetailRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO listing_details
             (url, original_price, lowest_price, make, model, year, vin, dealer_name,
              kilometres, status, trim, body_type, engine, cylinder, transmission, drivetrain,
              stock_number, exterior_colour, interior_colour, passengers, doors, fuel_type,
              city_fuel_economy, highway_fuel_economy)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                r.url.as_str(),
                r.original_price,
                r.lowest_price,
                r.make,
                r.model,
                r.year,
                r.vin,
                r.dealer_name,
                r.kilometres,
                r.status,
                r.trim,
                r.body_type,
                r.engine,
                r.cylinder,
                r.transmission,
                r.drivetrain,
                r.stock_number,
                r.exterior_colour,
                r.interior_colour,
                r.passengers,
                r.doors,
                r.fuel_type,
                r.city_fuel_economy,
                r.highway_fuel_economy,
            ],
        )?;
        Ok(())
    }

    fn update_price(&mut self, key: &ListingKey, price: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE listing_details SET lowest_price = ?1 WHERE url = ?2",
            params![price, key.as_str()],
        )?;
        Ok(())
    }

    fn all_listing_keys(&self) -> Result<Vec<ListingKey>> {
        let mut stmt = self.conn.prepare("SELECT url FROM listing_details ORDER BY url")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|url| url.map(ListingKey::from_canonical))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::detail_record;
    use chrono::Utc;

    fn key(id: &str) -> ListingKey {
        ListingKey::from_canonical(format!("https://www.autotrader.ca/a/ford/f-150/kamloops/bc/{id}"))
    }

    fn snapshot(key: Option<ListingKey>, price: Option<i64>) -> SnapshotRecord {
        SnapshotRecord {
            price,
            title: Some("2016 Ford F-150".to_string()),
            num_photos: Some(20),
            photo_url: None,
            location: Some("Kamloops, BC".to_string()),
            mileage: Some("120,000 km".to_string()),
            description: None,
            listing_url: key,
            dealer_name: None,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_detail_lifecycle() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let k = key("5_1");
        assert!(!store.exists(&k).unwrap());
        assert_eq!(store.lowest_price(&k).unwrap(), None);

        store.insert_detail(&detail_record(&k, Some(30000))).unwrap();
        assert!(store.exists(&k).unwrap());
        assert_eq!(store.lowest_price(&k).unwrap(), Some(30000));

        store.update_price(&k, 28500).unwrap();
        assert_eq!(store.lowest_price(&k).unwrap(), Some(28500));
    }

    #[test]
    fn test_duplicate_detail_keeps_first_row() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let k = key("5_1");
        store.insert_detail(&detail_record(&k, Some(30000))).unwrap();
        store.insert_detail(&detail_record(&k, Some(1))).unwrap();
        assert_eq!(store.lowest_price(&k).unwrap(), Some(30000));
        assert_eq!(store.all_listing_keys().unwrap(), vec![k]);
    }

    #[test]
    fn test_snapshots_are_append_only() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let k = key("5_2");
        store.insert_snapshot(&snapshot(Some(k.clone()), Some(20000))).unwrap();
        store.insert_snapshot(&snapshot(Some(k), Some(19000))).unwrap();
        store.insert_snapshot(&snapshot(None, None)).unwrap();
        assert_eq!(store.snapshot_count().unwrap(), 3);
        assert!(store.all_listing_keys().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("listings.sqlite");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_detail(&detail_record(&key("5_9"), None)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.all_listing_keys().unwrap(), vec![key("5_9")]);
        assert_eq!(store.lowest_price(&key("5_9")).unwrap(), None);
    }
}
