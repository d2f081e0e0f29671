use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Leading `{sellerTypeId}_{adId}` token of a detail-page URL.
static LISTING_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?(\d+_\d+)").expect("listing token pattern"));

/// Canonical identity of a vehicle ad.
///
/// Holds the detail URL cut right after its first `{digits}_{digits}` token,
/// so tracking suffixes and query strings never take part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingKey(String);

impl ListingKey {
    /// Resolve `raw` against `base` and cut it down to its canonical prefix.
    ///
    /// Returns `None` when the URL cannot be resolved or carries no listing token.
    pub fn from_url(raw: &str, base: &Url) -> Option<Self> {
        let resolved = base.join(raw.trim()).ok()?;
        let found = LISTING_TOKEN.find(resolved.as_str())?;
        Some(Self(found.as_str().to_string()))
    }

    /// Wrap a string already known to be canonical (e.g. read back from the store).
    pub fn from_canonical(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The `{sellerTypeId}_{adId}` token.
    pub fn ad_token(&self) -> Option<&str> {
        LISTING_TOKEN
            .captures(&self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// The canonical detail-page URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field values as read from the page, before any coercion.
///
/// A `None` value means the field could not be extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<String>) {
        self.fields.insert(field.into(), value);
    }

    /// Raw value of `field`, or `None` if absent or never extracted.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_deref())
    }

    /// Number of fields that carry a value.
    pub fn populated(&self) -> usize {
        self.fields.values().filter(|v| v.is_some()).count()
    }

    /// Copy every field of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: RawRecord) {
        self.fields.extend(other.fields);
    }
}

/// One listing card as seen on a catalog page during one crawl pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub price: Option<i64>,
    pub title: Option<String>,
    pub num_photos: Option<i64>,
    pub photo_url: Option<String>,
    pub location: Option<String>,
    pub mileage: Option<String>,
    pub description: Option<String>,
    pub listing_url: Option<ListingKey>,
    pub dealer_name: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Long-lived per-ad record, created on first encounter of a listing key.
///
/// Only `lowest_price` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub url: ListingKey,
    pub original_price: Option<i64>,
    pub lowest_price: Option<i64>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub vin: Option<String>,
    pub dealer_name: Option<String>,
    pub kilometres: Option<i64>,
    pub status: Option<String>,
    pub trim: Option<String>,
    pub body_type: Option<String>,
    pub engine: Option<String>,
    pub cylinder: Option<i64>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub stock_number: Option<String>,
    pub exterior_colour: Option<String>,
    pub interior_colour: Option<String>,
    pub passengers: Option<i64>,
    pub doors: Option<i64>,
    pub fuel_type: Option<String>,
    pub city_fuel_economy: Option<String>,
    pub highway_fuel_economy: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.autotrader.ca/cars/bc/").unwrap()
    }

    #[test]
    fn test_key_strips_tracking_suffix() {
        let raw = "https://www.autotrader.ca/a/bmw/4%20series/langley/british%20columbia/5_60855243_20110808063216984/?showcpo=ShowCpo&ncse=no&ursrc=xpl";
        let key = ListingKey::from_url(raw, &base()).unwrap();
        assert_eq!(
            key.as_str(),
            "https://www.autotrader.ca/a/bmw/4%20series/langley/british%20columbia/5_60855243"
        );
        assert_eq!(key.ad_token(), Some("5_60855243"));
    }

    #[test]
    fn test_key_is_idempotent() {
        let raw = "https://www.autotrader.ca/a/acura/ilx/surrey/british%20columbia/19_12745170_20231001/?urp=1";
        let once = ListingKey::from_url(raw, &base()).unwrap();
        let twice = ListingKey::from_url(once.as_str(), &base()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_same_ad_different_tracking_same_key() {
        let a = ListingKey::from_url("/a/kia/soul/kelowna/bc/5_111_222/?urp=1", &base()).unwrap();
        let b = ListingKey::from_url("/a/kia/soul/kelowna/bc/5_111_999/?sprx=-2&urm=8", &base()).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("https://www.autotrader.ca/a/kia/"));
    }

    #[test]
    fn test_key_requires_token() {
        assert!(ListingKey::from_url("https://www.autotrader.ca/cars/bc/", &base()).is_none());
    }

    #[test]
    fn test_raw_record_merge_and_populated() {
        let mut a = RawRecord::new();
        a.set("make", Some("BMW".to_string()));
        a.set("vin", None);
        let mut b = RawRecord::new();
        b.set("trim", Some("xDrive".to_string()));
        a.merge(b);
        assert_eq!(a.populated(), 2);
        assert_eq!(a.get("vin"), None);
        assert_eq!(a.get("trim"), Some("xDrive"));
    }
}
