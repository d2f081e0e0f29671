//! Type coercion of raw field values.
//!
//! Every coercion is independent and fail-soft: a value that does not match
//! its expected shape becomes `None` and the anomaly is logged, the rest of
//! the record is unaffected.

use chrono::Utc;
use tracing::warn;
use url::Url;

use crate::models::{DetailRecord, ListingKey, RawRecord, SnapshotRecord};

/// Coercion rule attached to a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// `"$12,345"` -> `12345`
    Price,
    /// `"12,345km"` -> `12345`
    Kilometres,
    /// `"4 doors"` -> `4`
    Doors,
    /// `"2018"` -> `2018`
    Integer,
    /// Free text folded to lowercase.
    Lowercase,
    /// Detail URL reduced to its listing key.
    ListingUrl,
    /// Kept as trimmed text.
    Text,
}

pub fn field_class(field: &str) -> FieldClass {
    match field {
        "price" | "lowest_price" | "original_price" => FieldClass::Price,
        "kilometres" => FieldClass::Kilometres,
        "doors" => FieldClass::Doors,
        "year" | "cylinder" | "passengers" | "num_photos" => FieldClass::Integer,
        "make" | "model" | "fuel_type" | "exterior_colour" | "interior_colour" => {
            FieldClass::Lowercase
        }
        "listing_url" | "url" => FieldClass::ListingUrl,
        _ => FieldClass::Text,
    }
}

pub fn parse_price(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| !matches!(c, ',' | ' '))
        .collect();
    let whole = cleaned.split('.').next()?;
    whole.parse().ok()
}

pub fn parse_kilometres(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect::<String>()
        .to_ascii_lowercase();
    cleaned.strip_suffix("km").unwrap_or(&cleaned).parse().ok()
}

pub fn parse_doors(raw: &str) -> Option<i64> {
    raw.split_whitespace().next()?.parse().ok()
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Turns raw records into typed ones.
#[derive(Debug, Clone)]
pub struct Normalizer {
    base_url: Url,
}

impl Normalizer {
    /// `base_url` resolves relative listing links.
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Integer value of `field` under its class rule.
    pub fn integer(&self, raw: &RawRecord, field: &str) -> Option<i64> {
        let value = raw.get(field)?;
        let parsed = match field_class(field) {
            FieldClass::Price => parse_price(value),
            FieldClass::Kilometres => parse_kilometres(value),
            FieldClass::Doors => parse_doors(value),
            _ => parse_integer(value),
        };
        if parsed.is_none() {
            warn!(field, value, "Could not coerce field to integer");
        }
        parsed
    }

    /// Text value of `field`, trimmed, lowercased for categorical fields.
    pub fn text(&self, raw: &RawRecord, field: &str) -> Option<String> {
        let value = raw.get(field)?.trim();
        if value.is_empty() {
            return None;
        }
        match field_class(field) {
            FieldClass::Lowercase => Some(value.to_lowercase()),
            _ => Some(value.to_string()),
        }
    }

    /// Listing key of a URL-class field, resolved against the base URL.
    pub fn listing_key(&self, raw: &RawRecord, field: &str) -> Option<ListingKey> {
        let value = raw.get(field)?;
        let class = field_class(field);
        if class != FieldClass::ListingUrl {
            warn!(field, ?class, "Field does not hold a listing URL");
            return None;
        }
        let key = ListingKey::from_url(value, &self.base_url);
        if key.is_none() {
            warn!(field, value, "Listing URL has no listing token");
        }
        key
    }

    pub fn snapshot(&self, raw: &RawRecord) -> SnapshotRecord {
        SnapshotRecord {
            price: self.integer(raw, "price"),
            title: self.text(raw, "title"),
            num_photos: self.integer(raw, "num_photos"),
            photo_url: self.text(raw, "photo_url"),
            location: self.text(raw, "location"),
            mileage: self.text(raw, "mileage"),
            description: self.text(raw, "description"),
            listing_url: self.listing_key(raw, "listing_url"),
            dealer_name: self.text(raw, "dealer_name"),
            scraped_at: Utc::now(),
        }
    }

    /// Build the detail record for `key`; `lowest_price` starts at the listed price.
    pub fn detail(&self, key: ListingKey, raw: &RawRecord) -> DetailRecord {
        let price = self.integer(raw, "price");
        DetailRecord {
            url: key,
            original_price: price,
            lowest_price: price,
            make: self.text(raw, "make"),
            model: self.text(raw, "model"),
            year: self.integer(raw, "year"),
            vin: self.text(raw, "vin"),
            dealer_name: self.text(raw, "dealer_name"),
            kilometres: self.integer(raw, "kilometres"),
            status: self.text(raw, "status"),
            trim: self.text(raw, "trim"),
            body_type: self.text(raw, "body_type"),
            engine: self.text(raw, "engine"),
            cylinder: self.integer(raw, "cylinder"),
            transmission: self.text(raw, "transmission"),
            drivetrain: self.text(raw, "drivetrain"),
            stock_number: self.text(raw, "stock_number"),
            exterior_colour: self.text(raw, "exterior_colour"),
            interior_colour: self.text(raw, "interior_colour"),
            passengers: self.integer(raw, "passengers"),
            doors: self.integer(raw, "doors"),
            fuel_type: self.text(raw, "fuel_type"),
            city_fuel_economy: self.text(raw, "city_fuel_economy"),
            highway_fuel_economy: self.text(raw, "highway_fuel_economy"),
        }
    }
}
