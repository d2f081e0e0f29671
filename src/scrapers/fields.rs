//! Declarative field templates for catalog cards and detail pages.
//!
//! A template maps each logical field name to where it lives on the page.
//! Templates are plain data: they can be loaded from the config file and are
//! handed to the extractors by value, never mutated at runtime.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

/// What to read from a located element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Concatenated text content.
    Text,
    /// Value of the named attribute (e.g. `href`).
    Named(String),
}

/// Post-processing applied to an extracted value before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcess {
    Strip,
}

/// One catalog-card field: name, locator, attribute kind, post-processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
    pub attribute: Attribute,
    #[serde(default)]
    pub post: Option<PostProcess>,
}

impl FieldSpec {
    fn new(name: &str, selector: &str, attribute: Attribute, post: Option<PostProcess>) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            attribute,
            post,
        }
    }

    fn text(name: &str, selector: &str) -> Self {
        Self::new(name, selector, Attribute::Text, None)
    }

    fn named(name: &str, selector: &str, attribute: &str) -> Self {
        Self::new(name, selector, Attribute::Named(attribute.to_string()), None)
    }
}

/// Catalog page template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTemplate {
    /// One element per listing card; also the page-ready anchor.
    pub card_selector: String,
    /// The "next page" control.
    pub next_page_selector: String,
    pub fields: Vec<FieldSpec>,
}

impl CatalogTemplate {
    pub fn validate(&self) -> Result<()> {
        check_selector(&self.card_selector)?;
        check_selector(&self.next_page_selector)?;
        for field in &self.fields {
            check_selector(&field.selector)?;
        }
        Ok(())
    }
}

impl Default for CatalogTemplate {
    fn default() -> Self {
        Self {
            card_selector: "#result-item-inner-div".to_string(),
            next_page_selector: "a.last-page-link".to_string(),
            fields: vec![
                FieldSpec::text("price", ".price-amount"),
                FieldSpec::text("title", ".h2-title .result-title .title-with-trim"),
                FieldSpec::new("num_photos", ".photo-count", Attribute::Text, Some(PostProcess::Strip)),
                FieldSpec::named("photo_url", ".main-photo img", "data-original"),
                FieldSpec::text("location", ".proximity .proximity-text.overflow-ellipsis"),
                FieldSpec::text("mileage", ".odometer-proximity"),
                FieldSpec::text("description", ".details"),
                FieldSpec::named("listing_url", ".inner-link", "href"),
                FieldSpec::text("dealer_name", "div.seller-name"),
            ],
        }
    }
}

/// Maps a key of the embedded basic-info JSON object to a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonField {
    pub json_key: String,
    pub field: String,
}

/// Maps a specification-list label to a record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecLabel {
    pub label: String,
    pub field: String,
}

/// Detail page template.
///
/// The specification list is read row by row: the key and value selectors
/// are matched inside each row, so a row missing its value cannot shift the
/// values of the rows after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailTemplate {
    /// Container that must appear before the page counts as loaded.
    pub ready_selector: String,
    /// Scripts searched for the embedded metadata blob.
    pub script_selector: String,
    /// JSON key whose object value holds the basic info.
    pub basic_info_key: String,
    /// One element per specification entry.
    pub spec_row_selector: String,
    /// Label element, relative to a row.
    pub spec_key_selector: String,
    /// Value element, relative to a row.
    pub spec_value_selector: String,
    pub basic_info: Vec<JsonField>,
    pub spec_fields: Vec<SpecLabel>,
}

impl DetailTemplate {
    /// Record field for a specification label, matched case-insensitively.
    pub fn spec_field(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.spec_fields
            .iter()
            .find(|s| s.label.eq_ignore_ascii_case(label))
            .map(|s| s.field.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        check_selector(&self.ready_selector)?;
        check_selector(&self.script_selector)?;
        check_selector(&self.spec_row_selector)?;
        check_selector(&self.spec_key_selector)?;
        check_selector(&self.spec_value_selector)?;
        if self.basic_info_key.is_empty() {
            return Err(CrawlError::Config("basic_info_key must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for DetailTemplate {
    fn default() -> Self {
        let basic = [
            ("price", "price"),
            ("make", "make"),
            ("model", "model"),
            ("year", "year"),
            ("vin", "vin"),
            ("dealerName", "dealer_name"),
        ];
        let specs = [
            ("Kilometres", "kilometres"),
            ("Status", "status"),
            ("Trim", "trim"),
            ("Body Type", "body_type"),
            ("Engine", "engine"),
            ("Cylinder", "cylinder"),
            ("Transmission", "transmission"),
            ("Drivetrain", "drivetrain"),
            ("Stock Number", "stock_number"),
            ("Exterior Colour", "exterior_colour"),
            ("Interior Colour", "interior_colour"),
            ("Passengers", "passengers"),
            ("Doors", "doors"),
            ("Fuel Type", "fuel_type"),
            ("City Fuel Economy", "city_fuel_economy"),
            ("Hwy Fuel Economy", "highway_fuel_economy"),
        ];

        Self {
            ready_selector: "#specificationWidget".to_string(),
            script_selector: "script".to_string(),
            basic_info_key: "adBasicInfo".to_string(),
            spec_row_selector: "#sl-card-body li.list-item".to_string(),
            spec_key_selector: "[id^='spec-key-']".to_string(),
            spec_value_selector: "[id^='spec-value-']".to_string(),
            basic_info: basic
                .iter()
                .map(|(json_key, field)| JsonField {
                    json_key: json_key.to_string(),
                    field: field.to_string(),
                })
                .collect(),
            spec_fields: specs
                .iter()
                .map(|(label, field)| SpecLabel {
                    label: label.to_string(),
                    field: field.to_string(),
                })
                .collect(),
        }
    }
}

fn check_selector(css: &str) -> Result<()> {
    Selector::parse(css)
        .map(|_| ())
        .map_err(|e| CrawlError::Config(format!("invalid selector {css:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_are_valid() {
        CatalogTemplate::default().validate().unwrap();
        DetailTemplate::default().validate().unwrap();
    }

    #[test]
    fn test_default_catalog_fields() {
        let template = CatalogTemplate::default();
        let field = |name: &str| template.fields.iter().find(|f| f.name == name).unwrap();
        assert_eq!(template.fields.len(), 9);
        assert_eq!(field("listing_url").attribute, Attribute::Named("href".to_string()));
        assert_eq!(field("photo_url").attribute, Attribute::Named("data-original".to_string()));
        assert_eq!(field("num_photos").post, Some(PostProcess::Strip));
        assert_eq!(field("price").attribute, Attribute::Text);
    }

    #[test]
    fn test_spec_label_lookup_ignores_case_and_padding() {
        let template = DetailTemplate::default();
        assert_eq!(template.spec_field("  body type "), Some("body_type"));
        assert_eq!(template.spec_field("Hwy Fuel Economy"), Some("highway_fuel_economy"));
        assert_eq!(template.spec_field("Warranty"), None);
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut template = CatalogTemplate::default();
        template.next_page_selector = "a[".to_string();
        assert!(matches!(template.validate(), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_template_loads_from_toml() {
        let toml = r#"
            card_selector = ".card"
            next_page_selector = "a.next"

            [[fields]]
            name = "price"
            selector = ".price"
            attribute = "text"

            [[fields]]
            name = "listing_url"
            selector = "a"
            attribute = { named = "href" }
            post = "strip"
        "#;
        let template: CatalogTemplate = toml::from_str(toml).unwrap();
        assert_eq!(template.fields.len(), 2);
        assert_eq!(template.fields[1].attribute, Attribute::Named("href".to_string()));
        assert_eq!(template.fields[1].post, Some(PostProcess::Strip));
    }
}
