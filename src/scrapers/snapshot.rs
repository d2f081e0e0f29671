use scraper::ElementRef;
use tracing::debug;

use super::fields::CatalogTemplate;
use super::page::{extract_field, RenderedPage};
use crate::models::RawRecord;

/// Reads listing cards off a catalog page.
pub struct SnapshotExtractor {
    template: CatalogTemplate,
}

impl SnapshotExtractor {
    pub fn new(template: CatalogTemplate) -> Self {
        Self { template }
    }

    pub fn card_selector(&self) -> &str {
        &self.template.card_selector
    }

    pub fn next_page_selector(&self) -> &str {
        &self.template.next_page_selector
    }

    /// Extract every template field from one card. Fields that cannot be
    /// read are recorded as `None`; this never fails as a whole.
    pub fn extract(&self, card: ElementRef<'_>) -> RawRecord {
        let mut record = RawRecord::new();
        for spec in &self.template.fields {
            let value = extract_field(card, spec);
            if value.is_none() {
                debug!(field = %spec.name, selector = %spec.selector, "Field missing on card");
            }
            record.set(spec.name.as_str(), value);
        }
        record
    }

    /// Extract all cards present on `page`, in document order.
    pub fn extract_page(&self, page: &RenderedPage) -> Vec<RawRecord> {
        page.find_all(&self.template.card_selector)
            .into_iter()
            .map(|card| self.extract(card))
            .collect()
    }
}
