//! Detail page extraction: embedded basic-info JSON plus the rendered
//! specification list.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::fields::DetailTemplate;
use super::page::{find_within, read_text, RenderedPage};
use super::traits::PageRenderer;
use crate::error::{CrawlError, Result};
use crate::models::{ListingKey, RawRecord};

pub struct DetailExtractor {
    template: DetailTemplate,
    timeout: Duration,
}

impl DetailExtractor {
    pub fn new(template: DetailTemplate, timeout: Duration) -> Self {
        Self { template, timeout }
    }

    /// Visit the detail page for `key` and read its raw fields.
    ///
    /// Fails with `CrawlError::PageLoad` only when the specification
    /// container never appears. A missing or broken metadata blob leaves the
    /// basic-info fields empty and the specification list is still read.
    pub fn extract<R>(&self, renderer: &mut R, key: &ListingKey) -> Result<RawRecord>
    where
        R: PageRenderer + ?Sized,
    {
        renderer.navigate(key.as_str());
        renderer.wait_for_selector(&self.template.ready_selector, self.timeout)?;
        let html = renderer.content()?;
        let page = RenderedPage::parse(&html);

        let mut record = match self.basic_info(&page) {
            Ok(record) => record,
            Err(e) => {
                warn!(url = %key, "Basic info unavailable: {}", e);
                self.empty_basic_info()
            }
        };
        record.merge(self.specifications(&page));
        debug!(url = %key, fields = record.populated(), "Read detail page");
        Ok(record)
    }

    /// Basic-info fields from the embedded metadata script.
    pub fn basic_info(&self, page: &RenderedPage) -> Result<RawRecord> {
        let needle = format!("\"{}\"", self.template.basic_info_key);
        let script = page
            .script_containing(&self.template.script_selector, &needle)
            .ok_or_else(|| CrawlError::Parse(format!("no script contains {needle}")))?;
        let info = embedded_object(&script, &self.template.basic_info_key)?;

        let mut record = RawRecord::new();
        for mapping in &self.template.basic_info {
            let value = info.get(&mapping.json_key).and_then(scalar_to_string);
            record.set(mapping.field.as_str(), value);
        }
        Ok(record)
    }

    fn empty_basic_info(&self) -> RawRecord {
        let mut record = RawRecord::new();
        for mapping in &self.template.basic_info {
            record.set(mapping.field.as_str(), None);
        }
        record
    }

    /// Specification fields, projected onto the template's label set.
    /// Labels the page does not show, or shows without a value, are `None`.
    pub fn specifications(&self, page: &RenderedPage) -> RawRecord {
        let mut found: HashMap<&str, String> = HashMap::new();
        for row in page.find_all(&self.template.spec_row_selector) {
            let Some(label) = find_within(row, &self.template.spec_key_selector) else {
                continue;
            };
            let label = read_text(label).trim().to_string();
            let Some(field) = self.template.spec_field(&label) else {
                debug!(label = %label, "Ignoring unknown specification");
                continue;
            };
            match find_within(row, &self.template.spec_value_selector) {
                Some(value) => {
                    found.insert(field, read_text(value).trim().to_string());
                }
                None => warn!(label = %label, "Specification row has no value"),
            }
        }

        let mut record = RawRecord::new();
        for spec in &self.template.spec_fields {
            let value = found.remove(spec.field.as_str()).filter(|v| !v.is_empty());
            record.set(spec.field.as_str(), value);
        }
        record
    }
}

/// Parse the JSON object stored under `"key":` somewhere inside `script`.
/// Text after the object is ignored.
pub fn embedded_object(script: &str, key: &str) -> Result<Value> {
    let needle = format!("\"{key}\"");
    let start = script
        .find(&needle)
        .ok_or_else(|| CrawlError::Parse(format!("{needle} not found")))?;
    let rest = script[start + needle.len()..]
        .trim_start()
        .strip_prefix(':')
        .ok_or_else(|| CrawlError::Parse(format!("{needle} is not followed by a value")))?;

    let value = serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| CrawlError::Parse(format!("{needle} has no value")))?
        .map_err(|e| CrawlError::Parse(e.to_string()))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(CrawlError::Parse(format!("{needle} is not an object")))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
