//! In-memory renderer and page fixtures for tests.

use std::collections::HashMap;
use std::time::Duration;

use super::page::RenderedPage;
use super::traits::PageRenderer;
use crate::error::{CrawlError, Result};
use crate::models::{DetailRecord, ListingKey};

/// Serves canned HTML by URL. Unknown URLs render as empty pages.
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: HashMap<String, String>,
    current: Option<String>,
    pub navigations: Vec<String>,
    pub resets: usize,
    fail_resets: bool,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// Every session reset fails, as when the browser cannot be relaunched.
    pub fn with_failing_resets(mut self) -> Self {
        self.fail_resets = true;
        self
    }

    fn current_html(&self) -> Option<&String> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

impl PageRenderer for ScriptedRenderer {
    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
        self.current = Some(url.to_string());
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let ready = self
            .current_html()
            .map(|html| !RenderedPage::parse(html).find_all(selector).is_empty())
            .unwrap_or(false);
        if ready {
            Ok(())
        } else {
            Err(CrawlError::PageLoad {
                url: self.current.clone().unwrap_or_default(),
                timeout,
            })
        }
    }

    fn content(&mut self) -> Result<String> {
        self.current_html()
            .cloned()
            .ok_or_else(|| CrawlError::Renderer("no page loaded".to_string()))
    }

    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        self.current = None;
        if self.fail_resets {
            return Err(CrawlError::Renderer("browser relaunch failed".to_string()));
        }
        Ok(())
    }
}

pub const SPEC_WIDGET: &str = r#"
    <div id="specificationWidget">
      <ul id="sl-card-body">
        <li class="list-item"><span id="spec-key-0">Kilometres</span><span id="spec-value-0">64,500 km</span></li>
        <li class="list-item"><span id="spec-key-1">Status</span><span id="spec-value-1">Used</span></li>
        <li class="list-item"><span id="spec-key-2">Body Type</span><span id="spec-value-2">Coupe</span></li>
        <li class="list-item"><span id="spec-key-3">Cylinder</span><span id="spec-value-3">4</span></li>
        <li class="list-item"><span id="spec-key-4">Transmission</span><span id="spec-value-4">Automatic</span></li>
        <li class="list-item"><span id="spec-key-5">Exterior Colour</span><span id="spec-value-5">Black</span></li>
        <li class="list-item"><span id="spec-key-6">Doors</span><span id="spec-value-6">2 doors</span></li>
        <li class="list-item"><span id="spec-key-7">Warranty</span><span id="spec-value-7">None</span></li>
      </ul>
    </div>
"#;

/// A detail page with an optional metadata script and a specification widget.
pub fn detail_page(script: Option<&str>, widget: &str) -> String {
    let script = script
        .map(|s| format!("<script>window.ngVdpModel = {s};</script>"))
        .unwrap_or_default();
    format!(
        "<html><head><script>var analytics = {{}};</script>{script}</head><body>{widget}</body></html>"
    )
}

/// One catalog card.
pub fn card(price: &str, title: &str, href: &str) -> String {
    format!(
        r#"<div id="result-item-inner-div">
             <span class="price-amount">{price}</span>
             <div class="h2-title"><span class="result-title"><span class="title-with-trim">{title}</span></span></div>
             <a class="inner-link" href="{href}">details</a>
           </div>"#
    )
}

/// A catalog page holding `cards`, with or without a next-page control.
pub fn catalog_page(cards: &[String], has_next: bool) -> String {
    let next = if has_next {
        r##"<a class="last-page-link" href="#">Next</a>"##
    } else {
        ""
    };
    format!("<html><body>{}{next}</body></html>", cards.join("\n"))
}

/// A detail record with only its key and price set.
pub fn detail_record(key: &ListingKey, price: Option<i64>) -> DetailRecord {
    DetailRecord {
        url: key.clone(),
        original_price: price,
        lowest_price: price,
        make: None,
        model: None,
        year: None,
        vin: None,
        dealer_name: None,
        kilometres: None,
        status: None,
        trim: None,
        body_type: None,
        engine: None,
        cylinder: None,
        transmission: None,
        drivetrain: None,
        stock_number: None,
        exterior_colour: None,
        interior_colour: None,
        passengers: None,
        doors: None,
        fuel_type: None,
        city_fuel_economy: None,
        highway_fuel_economy: None,
    }
}
