//! DOM queries over a rendered page snapshot.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::fields::{Attribute, FieldSpec, PostProcess};

/// Parsed snapshot of the renderer's current DOM.
pub struct RenderedPage {
    document: Html,
}

impl RenderedPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Every element matching `css`, in document order. An invalid selector
    /// matches nothing.
    pub fn find_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(e) => {
                debug!("Invalid selector {:?}: {}", css, e);
                Vec::new()
            }
        }
    }

    /// Text of the first script matching `css` whose body contains `needle`.
    pub fn script_containing(&self, css: &str, needle: &str) -> Option<String> {
        self.find_all(css)
            .into_iter()
            .map(read_text)
            .find(|text| text.contains(needle))
    }
}

pub fn read_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn read_attribute(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

/// First descendant of `scope` matching `css`.
pub fn find_within<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Locate `spec` inside `scope` and read it. `None` when the element or the
/// attribute is missing.
pub fn extract_field(scope: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
    let element = find_within(scope, &spec.selector)?;
    let value = match &spec.attribute {
        Attribute::Text => read_text(element),
        Attribute::Named(name) => read_attribute(element, name)?,
    };
    match spec.post {
        Some(PostProcess::Strip) => Some(value.trim().to_string()),
        None => Some(value),
    }
}
