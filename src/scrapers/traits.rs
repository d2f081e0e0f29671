use std::time::Duration;

use crate::error::Result;

/// A page rendering engine.
///
/// All calls block. Element queries are served from the HTML snapshot
/// returned by [`PageRenderer::content`], see [`super::page::RenderedPage`].
pub trait PageRenderer {
    /// Load `url`. Best effort: failures are logged and surface through the
    /// next [`PageRenderer::wait_for_selector`].
    fn navigate(&mut self, url: &str);

    /// Block until `selector` matches, or fail with `CrawlError::PageLoad`.
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM of the current page.
    fn content(&mut self) -> Result<String>;

    /// Close the session and start a fresh one.
    fn reset(&mut self) -> Result<()>;
}
