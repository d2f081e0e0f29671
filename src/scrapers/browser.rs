use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use super::traits::PageRenderer;
use crate::error::{CrawlError, Result};

/// Keeps Chrome alive across long detail-page waits.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

struct Session {
    // Dropping the browser closes Chrome; the tab alone does not keep it alive.
    _browser: Browser,
    tab: Arc<Tab>,
}

/// Page renderer backed by headless Chrome.
pub struct ChromeRenderer {
    headless: bool,
    session: Option<Session>,
}

impl ChromeRenderer {
    /// Launch Chrome and open a tab.
    pub fn launch(headless: bool) -> Result<Self> {
        let session = Self::start(headless)?;
        Ok(Self {
            headless,
            session: Some(session),
        })
    }

    fn start(headless: bool) -> Result<Session> {
        info!("Launching Chrome (headless={})...", headless);

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| CrawlError::Renderer(format!("Failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| CrawlError::Renderer(format!("Failed to launch Chrome browser: {e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| CrawlError::Renderer(format!("Failed to open tab: {e:#}")))?;

        Ok(Session {
            _browser: browser,
            tab,
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.session
            .as_ref()
            .map(|s| &s.tab)
            .ok_or_else(|| CrawlError::Renderer("no browser session".to_string()))
    }
}

impl PageRenderer for ChromeRenderer {
    fn navigate(&mut self, url: &str) {
        debug!("Navigating to {}", url);
        let tab = match self.tab() {
            Ok(tab) => tab,
            Err(e) => {
                warn!(url, "Cannot navigate: {}", e);
                return;
            }
        };
        if let Err(e) = tab.navigate_to(url).and_then(|t| t.wait_until_navigated()) {
            warn!(url, "Navigation error: {:#}", e);
        }
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = self.tab()?;
        match tab.wait_for_element_with_custom_timeout(selector, timeout) {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(selector, "Wait failed: {:#}", e);
                Err(CrawlError::PageLoad {
                    url: tab.get_url(),
                    timeout,
                })
            }
        }
    }

    fn content(&mut self) -> Result<String> {
        self.tab()?
            .get_content()
            .map_err(|e| CrawlError::Renderer(format!("Failed to read page HTML: {e:#}")))
    }

    fn reset(&mut self) -> Result<()> {
        // Close the old Chrome before starting a new one.
        self.session = None;
        self.session = Some(Self::start(self.headless)?);
        Ok(())
    }
}
