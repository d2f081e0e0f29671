//! Crawl configuration, loaded from an optional TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::dedup::PricePolicy;
use crate::error::{CrawlError, Result};
use crate::scrapers::fields::{CatalogTemplate, DetailTemplate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Site name used in output file names.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// First catalog page; its offset parameter is rewritten per page.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Query parameter carrying the result offset.
    #[serde(default = "default_offset_param")]
    pub offset_param: String,

    /// Listings per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub start_offset: u32,

    /// Stop after this many catalog pages.
    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Bound on every wait-for-element, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Restart the browser session before each catalog page.
    #[serde(default = "default_true")]
    pub recycle_session: bool,

    #[serde(default)]
    pub price_policy: PricePolicy,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory for the CSV snapshot logs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub catalog: CatalogTemplate,

    #[serde(default)]
    pub detail: DetailTemplate,
}

fn default_site_name() -> String {
    "autotrader".to_string()
}

fn default_start_url() -> String {
    "https://www.autotrader.ca/cars/bc/?rcp=100&rcs=0&srt=9&prx=-2&prv=British%20Columbia&loc=BC&hprc=True&wcp=True&hhd=True&sts=Used-Damaged&inMarket=advancedSearch".to_string()
}

fn default_offset_param() -> String {
    "rcs".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/listings.sqlite")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scraped_data")
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            start_url: default_start_url(),
            offset_param: default_offset_param(),
            page_size: default_page_size(),
            start_offset: 0,
            max_pages: None,
            timeout_secs: default_timeout(),
            recycle_session: true,
            price_policy: PricePolicy::default(),
            headless: true,
            db_path: default_db_path(),
            output_dir: default_output_dir(),
            catalog: CatalogTemplate::default(),
            detail: DetailTemplate::default(),
        }
    }
}

impl CrawlConfig {
    /// Read `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| CrawlError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.page_size == 0 {
            return Err(CrawlError::Config("page_size must be positive".to_string()));
        }
        if self.max_pages == Some(0) {
            return Err(CrawlError::Config("max_pages must be positive".to_string()));
        }
        self.catalog.validate()?;
        self.detail.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The start URL, also the base for relative listing links.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.start_url)
            .map_err(|e| CrawlError::Config(format!("invalid start_url {:?}: {}", self.start_url, e)))
    }

    /// URL of the catalog page `index` pages past the start offset.
    pub fn page_url(&self, index: usize) -> Result<String> {
        let offset = u64::from(self.start_offset) + index as u64 * u64::from(self.page_size);
        let mut url = self.base_url()?;

        let mut replaced = false;
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if k == self.offset_param.as_str() {
                    replaced = true;
                    (k.into_owned(), offset.to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query.clear().extend_pairs(&pairs);
            if !replaced {
                query.append_pair(&self.offset_param, &offset.to_string());
            }
        }
        Ok(url.to_string())
    }
}
