//! Catalog crawl: pagination, snapshot extraction and per-listing reconcile.

use tracing::{debug, info, warn};

use super::detail::DetailExtractor;
use super::page::RenderedPage;
use super::snapshot::SnapshotExtractor;
use super::traits::PageRenderer;
use crate::config::CrawlConfig;
use crate::dedup::{DedupCoordinator, Decision};
use crate::error::{CrawlError, Result};
use crate::models::{ListingKey, SnapshotRecord};
use crate::normalize::Normalizer;
use crate::store::{ListingStore, Sink};

/// Controller states. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlState {
    PageLoad,
    Extracting,
    PerListingReconcile(Vec<SnapshotRecord>),
    Paginate,
    Done,
    Aborted,
}

/// How a crawl ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outcome {
    /// Pagination exhausted or page budget reached.
    #[default]
    Done,
    /// A catalog page never became ready.
    Aborted { url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages: usize,
    pub snapshots: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub outcome: Outcome,
}

/// Drives one sequential crawl session over the catalog.
pub struct CrawlController<R, S> {
    config: CrawlConfig,
    renderer: R,
    sink: Sink<S>,
    snapshots: SnapshotExtractor,
    details: DetailExtractor,
    normalizer: Normalizer,
    dedup: DedupCoordinator,
    page_index: usize,
    /// Catalog page being worked on; restored after detail-page detours.
    current_url: Option<String>,
}

impl<R: PageRenderer, S: ListingStore> CrawlController<R, S> {
    pub fn new(config: &CrawlConfig, renderer: R, sink: Sink<S>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            snapshots: SnapshotExtractor::new(config.catalog.clone()),
            details: DetailExtractor::new(config.detail.clone(), config.timeout()),
            normalizer: Normalizer::new(config.base_url()?),
            dedup: DedupCoordinator::new(config.price_policy),
            config: config.clone(),
            renderer,
            sink,
            page_index: 0,
            current_url: None,
        })
    }

    /// Run until pagination ends, the page budget is spent, or a catalog
    /// page fails to load. Only store and log failures are returned as errors.
    pub fn run(&mut self) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        let mut state = CrawlState::PageLoad;

        loop {
            state = match state {
                CrawlState::PageLoad => self.load_page(&mut report)?,
                CrawlState::Extracting => self.extract(&mut report)?,
                CrawlState::PerListingReconcile(records) => {
                    self.reconcile(&records, &mut report)?;
                    report.pages += 1;
                    if self.config.max_pages.is_some_and(|max| report.pages >= max) {
                        info!("Page budget of {} reached", report.pages);
                        CrawlState::Done
                    } else {
                        CrawlState::Paginate
                    }
                }
                CrawlState::Paginate => self.paginate(),
                CrawlState::Done | CrawlState::Aborted => break,
            };
        }

        info!(
            pages = report.pages,
            snapshots = report.snapshots,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Crawl finished: {:?}",
            report.outcome
        );
        Ok(report)
    }

    /// Flush output and hand back the store.
    pub fn finish(self) -> Result<S> {
        self.sink.finish()
    }

    fn load_page(&mut self, report: &mut CrawlReport) -> Result<CrawlState> {
        let url = self.config.page_url(self.page_index)?;
        self.current_url = Some(url.clone());

        if self.config.recycle_session && self.page_index > 0 {
            debug!("Recycling renderer session");
            if let Err(e) = self.renderer.reset() {
                return Ok(abort(report, url, &e));
            }
        }

        info!("Loading catalog page {}: {}", self.page_index + 1, url);
        self.renderer.navigate(&url);
        match self
            .renderer
            .wait_for_selector(self.snapshots.card_selector(), self.config.timeout())
        {
            Ok(()) => Ok(CrawlState::Extracting),
            Err(e) => Ok(abort(report, url, &e)),
        }
    }

    fn extract(&mut self, report: &mut CrawlReport) -> Result<CrawlState> {
        let html = match self.renderer.content() {
            Ok(html) => html,
            Err(e) => {
                let url = self.current_url.clone().unwrap_or_default();
                return Ok(abort(report, url, &e));
            }
        };

        let records: Vec<SnapshotRecord> = {
            let page = RenderedPage::parse(&html);
            self.snapshots
                .extract_page(&page)
                .iter()
                .map(|raw| self.normalizer.snapshot(raw))
                .collect()
        };
        info!("Extracted {} listings", records.len());

        self.sink.write_snapshots(&records)?;
        report.snapshots += records.len();
        Ok(CrawlState::PerListingReconcile(records))
    }

    fn reconcile(&mut self, records: &[SnapshotRecord], report: &mut CrawlReport) -> Result<()> {
        for record in records {
            let Some(key) = record.listing_url.as_ref() else {
                warn!(title = ?record.title, "Listing has no usable URL, skipping");
                report.skipped += 1;
                continue;
            };
            self.reconcile_one(key, record.price, report)?;
        }
        Ok(())
    }

    fn reconcile_one(
        &mut self,
        key: &ListingKey,
        price: Option<i64>,
        report: &mut CrawlReport,
    ) -> Result<()> {
        match self.dedup.decide(self.sink.store(), key, price)? {
            Decision::Create => match self.details.extract(&mut self.renderer, key) {
                Ok(raw) => {
                    let detail = self.normalizer.detail(key.clone(), &raw);
                    self.sink.insert_detail(&detail)?;
                    debug!(url = %key, ad = ?key.ad_token(), "Stored new listing");
                    report.created += 1;
                }
                Err(e) => {
                    warn!(url = %key, "Skipping listing: {}", e);
                    report.skipped += 1;
                }
            },
            Decision::UpdatePrice(price) => {
                self.sink.update_price(key, price)?;
                debug!(url = %key, price, "Updated tracked price");
                report.updated += 1;
            }
            Decision::Keep => {
                debug!(url = %key, "Known listing without price");
                report.unchanged += 1;
            }
        }
        Ok(())
    }

    fn paginate(&mut self) -> CrawlState {
        let Some(url) = self.current_url.clone() else {
            return CrawlState::Done;
        };
        self.renderer.navigate(&url);
        match self
            .renderer
            .wait_for_selector(self.snapshots.next_page_selector(), self.config.timeout())
        {
            Ok(()) => {
                self.page_index += 1;
                CrawlState::PageLoad
            }
            Err(_) => {
                info!("No next page after {}", url);
                CrawlState::Done
            }
        }
    }
}

fn abort(report: &mut CrawlReport, url: String, error: &CrawlError) -> CrawlState {
    warn!(url = %url, "Catalog page failed, stopping crawl: {}", error);
    report.outcome = Outcome::Aborted { url };
    CrawlState::Aborted
}
