pub mod browser;
pub mod crawler;
pub mod detail;
pub mod fields;
pub mod page;
pub mod snapshot;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use browser::ChromeRenderer;
pub use crawler::{CrawlController, CrawlReport, Outcome};
