pub mod scrapers;

pub use scrapers::help_center::HelpCenterScraper;

pub mod prelude {
    pub use super::scrapers::help_center::HelpCenterScraper;
    pub use kb_core::{ArticleRecord, ArticleSource, Error, Result};
}
