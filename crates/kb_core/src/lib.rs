pub mod config;
pub mod error;
pub mod models;
pub mod source;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use models::InferenceModel;
pub use source::ArticleSource;
pub use storage::{DatasetStore, Row};
pub use types::{
    ArticleRecord, ContentType, DeepDive, Enrichment, Gap, Priority, GAP_FALLBACK,
    TOPICS_FALLBACK, UNKNOWN_MARKER,
};
