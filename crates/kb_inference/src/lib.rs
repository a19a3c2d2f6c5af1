pub mod models;
pub mod parse;
pub mod prompts;

pub mod prelude {
    pub use super::models::create_model;
    pub use super::models::{ChatBackend, LlmModel};
    pub use kb_core::{ArticleRecord, Enrichment, Error, Gap, DeepDive, InferenceModel, Result};
}

pub use models::create_model;
