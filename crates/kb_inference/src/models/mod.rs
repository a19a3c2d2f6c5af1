use async_trait::async_trait;
use kb_core::{ArticleRecord, Config, DeepDive, Enrichment, Error, Gap, InferenceModel, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use crate::{parse, prompts};

pub mod dummy;
pub mod gemini;
pub mod openai;

pub use dummy::DummyModel;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// A remote chat endpoint that answers one prompt with one JSON document.
#[async_trait]
pub trait ChatBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn complete_json(&self, prompt: &str) -> Result<String>;
}

/// Drives any [`ChatBackend`] through the enrichment and gap prompts.
#[derive(Debug)]
pub struct LlmModel<B> {
    backend: B,
}

impl<B: ChatBackend> LlmModel<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: ChatBackend> InferenceModel for LlmModel<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn enrich_batch(&self, batch: &[ArticleRecord]) -> Result<HashMap<String, Enrichment>> {
        debug!("Enriching {} article(s) with {}", batch.len(), self.name());
        let reply = self.backend.complete_json(&prompts::enrichment(batch)).await?;
        parse::enrichment_map(&reply)
    }

    async fn global_gaps(&self, catalog: &[ArticleRecord], count: usize) -> Result<Vec<Gap>> {
        let reply = self.backend.complete_json(&prompts::global_gaps(catalog, count)).await?;
        parse::global_gaps(&reply)
    }

    async fn deep_dive(&self, gaps: &[Gap], n: usize) -> Result<Vec<DeepDive>> {
        let reply = self.backend.complete_json(&prompts::deep_dive(gaps, n)).await?;
        parse::deep_dive(&reply)
    }
}

fn require_api_key(config: &Config, backend: &str) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| Error::Inference(format!("{} API key is required", backend)))
}

pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    match config.model.to_lowercase().as_str() {
        "gemini" => {
            let backend = GeminiBackend::new(
                require_api_key(config, "Gemini")?,
                config.model_name.clone(),
                config.model_url.clone(),
            );
            Ok(Arc::new(LlmModel::new(backend)))
        }
        "openai" | "deepseek" => {
            let backend = OpenAiBackend::new(
                require_api_key(config, "OpenAI-compatible")?,
                config.model_name.clone(),
                config.model_url.clone(),
            );
            Ok(Arc::new(LlmModel::new(backend)))
        }
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!(
            "Unknown model: {} (available: gemini, openai, dummy)",
            other
        ))),
    }
}
