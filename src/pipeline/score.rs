//! The scoring service backed by a vision LLM.
//!
//! The resume is read back from blob storage by path, its leading pages are
//! rasterised and attached as images, and the instructions go in the same
//! user turn. Prompt wording lives in [`crate::prompts`].
//!
//! There is no retry loop here: a failed or timed-out call fails the
//! pipeline step and the user resubmits.

use crate::config::AnalyzerConfig;
use crate::error::ServiceError;
use crate::pipeline::{encode, render};
use crate::prompts::SCORING_SYSTEM_PROMPT;
use crate::services::{BlobStore, Scorer, ScoringResponse};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Default model when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// [`Scorer`] that asks a vision LLM to grade the stored resume.
pub struct LlmScorer {
    provider: Arc<dyn LLMProvider>,
    blobs: Arc<dyn BlobStore>,
    config: AnalyzerConfig,
}

impl LlmScorer {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        blobs: Arc<dyn BlobStore>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            provider,
            blobs,
            config,
        }
    }

    /// Build a scorer, resolving the provider from `config` and the environment.
    pub fn from_config(
        blobs: Arc<dyn BlobStore>,
        config: &AnalyzerConfig,
    ) -> Result<Self, ServiceError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, blobs, config.clone()))
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn feedback(
        &self,
        resume_path: &str,
        instructions: &str,
    ) -> Result<Option<ScoringResponse>, ServiceError> {
        let start = Instant::now();

        let Some(pdf) = self.blobs.read(resume_path).await? else {
            warn!("Resume '{}' not found in storage", resume_path);
            return Ok(None);
        };

        let pages = render::render_pages_png(
            pdf,
            self.config.preview_max_pixels,
            self.config.pdf_password.clone(),
            self.config.scoring_max_pages,
        )
        .await?;
        let images = pages.iter().map(|png| encode::encode_page(png)).collect();

        let messages = vec![
            ChatMessage::system(SCORING_SYSTEM_PROMPT),
            ChatMessage::user_with_images(instructions, images),
        ];
        let options = build_options(&self.config);

        let secs = self.config.api_timeout_secs;
        let response = timeout(
            Duration::from_secs(secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| ServiceError::Timeout { secs })?
        .map_err(|e| ServiceError::Llm(e.to_string()))?;

        debug!(
            "Scored '{}': {} input tokens, {} output tokens, {:?}",
            resume_path,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            warn!("Scoring model returned an empty answer");
            return Ok(None);
        }
        Ok(Some(ScoringResponse::text(response.content)))
    }
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ServiceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ServiceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. pre-built provider (`config.provider`)
/// 2. named provider + model (`config.provider_name`, `config.model`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. full auto-detection via [`ProviderFactory::from_env`]
pub fn resolve_provider(config: &AnalyzerConfig) -> Result<Arc<dyn LLMProvider>, ServiceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ServiceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    info!("Using auto-detected LLM provider");
    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = AnalyzerConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
