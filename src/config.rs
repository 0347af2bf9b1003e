//! Configuration for the analysis pipeline and its default services.
//!
//! Every knob lives in [`AnalyzerConfig`], built via [`AnalyzerConfigBuilder`].
//! Callers set only what they care about and rely on the documented defaults
//! for the rest.

use crate::error::AnalysisError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Largest resume accepted by the validation gate: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Prefix of every record key in the key/value store.
pub const DEFAULT_KEY_PREFIX: &str = "resume:";

/// Configuration for a resume analysis run.
///
/// # Example
/// ```rust
/// use resumind::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .model("gpt-4.1-mini")
///     .scoring_max_pages(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.key_prefix, "resume:");
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Upper bound on the uploaded PDF size in bytes. Default: 5 MiB.
    pub max_file_size: u64,

    /// Key prefix for persisted records. Default: `resume:`.
    pub key_prefix: String,

    /// Longest edge of the rendered preview image in pixels. Default: 2000.
    ///
    /// Also caps the page images sent to the scoring model.
    pub preview_max_pixels: u32,

    /// How many leading pages are attached to the scoring request. Default: 2.
    ///
    /// Resumes rarely run past two pages; every extra page costs image tokens.
    pub scoring_max_pages: usize,

    /// LLM model identifier. If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the scoring call. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the feedback. Default: 4096.
    pub max_tokens: usize,

    /// Deadline for the scoring call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// User password for encrypted PDFs.
    pub pdf_password: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            preview_max_pixels: 2000,
            scoring_max_pages: 2,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            api_timeout_secs: 120,
            pdf_password: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("max_file_size", &self.max_file_size)
            .field("key_prefix", &self.key_prefix)
            .field("preview_max_pixels", &self.preview_max_pixels)
            .field("scoring_max_pages", &self.scoring_max_pages)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Key under which the record with `id` is stored.
    pub fn record_key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    pub fn preview_max_pixels(mut self, px: u32) -> Self {
        self.config.preview_max_pixels = px.max(100);
        self
    }

    pub fn scoring_max_pages(mut self, n: usize) -> Self {
        self.config.scoring_max_pages = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalysisError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "Maximum file size must be > 0".into(),
            ));
        }
        if c.key_prefix.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "Record key prefix must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_limits() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.record_key("abc"), "resume:abc");
    }

    #[test]
    fn builder_clamps_and_validates() {
        let config = AnalyzerConfig::builder()
            .temperature(9.0)
            .scoring_max_pages(0)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.scoring_max_pages, 1);

        let err = AnalyzerConfig::builder().key_prefix("").build().unwrap_err();
        assert!(err.to_string().contains("prefix"));
    }
}
