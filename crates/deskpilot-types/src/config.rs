//! Provider configuration and model capability detection.
//!
//! Configuration is always an injected value: this crate never reads
//! environment variables or ambient state. Validation runs before any adapter
//! is constructed so a misconfigured session fails with a single, well-formed
//! error event instead of a broken stream.

use serde::{Deserialize, Serialize};

/// The vendor family behind a provider configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vendor {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API.
    Openai,
    /// Google Generative AI.
    Google,
    /// Locally hosted Ollama instance.
    Ollama,
    /// User-defined OpenAI-compatible endpoint.
    Custom,
}

impl Vendor {
    /// Whether this vendor requires an API key. Local services do not.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Vendor::Ollama)
    }

    /// Stable identifier used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Anthropic => "anthropic",
            Vendor::Openai => "openai",
            Vendor::Google => "google",
            Vendor::Ollama => "ollama",
            Vendor::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully specified provider configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Vendor family.
    pub vendor: Vendor,
    /// Model identifier (e.g. "claude-sonnet-4-20250514", "gpt-4o").
    pub model: String,
    /// API credential; required unless the vendor is credential-free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override; required for custom vendors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Use the vendor's first-party computer-use tool protocol.
    #[serde(default)]
    pub native_computer_use: bool,
}

/// Why a provider configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Model is required")]
    MissingModel,

    #[error("Base URL is required for custom providers")]
    MissingBaseUrl,

    #[error("API key is required for {vendor} providers")]
    MissingApiKey { vendor: &'static str },
}

impl ProviderConfig {
    /// Validate the configuration before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.vendor == Vendor::Custom && self.base_url.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.vendor.requires_api_key() && self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::MissingApiKey {
                vendor: self.vendor.as_str(),
            });
        }
        Ok(())
    }
}

/// Whether a model can accept image input, judged from its identifier.
///
/// The list mirrors the vision-capable families in the major provider
/// catalogs; unknown models are assumed text-only.
pub fn supports_vision(model: &str) -> bool {
    const VISION_FAMILIES: &[&str] = &[
        "claude-3",
        "claude-sonnet",
        "claude-opus",
        "claude-haiku",
        "gpt-4o",
        "gpt-4.1",
        "gpt-4-turbo",
        "gpt-5",
        "o1",
        "o3",
        "gemini",
        "llava",
        "pixtral",
        "qwen2-vl",
        "qwen2.5-vl",
    ];
    let model = model.to_ascii_lowercase();
    VISION_FAMILIES.iter().any(|family| model.starts_with(family))
}

/// Whether a model supports generic function/tool calling.
///
/// Models outside these families fall back to the free-text JSON protocol.
pub fn supports_native_tools(model: &str) -> bool {
    const TOOL_FAMILIES: &[&str] = &[
        "claude",
        "gpt-4",
        "gpt-5",
        "gpt-3.5-turbo",
        "o1",
        "o3",
        "gemini",
        "mistral-large",
        "mistral-small",
        "qwen",
        "llama3.1",
        "llama-3.1",
    ];
    let model = model.to_ascii_lowercase();
    TOOL_FAMILIES.iter().any(|family| model.starts_with(family))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vendor: Vendor) -> ProviderConfig {
        ProviderConfig {
            vendor,
            model: "gpt-4o".into(),
            api_key: Some("sk-test".into()),
            base_url: None,
            native_computer_use: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config(Vendor::Openai).validate().is_ok());
    }

    #[test]
    fn model_is_required() {
        let mut cfg = config(Vendor::Openai);
        cfg.model = "  ".into();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingModel));
    }

    #[test]
    fn custom_requires_base_url_with_exact_message() {
        let mut cfg = config(Vendor::Custom);
        cfg.base_url = None;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "Base URL is required for custom providers");

        cfg.base_url = Some("http://localhost:8000/v1".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_key_required_except_for_local() {
        let mut cfg = config(Vendor::Anthropic);
        cfg.api_key = None;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingApiKey { vendor: "anthropic" })
        ));

        let mut cfg = config(Vendor::Ollama);
        cfg.api_key = None;
        cfg.model = "llama3.2".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn vision_detection() {
        assert!(supports_vision("gpt-4o"));
        assert!(supports_vision("claude-sonnet-4-20250514"));
        assert!(supports_vision("gemini-2.0-flash"));
        assert!(!supports_vision("llama3.2"));
    }

    #[test]
    fn tool_support_detection() {
        assert!(supports_native_tools("claude-sonnet-4-20250514"));
        assert!(supports_native_tools("gpt-4o"));
        assert!(!supports_native_tools("llama3.2"));
        assert!(!supports_native_tools("tinyllama"));
    }
}
