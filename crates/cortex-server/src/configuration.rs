use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use cortex::agent::DEFAULT_MAX_STEPS;
use cortex::oura::client::{OURA_API_BASE, OURA_TOKEN_URL};
use cortex::providers::configs::{OpenAiProviderConfig, DEFAULT_MODEL, OPENROUTER_HOST};
use serde::Deserialize;
use std::fmt;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Any OpenAI-compatible chat completions endpoint, OpenRouter by default
#[derive(Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("host", &self.host)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct OuraSettings {
    pub base_url: String,
    pub token_url: String,
    /// Fallback used when a chat request carries no credential of its own
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Registered OAuth redirect; derived from the request host when unset
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

impl OuraSettings {
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for OuraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OuraSettings")
            .field("base_url", &self.base_url)
            .field("token_url", &self.token_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Data-stream protocol frames as they are produced
    Stream,
    /// One `{ "message": ... }` body once the answer is complete
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ChatSettings {
    pub mode: ChatMode,
    pub max_steps: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub oura: OuraSettings,
    pub chat: ChatSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.host", OPENROUTER_HOST)?
            .set_default("provider.model", DEFAULT_MODEL)?
            .set_default("provider.temperature", 0.5_f64)?
            // Oura defaults
            .set_default("oura.base_url", OURA_API_BASE)?
            .set_default("oura.token_url", OURA_TOKEN_URL)?
            // Chat defaults
            .set_default("chat.mode", "stream")?
            .set_default("chat.max_steps", DEFAULT_MAX_STEPS as u64)?
            .set_default("chat.timeout_secs", 30_u64)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("CORTEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        let settings = match result {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .split('`')
                        .next()
                        .unwrap_or_default();
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        if settings.provider.api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }
        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
