use cortex::providers::configs::OpenAiProviderConfig;

use crate::configuration::{ChatSettings, OuraSettings};

/// Shared application state. Read-only; every request builds its own agent.
#[derive(Clone)]
pub struct AppState {
    pub provider_config: OpenAiProviderConfig,
    pub oura: OuraSettings,
    pub chat: ChatSettings,
}
