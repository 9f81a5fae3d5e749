pub mod ask;
pub mod chat;
pub mod version;
pub mod webhook;

use anyhow::{Context, Result};
use cortex::agent::Agent;
use cortex::oura::{AccessToken, OuraClient, OuraClientConfig};
use cortex::providers::configs::OpenAiProviderConfig;
use cortex::providers::openai::OpenAiProvider;
use cortex::systems::OuraSystem;

use crate::{ModelArgs, OuraArgs};

/// Agent wired to the read-only Oura catalog
pub fn build_agent(oura: &OuraArgs, model: &ModelArgs) -> Result<Agent> {
    let token = AccessToken::non_blank(oura.access_token.as_deref())
        .context("An Oura access token is required (--access-token or OURA_ACCESS_TOKEN)")?;
    let api_key = model
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("A model API key is required (--api-key or OPENAI_API_KEY)")?;

    let mut config = OpenAiProviderConfig::new(api_key);
    config.host = model.host.clone();
    config.model = model.model.clone();

    let client = OuraClient::new(OuraClientConfig::new(token).with_base_url(&oura.base_url))?;
    let mut agent =
        Agent::new(Box::new(OpenAiProvider::new(config)?)).with_max_steps(model.max_steps);
    agent.add_system(Box::new(OuraSystem::new(client)));
    Ok(agent)
}
