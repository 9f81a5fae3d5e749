use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::Redirect,
    routing::get,
    Router,
};
use cortex::oura::{OuraClient, OuraClientConfig};
use serde::Deserialize;
use tracing::{error, info, warn};
use url::form_urlencoded::byte_serialize;

const CALLBACK_PATH: &str = "/auth/callback";

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

fn error_redirect(reason: &str) -> Redirect {
    let encoded: String = byte_serialize(reason.as_bytes()).collect();
    Redirect::to(&format!("/?error={}", encoded))
}

/// The redirect URI must match the one used to start the flow
fn redirect_uri(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if let Some(uri) = &state.oura.redirect_uri {
        return Some(uri.clone());
    }
    let host = headers.get(header::HOST)?.to_str().ok()?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Some(format!("{}://{}{}", scheme, host, CALLBACK_PATH))
}

async fn exchange(state: &AppState, code: &str, redirect_uri: &str) -> anyhow::Result<()> {
    let (client_id, client_secret) = state.oura.client_credentials().ok_or_else(|| {
        anyhow::anyhow!("OAuth requires CORTEX_OURA__CLIENT_ID and CORTEX_OURA__CLIENT_SECRET")
    })?;

    let client = OuraClient::new(
        OuraClientConfig::application(client_id, client_secret)
            .with_base_url(state.oura.base_url.clone())
            .with_token_url(state.oura.token_url.clone()),
    )?;

    // The token response is dropped here; nothing is persisted
    client.exchange_authorization_code(code, redirect_uri).await?;
    Ok(())
}

async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    if let Some(err) = params.error {
        warn!(error = %err, "OAuth authorization was denied");
        return error_redirect(&err);
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return error_redirect("missing_code");
    };

    let Some(redirect_uri) = redirect_uri(&state, &headers) else {
        error!("cannot derive OAuth redirect URI without a Host header");
        return error_redirect("oauth_failed");
    };

    match exchange(&state, &code, &redirect_uri).await {
        Ok(()) => {
            info!("Oura account connected");
            Redirect::to("/?oura_connected=true")
        }
        Err(e) => {
            error!(error = %e, "Oura OAuth error");
            error_redirect("oauth_failed")
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback))
        .with_state(state)
}
