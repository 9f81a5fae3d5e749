use thiserror::Error;

#[derive(Error, Debug)]
pub enum OuraError {
    /// Any non-2xx answer from the vendor, whatever the cause
    #[error("Oura API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid date '{0}', expected a calendar date in YYYY-MM-DD format")]
    InvalidDate(String),

    #[error("Invalid webhook subscription id '{0}'")]
    InvalidSubscriptionId(String),

    #[error("Webhook and OAuth operations require a client id and client secret")]
    MissingClientCredentials,

    #[error("Invalid Oura API url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request to the Oura API failed: {0}")]
    Http(#[from] reqwest::Error),
}
