use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of `POST /getQuote`. Amounts are decimal or `0x` hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub call_contract_address: String,
    pub call_contract_arguments: String,
    pub value_to_transfer: String,
    pub gas_limit: u64,
    pub bitcoin_refund_address: String,
    pub rsk_refund_address: String,
}

/// A provider quote as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "fedBTCAddr")]
    pub fed_btc_addr: String,
    #[serde(rename = "lbcAddr")]
    pub lbc_addr: String,
    #[serde(rename = "lpRSKAddr")]
    pub lp_rsk_addr: String,
    #[serde(rename = "btcRefundAddr")]
    pub btc_refund_addr: String,
    #[serde(rename = "rskRefundAddr")]
    pub rsk_refund_addr: String,
    #[serde(rename = "lpBTCAddr")]
    pub lp_btc_addr: String,
    pub call_fee: String,
    pub penalty_fee: String,
    #[serde(rename = "contractAddr")]
    pub contract_addr: String,
    pub data: String,
    pub gas_limit: u64,
    pub nonce: u64,
    pub value: String,
    pub agreement_timestamp: u64,
    pub time_for_deposit: u64,
    pub call_time: u64,
    pub confirmations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedQuote {
    pub signature: String,
    pub bitcoin_deposit_address_hash: String,
}

/// Error body sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {} ({})", .body.error, .body.message)]
    Api { status: StatusCode, body: ApiError },

    #[error("server returned {status}: {text}")]
    Unexpected { status: StatusCode, text: String },
}

impl SdkError {
    /// Error category reported by the server, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            SdkError::Api { body, .. } => Some(&body.error),
            _ => None,
        }
    }
}

pub struct LpsClient {
    client: Client,
    base_url: String,
}

impl LpsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Ask every registered provider for a quote.
    pub async fn get_quote(&self, req: &QuoteRequest) -> Result<Vec<Quote>, SdkError> {
        let resp = self
            .client
            .post(format!("{}/getQuote", self.base_url))
            .json(req)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Accept a quote by its hash (hex, with or without `0x`).
    pub async fn accept_quote(&self, quote_hash: &str) -> Result<AcceptedQuote, SdkError> {
        let resp = self
            .client
            .post(format!("{}/acceptQuote", self.base_url))
            .json(&serde_json::json!({ "quoteHash": quote_hash }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// `true` when the server reports its chain node reachable.
    pub async fn health(&self) -> Result<bool, SdkError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }
}

async fn check(resp: Response) -> Result<Response, SdkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await?;
    match serde_json::from_str::<ApiError>(&text) {
        Ok(body) => Err(SdkError::Api { status, body }),
        Err(_) => Err(SdkError::Unexpected { status, text }),
    }
}
