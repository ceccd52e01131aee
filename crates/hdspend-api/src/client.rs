//! HTTP client for the wallet data API
//!
//! Serves both collaborators the engine needs from the network:
//! - address usage for account discovery (`multiaddr`)
//! - replay protection parameters for signing (`bch/dust`)
//!
//! Each call is a single request; there are no retries.

use std::time::Duration;

use async_trait::async_trait;
use hdspend_core::{Chain, ChainParams, DerivedAddress, NetworkError, ReplayProtectionParameters};
use hdspend_discovery::AddressUsageSource;
use hdspend_signer::ReplayProtectionSource;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::models::{DustResponse, MultiAddressResponse};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Wallet data API client for one chain
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    params: ChainParams,
}

impl ApiClient {
    pub fn new(base_url: &str, params: ChainParams, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            params,
        })
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Path segment selecting the chain's endpoints
    fn chain_path(&self) -> &'static str {
        match self.params.chain {
            Chain::Bitcoin => "",
            Chain::BitcoinCash => "bch/",
        }
    }

    fn multiaddr_request(&self, addresses: &[String]) -> RequestBuilder {
        let url = format!("{}/{}multiaddr", self.base_url, self.chain_path());
        self.http
            .get(url)
            .query(&[("active", addresses.join("|").as_str()), ("n", "0")])
    }

    fn dust_request(&self) -> RequestBuilder {
        self.http.get(format!("{}/bch/dust", self.base_url))
    }

    /// Send `request` and decode a JSON body
    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, NetworkError> {
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| NetworkError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AddressUsageSource for ApiClient {
    async fn fetch_usage(&self, addresses: &[String]) -> Result<Vec<DerivedAddress>, NetworkError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        log::trace!("multiaddr for {} addresses", addresses.len());
        let response: MultiAddressResponse =
            self.get_json(self.multiaddr_request(addresses)).await?;
        Ok(response.addresses.into_iter().map(DerivedAddress::from).collect())
    }
}

#[async_trait]
impl ReplayProtectionSource for ApiClient {
    async fn fetch_replay_protection(&self) -> Result<ReplayProtectionParameters, NetworkError> {
        let response: DustResponse = self.get_json(self.dust_request()).await?;
        ReplayProtectionParameters::try_from(response)
    }
}
