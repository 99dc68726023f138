//! Chain clients — one reader type per network family.
//!
//! EVM chains use an Alloy HTTP provider; contract reads go through
//! compile-time `sol!` bindings in the protocol modules. The base58 family
//! uses a thin JSON-RPC client, enough for native and token balance reads.

use alloy::providers::RootProvider;
use serde::Serialize;
use url::Url;

use crate::error::{VantageError, VantageResult};
use crate::types::NetworkFamily;

/// Concrete EVM provider type: Alloy HTTP provider over Ethereum network.
pub type EvmProvider = RootProvider;

/// A reader bound to one RPC endpoint of one chain.
#[derive(Clone)]
pub enum ChainClient {
    Evm(EvmProvider),
    Svm(SvmClient),
}

impl ChainClient {
    /// Construct a fresh client for the given family and endpoint.
    pub fn connect(family: NetworkFamily, rpc_url: &str) -> VantageResult<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| VantageError::Config(format!("invalid RPC URL {rpc_url}: {e}")))?;
        match family {
            NetworkFamily::Evm => Ok(ChainClient::Evm(RootProvider::new_http(url))),
            NetworkFamily::Svm => Ok(ChainClient::Svm(SvmClient::new(url))),
        }
    }

    /// The EVM provider, or an error when this is not an EVM client.
    pub fn evm(&self) -> VantageResult<&EvmProvider> {
        match self {
            ChainClient::Evm(provider) => Ok(provider),
            ChainClient::Svm(_) => Err(VantageError::Other(
                "expected an EVM client for this chain".into(),
            )),
        }
    }

    /// The Solana-family client, or an error when this is not one.
    pub fn svm(&self) -> VantageResult<&SvmClient> {
        match self {
            ChainClient::Svm(client) => Ok(client),
            ChainClient::Evm(_) => Err(VantageError::Other(
                "expected a base58-family client for this chain".into(),
            )),
        }
    }
}

// ── Solana-family JSON-RPC client ───────────────────────────────────

#[derive(Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
    id: u64,
}

/// Minimal JSON-RPC reader for the base58 network family.
#[derive(Clone)]
pub struct SvmClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SvmClient {
    pub fn new(endpoint: Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");
        Self { http, endpoint }
    }

    async fn rpc_call<P: Serialize>(
        &self,
        method: &str,
        params: P,
    ) -> VantageResult<serde_json::Value> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| VantageError::Network(format!("{method} request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| VantageError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(VantageError::Network(format!("{method}: HTTP {status}: {text}")));
        }

        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| VantageError::Decode(format!("{method} response: {e}")))?;
        if let Some(err) = parsed.get("error") {
            return Err(VantageError::Network(format!("{method}: {err}")));
        }

        Ok(parsed)
    }

    /// Native balance in lamports.
    pub async fn get_balance(&self, account: &str) -> VantageResult<u64> {
        let resp = self.rpc_call("getBalance", serde_json::json!([account])).await?;
        resp.pointer("/result/value")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| VantageError::Decode("getBalance: missing result.value".into()))
    }

    /// Total balance of a token mint across the owner's token accounts,
    /// in base units, together with the mint decimals.
    pub async fn get_token_balance(
        &self,
        owner: &str,
        mint: &str,
    ) -> VantageResult<(u128, u8)> {
        let params = serde_json::json!([
            owner,
            { "mint": mint },
            { "encoding": "jsonParsed" }
        ]);
        let resp = self.rpc_call("getTokenAccountsByOwner", params).await?;

        let empty = vec![];
        let accounts = resp
            .pointer("/result/value")
            .and_then(|v| v.as_array())
            .unwrap_or(&empty);

        let mut total: u128 = 0;
        let mut decimals: u8 = 0;
        for account in accounts {
            let amount = account
                .pointer("/account/data/parsed/info/tokenAmount");
            let Some(amount) = amount else { continue };
            if let Some(raw) = amount.get("amount").and_then(|v| v.as_str()) {
                total = total.saturating_add(raw.parse::<u128>().unwrap_or(0));
            }
            if let Some(d) = amount.get("decimals").and_then(|v| v.as_u64()) {
                decimals = d as u8;
            }
        }

        Ok((total, decimals))
    }
}
