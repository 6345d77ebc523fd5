// Path: crates/chain/src/bridge.rs
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};

use revid_api::chain::CommitmentChainClient;
use revid_types::app::{
    CommitmentEvent, CommitmentState, DeviceId, Operation, OperationKind, RootBytes, TxReceipt,
};
use revid_types::codec::{decode_hex_fixed, decode_hex_loose};
use revid_types::error::ChainClientError;

const HTTP_RETRIES: usize = 6;
const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 3_000;

/// Exponential backoff with jitter, so a fleet of gateways recovering from
/// a bridge outage does not stampede it.
fn retry_delay(attempt: usize) -> Duration {
    let base = BASE_BACKOFF_MS
        .saturating_mul(1u64 << attempt.min(10))
        .min(MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..BASE_BACKOFF_MS);
    Duration::from_millis(base + jitter)
}

fn kind_label(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Update => "update",
        OperationKind::Register => "register",
        OperationKind::Revoke => "revoke",
        OperationKind::BatchRegister => "batch_register",
        OperationKind::BatchRevoke => "batch_revoke",
    }
}

fn kind_from_label(label: &str) -> Result<OperationKind, ChainClientError> {
    match label {
        "update" => Ok(OperationKind::Update),
        "register" => Ok(OperationKind::Register),
        "revoke" => Ok(OperationKind::Revoke),
        "batch_register" => Ok(OperationKind::BatchRegister),
        "batch_revoke" => Ok(OperationKind::BatchRevoke),
        other => Err(ChainClientError::Decode(format!(
            "unknown operation kind '{other}'"
        ))),
    }
}

/// JSON client for the bridge service fronting the deployed contract and
/// the multi-sig wallet.
///
/// The bridge wraps each operation in the threshold-signature envelope and
/// waits for inclusion before answering, so a successful response here *is*
/// the confirmation. Event reads only cover blocks the bridge reports as
/// sufficiently confirmed.
#[derive(Clone)]
pub struct HttpBridgeClient {
    base: String,
    client: Client,
}

impl HttpBridgeClient {
    /// Builds a client for the bridge at `base`, with a per-RPC deadline.
    pub fn new(base: String, rpc_timeout: Duration) -> Result<Self, ChainClientError> {
        let client = Client::builder()
            .timeout(rpc_timeout)
            .build()
            .map_err(|e| ChainClientError::Rpc(e.to_string()))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET with the shared retry loop: transient transport errors, 429 and
    /// 5xx are retried with backoff; other failures are final.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ChainClientError> {
        let url = format!("{}{}", self.base, path);
        let mut attempt = 0;
        loop {
            let resp = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < HTTP_RETRIES {
                        tracing::debug!(
                            target: "chain-client",
                            "GET {url} failed (attempt {attempt}): {e} — retrying"
                        );
                        sleep(retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(classify_transport(e));
                }
            };
            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < HTTP_RETRIES {
                    sleep(retry_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                let body = resp.text().await.unwrap_or_default();
                return Err(ChainClientError::Rpc(format!(
                    "HTTP {} from {url} after {HTTP_RETRIES} retries: {body}",
                    status.as_u16()
                )));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ChainClientError::Rpc(format!(
                    "HTTP {} from {url}: {body}",
                    status.as_u16()
                )));
            }
            return resp
                .json::<T>()
                .await
                .map_err(|e| ChainClientError::Decode(e.to_string()));
        }
    }
}

fn classify_transport(e: reqwest::Error) -> ChainClientError {
    if e.is_timeout() {
        ChainClientError::Timeout(e.to_string())
    } else {
        ChainClientError::Rpc(e.to_string())
    }
}

#[derive(Deserialize)]
struct StateResponse {
    #[serde(rename = "accumulatorHex")]
    accumulator_hex: String,
    #[serde(rename = "hashHex")]
    hash_hex: String,
    version: u64,
    #[serde(rename = "lastUpdateBlock")]
    last_update_block: u64,
}

#[derive(Serialize)]
struct SubmitRequest {
    kind: &'static str,
    #[serde(rename = "operationIdHex")]
    operation_id_hex: String,
    #[serde(rename = "parentHashHex")]
    parent_hash_hex: String,
    #[serde(rename = "newAccumulatorHex")]
    new_accumulator_hex: String,
    #[serde(rename = "deviceIdsHex")]
    device_ids_hex: Vec<String>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(rename = "txHash")]
    tx_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct EventItem {
    kind: String,
    #[serde(rename = "operationIdHex")]
    operation_id_hex: String,
    #[serde(rename = "parentHashHex")]
    parent_hash_hex: String,
    #[serde(rename = "newAccumulatorHex")]
    new_accumulator_hex: String,
    #[serde(rename = "newHashHex")]
    new_hash_hex: String,
    version: u64,
    #[serde(rename = "executorHex")]
    executor_hex: String,
    #[serde(rename = "deviceIdsHex")]
    device_ids_hex: Vec<String>,
    block: u64,
}

#[derive(Deserialize)]
struct EventsResponse {
    events: Vec<EventItem>,
}

#[derive(Deserialize)]
struct HeadResponse {
    #[serde(rename = "confirmedBlock")]
    confirmed_block: u64,
}

impl EventItem {
    fn into_event(self) -> Result<CommitmentEvent, ChainClientError> {
        let decode = |s: &str| -> Result<[u8; 32], ChainClientError> {
            decode_hex_fixed::<32>(s).map_err(|e| ChainClientError::Decode(e.to_string()))
        };
        let root_bytes = decode_hex_loose(&self.new_accumulator_hex)
            .map_err(|e| ChainClientError::Decode(e.to_string()))?;
        let mut device_ids = Vec::with_capacity(self.device_ids_hex.len());
        for id_hex in &self.device_ids_hex {
            device_ids.push(DeviceId(decode(id_hex)?));
        }
        Ok(CommitmentEvent {
            kind: kind_from_label(&self.kind)?,
            operation_id: decode(&self.operation_id_hex)?,
            parent_hash: decode(&self.parent_hash_hex)?,
            new_root: RootBytes::from_slice(&root_bytes)
                .map_err(|e| ChainClientError::Decode(e.to_string()))?,
            new_hash: decode(&self.new_hash_hex)?,
            version: self.version,
            executor: decode_hex_fixed::<20>(&self.executor_hex)
                .map_err(|e| ChainClientError::Decode(e.to_string()))?,
            device_ids,
            block: self.block,
        })
    }
}

#[async_trait]
impl CommitmentChainClient for HttpBridgeClient {
    async fn current_state(&self) -> Result<CommitmentState, ChainClientError> {
        let resp: StateResponse = self.get_json("/v1/commitment/state").await?;
        let root_bytes = decode_hex_loose(&resp.accumulator_hex)
            .map_err(|e| ChainClientError::Decode(e.to_string()))?;
        Ok(CommitmentState {
            root: RootBytes::from_slice(&root_bytes)
                .map_err(|e| ChainClientError::Decode(e.to_string()))?,
            root_hash: decode_hex_fixed::<32>(&resp.hash_hex)
                .map_err(|e| ChainClientError::Decode(e.to_string()))?,
            version: resp.version,
            last_update_block: resp.last_update_block,
        })
    }

    async fn submit(&self, operation: &Operation) -> Result<TxReceipt, ChainClientError> {
        let url = format!("{}/v1/commitment/operations", self.base);
        let body = SubmitRequest {
            kind: kind_label(operation.kind),
            operation_id_hex: hex::encode(operation.operation_id),
            parent_hash_hex: hex::encode(operation.parent_hash),
            new_accumulator_hex: operation.new_root.to_hex(),
            device_ids_hex: operation
                .device_ids
                .iter()
                .map(|id| id.to_string())
                .collect(),
        };

        let mut attempt = 0;
        loop {
            let resp = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt < HTTP_RETRIES {
                        tracing::debug!(
                            target: "chain-client",
                            "submit failed (attempt {attempt}): {e} — retrying"
                        );
                        sleep(retry_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(classify_transport(e));
                }
            };
            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < HTTP_RETRIES {
                    sleep(retry_delay(attempt)).await;
                    attempt += 1;
                    continue;
                }
                let text = resp.text().await.unwrap_or_default();
                return Err(ChainClientError::Rpc(format!(
                    "submit HTTP {} after {HTTP_RETRIES} retries: {text}",
                    status.as_u16()
                )));
            }
            if status.is_client_error() {
                // The bridge relays contract rejections verbatim; they are
                // final and must not be retried here.
                let text = resp.text().await.unwrap_or_default();
                let detail = serde_json::from_str::<ErrorBody>(&text)
                    .map(|b| format!("{}: {}", b.error.code, b.error.message))
                    .unwrap_or(text);
                return Err(ChainClientError::Reverted(detail));
            }
            let parsed: SubmitResponse = resp
                .json()
                .await
                .map_err(|e| ChainClientError::Decode(e.to_string()))?;
            let tx_hash = decode_hex_fixed::<32>(&parsed.tx_hash)
                .map_err(|e| ChainClientError::Decode(e.to_string()))?;
            return Ok(TxReceipt {
                tx_hash,
                block_number: parsed.block_number,
            });
        }
    }

    async fn events_in_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CommitmentEvent>, ChainClientError> {
        let resp: EventsResponse = self
            .get_json(&format!(
                "/v1/commitment/events?from={from_block}&to={to_block}"
            ))
            .await?;
        resp.events.into_iter().map(EventItem::into_event).collect()
    }

    async fn confirmed_head(&self) -> Result<u64, ChainClientError> {
        let resp: HeadResponse = self.get_json("/v1/chain/head").await?;
        Ok(resp.confirmed_block)
    }
}
