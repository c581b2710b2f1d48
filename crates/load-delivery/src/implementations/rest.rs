//! Transaction status lookups through the Cosmos REST API.

use crate::{DeliveryError, TxStatusInterface};
use async_trait::async_trait;
use load_types::{HttpClient, TxHash, TxResult, TxStatus};
use serde::Deserialize;

/// Body of `GET /cosmos/tx/v1beta1/txs/{hash}`, reduced to what is needed.
#[derive(Debug, Deserialize)]
struct GetTxResponse {
	tx_response: TxResponse,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
	#[serde(default)]
	code: u32,
	#[serde(default)]
	raw_log: String,
}

/// Decodes a 200 response body into the transaction result.
pub fn decode_tx_result(hash: &TxHash, body: &str) -> Result<TxResult, DeliveryError> {
	let decoded: GetTxResponse = serde_json::from_str(body)
		.map_err(|e| DeliveryError::InvalidResponse(format!("tx {}: {}", hash, e)))?;
	Ok(TxResult {
		hash: hash.clone(),
		code: decoded.tx_response.code,
		raw_log: decoded.tx_response.raw_log,
	})
}

/// Status source querying `{api}/cosmos/tx/v1beta1/txs/{hash}`.
///
/// 404 means the transaction is not indexed yet. Any status other than 200 or
/// 404 is reported as an error, which the poller treats as transient.
pub struct RestTxStatus {
	client: HttpClient,
	api: String,
}

impl RestTxStatus {
	/// Creates a status source for the REST API rooted at `api`.
	pub fn new(client: HttpClient, api: impl Into<String>) -> Self {
		Self {
			client,
			api: api.into().trim_end_matches('/').to_string(),
		}
	}

	fn url(&self, hash: &TxHash) -> String {
		format!("{}/cosmos/tx/v1beta1/txs/{}", self.api, hash)
	}
}

#[async_trait]
impl TxStatusInterface for RestTxStatus {
	async fn get_status(&self, hash: &TxHash) -> Result<TxStatus, DeliveryError> {
		let response = self
			.client
			.get(&self.url(hash))
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;

		match response.status().as_u16() {
			404 => Ok(TxStatus::Pending),
			200 => {
				let body = response
					.text()
					.await
					.map_err(|e| DeliveryError::Network(e.to_string()))?;
				Ok(TxStatus::Included(decode_tx_result(hash, &body)?))
			},
			status => Err(DeliveryError::Network(format!("unknown status {}", status))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::extract::Path;
	use axum::http::StatusCode;
	use axum::response::IntoResponse;
	use axum::{routing::get, Router};
	use load_types::HttpRetryPolicy;
	use std::time::Duration;

	const ACCEPTED: &str = r#"{
		"tx": {"body": {"messages": [], "memo": ""}},
		"tx_response": {
			"height": "1200",
			"txhash": "OK",
			"codespace": "",
			"code": 0,
			"raw_log": "[]",
			"gas_used": "81234"
		}
	}"#;

	const REJECTED: &str = r#"{
		"tx_response": {"txhash": "BAD", "code": 5, "raw_log": "insufficient funds"}
	}"#;

	async fn tx_handler(Path(hash): Path<String>) -> impl IntoResponse {
		match hash.as_str() {
			"OK" => (StatusCode::OK, ACCEPTED.to_string()),
			"BAD" => (StatusCode::OK, REJECTED.to_string()),
			"BROKEN" => (StatusCode::OK, "not json".to_string()),
			"FLAKY" => (StatusCode::BAD_GATEWAY, String::new()),
			_ => (StatusCode::NOT_FOUND, r#"{"code":5,"message":"tx not found"}"#.to_string()),
		}
	}

	async fn status_source() -> RestTxStatus {
		let app = Router::new().route("/cosmos/tx/v1beta1/txs/{hash}", get(tx_handler));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		let client = HttpClient::new(HttpRetryPolicy {
			max_retries: 0,
			min_wait: Duration::from_millis(1),
			timeout: Duration::from_secs(5),
		})
		.unwrap();
		RestTxStatus::new(client, format!("http://{}/", addr))
	}

	#[tokio::test]
	async fn test_status_mapping() {
		let source = status_source().await;

		let included = source.get_status(&TxHash("OK".into())).await.unwrap();
		assert!(matches!(included, TxStatus::Included(ref r) if r.is_success() && r.raw_log == "[]"));

		let rejected = source.get_status(&TxHash("BAD".into())).await.unwrap();
		assert!(matches!(rejected, TxStatus::Included(ref r) if r.code == 5 && r.raw_log == "insufficient funds"));

		let pending = source.get_status(&TxHash("UNKNOWN".into())).await.unwrap();
		assert_eq!(pending, TxStatus::Pending);
	}

	#[tokio::test]
	async fn test_unexpected_answers_are_errors() {
		let source = status_source().await;

		let flaky = source.get_status(&TxHash("FLAKY".into())).await;
		assert!(matches!(flaky, Err(DeliveryError::Network(ref m)) if m.contains("502")));

		let broken = source.get_status(&TxHash("BROKEN".into())).await;
		assert!(matches!(broken, Err(DeliveryError::InvalidResponse(_))));
	}
}
