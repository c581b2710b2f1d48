//! Faucet implementation that posts the wallet-provisioning form.

use crate::{FaucetInterface, ProvisionError};
use async_trait::async_trait;
use load_types::HttpClient;

/// Faucet reached over HTTP.
///
/// Each call posts `address=<addr>&command=client&clientType=SMART_WALLET`
/// to the form endpoint; any 2xx answer counts as provisioned.
pub struct HttpFaucet {
	client: HttpClient,
	url: String,
}

impl HttpFaucet {
	/// Creates a faucet posting to `faucet_root` joined with `path`.
	pub fn new(client: HttpClient, faucet_root: &str, path: &str) -> Self {
		Self {
			client,
			url: format!("{}{}", faucet_root.trim_end_matches('/'), path),
		}
	}

	/// Full URL of the form endpoint.
	pub fn url(&self) -> &str {
		&self.url
	}
}

#[async_trait]
impl FaucetInterface for HttpFaucet {
	async fn provision(&self, address: &str) -> Result<(), ProvisionError> {
		let form = [
			("address", address),
			("command", "client"),
			("clientType", "SMART_WALLET"),
		];
		let response = self
			.client
			.post_form(&self.url, &form)
			.await
			.map_err(|e| ProvisionError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			tracing::warn!(url = %self.url, address = %address, status = status.as_u16(), "Faucet request rejected");
			return Err(ProvisionError::Rejected {
				address: address.to_string(),
				status: status.as_u16(),
			});
		}

		tracing::debug!(address = %address, "Faucet accepted provisioning request");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::StatusCode;
	use axum::{routing::post, Form, Router};
	use load_types::HttpRetryPolicy;
	use std::collections::HashMap;
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	fn client() -> HttpClient {
		HttpClient::new(HttpRetryPolicy {
			max_retries: 0,
			min_wait: Duration::from_millis(1),
			timeout: Duration::from_secs(5),
		})
		.unwrap()
	}

	async fn serve(app: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	#[tokio::test]
	async fn test_posts_smart_wallet_form() {
		let seen: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
		let recorder = seen.clone();
		let app = Router::new().route(
			"/go",
			post(move |Form(form): Form<HashMap<String, String>>| {
				let recorder = recorder.clone();
				async move {
					recorder.lock().unwrap().push(form);
					StatusCode::OK
				}
			}),
		);
		let base = serve(app).await;

		let faucet = HttpFaucet::new(client(), &format!("{}/", base), "/go");
		assert_eq!(faucet.url(), format!("{}/go", base));
		faucet.provision("agoric1abc").await.unwrap();

		let forms = seen.lock().unwrap();
		assert_eq!(forms.len(), 1);
		assert_eq!(forms[0]["address"], "agoric1abc");
		assert_eq!(forms[0]["command"], "client");
		assert_eq!(forms[0]["clientType"], "SMART_WALLET");
	}

	#[tokio::test]
	async fn test_error_status_is_rejection() {
		let app = Router::new().route("/go", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
		let base = serve(app).await;

		let faucet = HttpFaucet::new(client(), &base, "/go");
		let result = faucet.provision("agoric1abc").await;
		assert!(matches!(
			result,
			Err(ProvisionError::Rejected { status: 503, .. })
		));
	}
}
