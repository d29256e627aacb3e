use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::AppError;

/// The header used by Nomad for ACL tokens.
const TOKEN_HEADER: &str = "X-Nomad-Token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_NOMAD_ADDRESS: &str = "http://127.0.0.1:4646";

/// The outcome of a job registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobSubmission {
	pub id: String,
	pub name: String,
	pub status: String,
}

/// A summary of a registered job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
	#[serde(rename = "ID")]
	pub id: String,

	#[serde(rename = "Name")]
	pub name: String,

	#[serde(rename = "Status")]
	pub status: String,

	#[serde(rename = "Type")]
	pub type_: String,
}

/// A minimal client for the Nomad HTTP API.
#[derive(Clone, Debug)]
pub struct NomadClient {
	client: Client,
	address: Url,
	token: Option<String>,
}

impl NomadClient {
	pub fn new(address: &str, token: Option<String>) -> Result<Self, AppError> {
		let mut address = Url::parse(address).map_err(|e| AppError::Api {
			url: address.to_string(),
			message: format!("invalid address: {e}"),
		})?;

		// Endpoints are joined as relative paths, which replace the last segment otherwise
		if !address.path().ends_with('/') {
			let path = format!("{}/", address.path());
			address.set_path(&path);
		}

		let client = Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| AppError::Api {
				url: address.to_string(),
				message: e.to_string(),
			})?;

		Ok(Self {
			client,
			address,
			token: token.filter(|token| !token.is_empty()),
		})
	}

	fn endpoint(&self, path: &str) -> Result<Url, AppError> {
		self.address.join(path).map_err(|e| AppError::Api {
			url: format!("{}{path}", self.address),
			message: e.to_string(),
		})
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		let request = self.client.request(method, url);

		match &self.token {
			Some(token) => request.header(TOKEN_HEADER, token),
			None => request,
		}
	}

	async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, AppError> {
		let api_error = |message: String| AppError::Api {
			url: url.to_string(),
			message,
		};

		let response = request.send().await.map_err(|e| api_error(e.to_string()))?;

		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();

		Err(api_error(format!("{status}: {}", body.trim())))
	}

	async fn send_json<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		url: &Url,
	) -> Result<T, AppError> {
		self
			.send(request, url)
			.await?
			.json::<T>()
			.await
			.map_err(|e| AppError::Api {
				url: url.to_string(),
				message: format!("unexpected response: {e}"),
			})
	}

	/// Parses the HCL on the server, registers the job and returns its status.
	pub async fn submit_job(&self, hcl: &str) -> Result<JobSubmission, AppError> {
		let parse_url = self.endpoint("v1/jobs/parse")?;

		let job: Value = self
			.send_json(
				self
					.request(Method::POST, parse_url.clone())
					.json(&json!({ "JobHCL": hcl, "Canonicalize": true })),
				&parse_url,
			)
			.await?;

		let id = job
			.get("ID")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();

		debug!(job = %id, "Parsed the job specification");

		let register_url = self.endpoint("v1/jobs")?;

		let registration: Value = self
			.send_json(
				self
					.request(Method::POST, register_url.clone())
					.json(&json!({ "Job": job })),
				&register_url,
			)
			.await?;

		info!(
			job = %id,
			evaluation = ?registration.get("EvalID"),
			"Registered the job"
		);

		let status = self.get_job(&id).await?;

		Ok(JobSubmission {
			id: status.id,
			name: status.name,
			status: status.status,
		})
	}

	pub async fn get_job(&self, id: &str) -> Result<JobStatus, AppError> {
		let url = self.endpoint(&format!("v1/job/{id}"))?;

		self
			.send_json(self.request(Method::GET, url.clone()), &url)
			.await
	}

	/// Deregisters a job, removing it from the state entirely with `purge`.
	pub async fn stop_job(&self, id: &str, purge: bool) -> Result<(), AppError> {
		let mut url = self.endpoint(&format!("v1/job/{id}"))?;

		if purge {
			url.query_pairs_mut().append_pair("purge", "true");
		}

		self
			.send(self.request(Method::DELETE, url.clone()), &url)
			.await?;

		info!(job = %id, purge, "Stopped the job");

		Ok(())
	}

	/// Whether the agent answers its health endpoint.
	pub async fn health_check(&self) -> bool {
		let Ok(url) = self.endpoint("v1/agent/health") else {
			return false;
		};

		self
			.send(self.request(Method::GET, url.clone()), &url)
			.await
			.is_ok()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn endpoints_are_joined_to_the_address() {
		let client = NomadClient::new(DEFAULT_NOMAD_ADDRESS, Some(String::new())).unwrap();

		assert_eq!(
			client.endpoint("v1/job/web").unwrap().as_str(),
			"http://127.0.0.1:4646/v1/job/web"
		);
		assert_eq!(client.token, None);
	}

	#[test]
	fn addresses_behind_a_path_prefix() {
		for address in ["https://gateway.example.com/nomad", "https://gateway.example.com/nomad/"] {
			let client = NomadClient::new(address, None).unwrap();

			assert_eq!(
				client.endpoint("v1/jobs").unwrap().as_str(),
				"https://gateway.example.com/nomad/v1/jobs"
			);
		}
	}

	#[test]
	fn invalid_addresses() {
		assert!(NomadClient::new("not a url", None).is_err());
	}

	#[test]
	fn job_status_from_the_api() {
		let status: JobStatus = serde_json::from_value(json!({
			"ID": "web",
			"Name": "web",
			"Status": "running",
			"Type": "service",
			"Priority": 50
		}))
		.unwrap();

		assert_eq!(status.status, "running");
		assert_eq!(status.type_, "service");
	}
}
