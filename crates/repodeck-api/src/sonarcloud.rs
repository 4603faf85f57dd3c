// SonarCloud quality-gate client. Only the project_status endpoint is
// used; everything else the service offers is out of scope here.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{with_retry, RetryConfig};

const SONARCLOUD_API_BASE: &str = "https://sonarcloud.io/api";

#[derive(Error, Debug)]
pub enum SonarError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SonarError>;

pub struct SonarClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl SonarClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, SONARCLOUD_API_BASE.to_string())
    }

    /// For self-hosted SonarQube instances
    pub fn with_base_url(token: Option<String>, base_url: String) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("repodeck/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token,
            base_url,
            retry_config: RetryConfig::default(),
        }
    }

    /// Create client with custom retry configuration
    pub fn with_retry_config(token: Option<String>, retry_config: RetryConfig) -> Self {
        let mut client = Self::new(token);
        client.retry_config = retry_config;
        client
    }

    /// Quality-gate status for one project.
    ///
    /// Returns `Ok(None)` when SonarCloud has never heard of the key; most
    /// repositories are not analyzed, so a missing project is an answer, not
    /// an error.
    pub async fn project_status(&self, project_key: &str) -> Result<Option<SonarQualityGate>> {
        let url = format!(
            "{}/qualitygates/project_status?projectKey={}",
            self.base_url,
            urlencoding::encode(project_key)
        );
        let token = self.token.clone();

        with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url);

            // SonarCloud token auth: token as the basic-auth user, no password.
            if let Some(ref token) = token {
                request = request.basic_auth(token, Some(""));
            }

            let response = request.send().await?;
            let status = response.status();

            if status == 404 {
                return Ok(None);
            }

            if status == 401 {
                return Err(SonarError::AuthRequired);
            }

            if status == 429 {
                return Err(SonarError::RateLimitExceeded);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SonarError::RequestFailed(format!(
                    "Status {}: {}",
                    status, body
                )));
            }

            let wrapper: ProjectStatusResponse = response.json().await?;
            Ok(Some(wrapper.project_status))
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectStatusResponse {
    project_status: SonarQualityGate,
}

/// Gate verdict as SonarCloud reports it: "OK", "WARN", "ERROR", or "NONE"
/// when the project exists but has no analysis yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarQualityGate {
    pub status: String,
    #[serde(default)]
    pub conditions: Vec<SonarCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarCondition {
    pub status: String,
    pub metric_key: String,
    pub comparator: Option<String>,
    pub error_threshold: Option<String>,
    pub actual_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_deserializes() {
        let json = r#"{
            "projectStatus": {
                "status": "ERROR",
                "conditions": [
                    {
                        "status": "ERROR",
                        "metricKey": "new_coverage",
                        "comparator": "LT",
                        "errorThreshold": "80",
                        "actualValue": "62.5"
                    },
                    {
                        "status": "OK",
                        "metricKey": "new_bugs",
                        "comparator": "GT",
                        "errorThreshold": "0",
                        "actualValue": "0"
                    }
                ]
            }
        }"#;

        let wrapper: ProjectStatusResponse = serde_json::from_str(json).unwrap();
        let gate = wrapper.project_status;
        assert_eq!(gate.status, "ERROR");
        assert_eq!(gate.conditions.len(), 2);
        assert_eq!(gate.conditions[0].metric_key, "new_coverage");
        assert_eq!(gate.conditions[0].actual_value.as_deref(), Some("62.5"));
    }

    #[test]
    fn unanalyzed_project_has_no_conditions() {
        let json = r#"{"projectStatus": {"status": "NONE"}}"#;
        let wrapper: ProjectStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(wrapper.project_status.status, "NONE");
        assert!(wrapper.project_status.conditions.is_empty());
    }
}
