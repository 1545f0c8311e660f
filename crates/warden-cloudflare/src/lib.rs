//! Cloudflare v4 API client.
//!
//! Toggles a zone's development mode and purges its cache. Authenticates
//! with the legacy email + global key headers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warden_core::{config::CloudflareConfig, error::WardenError, traits::ControlApi};

/// Cloudflare zone controller.
pub struct CloudflareApi {
    client: reqwest::Client,
    api_url: String,
    zone: String,
    auth_email: String,
    auth_key: String,
}

impl CloudflareApi {
    /// Create from config values.
    pub fn from_config(config: &CloudflareConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            zone: config.zone.clone(),
            auth_email: config.auth_email.clone(),
            auth_key: config.auth_key.clone(),
        }
    }

    fn development_mode_url(&self) -> String {
        format!("{}/zones/{}/settings/development_mode", self.api_url, self.zone)
    }

    fn purge_url(&self) -> String {
        format!("{}/zones/{}/purge_cache", self.api_url, self.zone)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Auth-Email", &self.auth_email)
            .header("X-Auth-Key", &self.auth_key)
            .header("content-type", "application/json")
    }

    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<CfResponse<T>, WardenError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| WardenError::Control(format!("cloudflare request failed: {e}")))?;

        // Error statuses still carry the `errors` array.
        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            WardenError::Control(format!("cloudflare returned {status}, body unreadable: {e}"))
        })?;
        parse_body(status, &text)
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(
    status: reqwest::StatusCode,
    text: &str,
) -> Result<CfResponse<T>, WardenError> {
    serde_json::from_str(text).map_err(|e| {
        WardenError::Control(format!(
            "cloudflare returned {status}, unparseable body: {e}"
        ))
    })
}

#[derive(Serialize)]
struct SettingRequest<'a> {
    value: &'a str,
}

#[derive(Serialize)]
struct PurgeRequest {
    purge_everything: bool,
}

#[derive(Debug, Deserialize)]
struct CfResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<CfError>,
    result: Option<T>,
}

impl<T> CfResponse<T> {
    fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "unknown error".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// The result of a successful call.
    fn into_result(self) -> Result<T, WardenError> {
        if !self.success {
            return Err(WardenError::Control(self.error_summary()));
        }
        self.result
            .ok_or_else(|| WardenError::Control("cloudflare returned no result".into()))
    }
}

#[derive(Debug, Deserialize)]
struct CfError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfSetting {
    value: String,
}

#[async_trait]
impl ControlApi for CloudflareApi {
    fn name(&self) -> &str {
        "cloudflare"
    }

    async fn development_mode(&self) -> Result<String, WardenError> {
        debug!("cloudflare: GET development_mode for zone {}", self.zone);
        let resp: CfResponse<CfSetting> = self
            .execute(self.client.get(self.development_mode_url()))
            .await?;
        Ok(resp.into_result()?.value)
    }

    async fn set_development_mode(&self, enabled: bool) -> Result<String, WardenError> {
        let value = if enabled { "on" } else { "off" };
        info!("cloudflare: setting development_mode={value} for zone {}", self.zone);
        let resp: CfResponse<CfSetting> = self
            .execute(
                self.client
                    .patch(self.development_mode_url())
                    .json(&SettingRequest { value }),
            )
            .await?;
        Ok(resp.into_result()?.value)
    }

    async fn purge_everything(&self) -> Result<bool, WardenError> {
        info!("cloudflare: purging cache for zone {}", self.zone);
        let resp: CfResponse<serde_json::Value> = self
            .execute(self.client.post(self.purge_url()).json(&PurgeRequest {
                purge_everything: true,
            }))
            .await?;
        Ok(resp.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CloudflareConfig {
        CloudflareConfig {
            enabled: true,
            zone: "023e105f4ecef8ad9ca31a8372d0c353".into(),
            auth_email: "ops@example.com".into(),
            auth_key: "c2547eb745079dac9320b638f5e225cf483cc5cfdda41".into(),
            api_url: "https://api.cloudflare.com/client/v4/".into(),
        }
    }

    #[test]
    fn test_cloudflare_name_and_urls() {
        let api = CloudflareApi::from_config(&config());
        assert_eq!(api.name(), "cloudflare");
        assert_eq!(
            api.development_mode_url(),
            "https://api.cloudflare.com/client/v4/zones/023e105f4ecef8ad9ca31a8372d0c353/settings/development_mode"
        );
        assert_eq!(
            api.purge_url(),
            "https://api.cloudflare.com/client/v4/zones/023e105f4ecef8ad9ca31a8372d0c353/purge_cache"
        );
    }

    #[test]
    fn test_request_bodies() {
        let on = serde_json::to_value(SettingRequest { value: "on" }).unwrap();
        assert_eq!(on, serde_json::json!({ "value": "on" }));
        let purge = serde_json::to_value(PurgeRequest {
            purge_everything: true,
        })
        .unwrap();
        assert_eq!(purge, serde_json::json!({ "purge_everything": true }));
    }

    #[test]
    fn test_setting_response_success() {
        let raw = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": {"id": "development_mode", "value": "off", "editable": true, "modified_on": "2014-01-01T05:20:00.12345Z", "time_remaining": 3600}
        }"#;
        let resp: CfResponse<CfSetting> = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.into_result().unwrap().value, "off");
    }

    #[test]
    fn test_setting_response_failure() {
        let raw = r#"{
            "success": false,
            "errors": [{"code": 9103, "message": "Unknown X-Auth-Key or X-Auth-Email"}],
            "messages": [],
            "result": null
        }"#;
        let resp: CfResponse<CfSetting> = serde_json::from_str(raw).unwrap();
        match resp.into_result() {
            Err(WardenError::Control(msg)) => {
                assert_eq!(msg, "Unknown X-Auth-Key or X-Auth-Email (9103)");
            }
            other => panic!("expected control error, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_body_reports_status() {
        let err = parse_body::<CfSetting>(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .unwrap_err();
        match err {
            WardenError::Control(msg) => {
                assert!(msg.starts_with("cloudflare returned 502 Bad Gateway, unparseable body:"));
            }
            other => panic!("expected control error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_body_is_a_read_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            // Promise more bytes than are sent, then hang up.
            sock.write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"success\"",
            )
            .await
            .unwrap();
        });

        let api = CloudflareApi::from_config(&CloudflareConfig {
            api_url: format!("http://{addr}"),
            ..config()
        });
        match api.development_mode().await {
            Err(WardenError::Control(msg)) => {
                assert!(msg.starts_with("cloudflare returned 200 OK, body unreadable:"), "{msg}");
            }
            other => panic!("expected control error, got {other:?}"),
        }
    }

    #[test]
    fn test_purge_response() {
        let raw = r#"{"success": true, "errors": [], "messages": [], "result": {"id": "abc"}}"#;
        let resp: CfResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(resp.success);

        let raw = r#"{"success": false, "errors": [], "result": null}"#;
        let resp: CfResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error_summary(), "unknown error");
    }
}
