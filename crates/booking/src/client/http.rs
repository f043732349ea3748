//! reqwest adapter for the inventory service.

use std::time::Duration;

use async_trait::async_trait;
use common::{
    BookingUid, ConfirmAvailabilityRequest, DateRange, REQUEST_ID_HEADER, RequestId, RoomId,
    RoomView,
};
use reqwest::{RequestBuilder, Response};

use super::{ClientError, InventoryClient, OP_CONFIRM, OP_RECOMMEND, OP_RELEASE, RetryPolicy};

/// Settings for [`HttpInventoryClient`].
#[derive(Debug, Clone)]
pub struct HttpInventoryClientConfig {
    pub base_url: String,
    /// Bearer credential presented to the inventory's internal endpoints.
    pub service_token: String,
    pub connect_timeout: Duration,
    /// Upper bound on a single attempt, from sending to reading the body.
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpInventoryClientConfig {
    pub fn new(base_url: impl Into<String>, service_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_token: service_token.into(),
            connect_timeout: Duration::from_millis(2000),
            read_timeout: Duration::from_millis(3000),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}

/// Inventory client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpInventoryClient {
    http: reqwest::Client,
    base_url: String,
    service_token: String,
    retry: RetryPolicy,
}

impl HttpInventoryClient {
    pub fn new(config: HttpInventoryClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_token: config.service_token,
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, request_id: &RequestId) -> RequestBuilder {
        request
            .bearer_auth(&self.service_token)
            .header(REQUEST_ID_HEADER, request_id.as_str())
    }
}

/// Sends a request and turns non-2xx statuses into [`ClientError`].
async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status.as_u16(), error_message(&body)))
}

/// Best-effort message extraction from an error body.
///
/// JSON objects yield `message`, then `error`, then `errorCode`; anything
/// else yields the raw body. Blank bodies yield nothing.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{')
        && let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(trimmed)
    {
        for key in ["message", "error", "errorCode"] {
            if let Some(serde_json::Value::String(text)) = fields.get(key)
                && !text.trim().is_empty()
            {
                return Some(text.clone());
            }
        }
    }
    Some(body.to_string())
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    #[tracing::instrument(skip(self), fields(%range, %request_id))]
    async fn recommend(
        &self,
        range: DateRange,
        request_id: &RequestId,
    ) -> Result<Vec<RoomView>, ClientError> {
        let url = self.url("/api/rooms/recommend");
        let start = range.start().to_string();
        let end = range.end().to_string();

        self.retry
            .run(OP_RECOMMEND, |_| {
                let request = self.authorized(
                    self.http
                        .get(&url)
                        .query(&[("start", start.as_str()), ("end", end.as_str())]),
                    request_id,
                );
                async move {
                    send(request)
                        .await?
                        .json::<Vec<RoomView>>()
                        .await
                        .map_err(|e| ClientError::Transport(e.to_string()))
                }
            })
            .await
    }

    #[tracing::instrument(skip(self, request), fields(%room_id, booking_uid = %request.booking_id, request_id = %request.request_id))]
    async fn confirm(
        &self,
        room_id: RoomId,
        request: &ConfirmAvailabilityRequest,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/rooms/{room_id}/confirm-availability"));

        self.retry
            .run(OP_CONFIRM, |_| {
                let builder =
                    self.authorized(self.http.post(&url).json(request), &request.request_id);
                async move { send(builder).await.map(|_| ()) }
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(%room_id, %booking_uid, %request_id))]
    async fn release(
        &self,
        room_id: RoomId,
        booking_uid: BookingUid,
        request_id: &RequestId,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/rooms/{room_id}/release"));
        let booking = booking_uid.to_string();

        self.retry
            .run(OP_RELEASE, |_| {
                let builder = self.authorized(
                    self.http
                        .post(&url)
                        .query(&[("bookingId", booking.as_str())]),
                    request_id,
                );
                async move { send(builder).await.map(|_| ()) }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_prefers_structured_fields() {
        assert_eq!(
            error_message(r#"{"message":"Room is not available for this period","errorCode":"CONFLICT"}"#),
            Some("Room is not available for this period".to_string())
        );
        assert_eq!(
            error_message(r#"{"message":"  ","error":"Conflict"}"#),
            Some("Conflict".to_string())
        );
        assert_eq!(
            error_message(r#"{"errorCode":"CONFLICT"}"#),
            Some("CONFLICT".to_string())
        );
    }

    #[test]
    fn message_falls_back_to_raw_body() {
        assert_eq!(error_message("room taken"), Some("room taken".to_string()));
        assert_eq!(error_message("{not json"), Some("{not json".to_string()));
        assert_eq!(error_message(r#"{"status":409}"#), Some(r#"{"status":409}"#.to_string()));
        assert_eq!(error_message("   "), None);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client =
            HttpInventoryClient::new(HttpInventoryClientConfig::new("http://inventory:3001/", "t"))
                .unwrap();
        assert_eq!(client.base_url(), "http://inventory:3001");
        assert_eq!(client.url("/api/rooms"), "http://inventory:3001/api/rooms");
    }
}
