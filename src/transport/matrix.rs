//! Matrix client-server API adapter.
//!
//! A thin HTTP implementation of the handful of endpoints the bot needs:
//! send, reply, redact, alias resolution, media download and `/sync`
//! long-polling. Deliberately not a full SDK — the pipeline only ever
//! sees [`ChatTransport`] and [`ContentFetcher`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use uuid::Uuid;

use crate::classify::ContentFetcher;
use crate::error::{FetchError, TransportError};
use crate::transport::ChatTransport;
use crate::types::MessageEvent;

/// Events received from one `/sync` call plus the token to resume from.
#[derive(Debug)]
pub struct SyncBatch {
    pub next_batch: String,
    pub events: Vec<MessageEvent>,
}

/// Client-server API transport for one bot account.
pub struct MatrixTransport {
    base_url: String,
    access_token: SecretString,
    client: reqwest::Client,
}

impl MatrixTransport {
    pub fn new(base_url: impl Into<String>, access_token: SecretString) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            access_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/_matrix/client/v3/{path}", self.base_url)
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(self.access_token.expose_secret())
    }

    /// Map non-2xx responses to transport errors.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            403 => Err(TransportError::Forbidden(body)),
            404 => Err(TransportError::NotFound(body)),
            s => Err(TransportError::Http { status: s, body }),
        }
    }

    async fn put_event(
        &self,
        path: String,
        body: Value,
    ) -> Result<String, TransportError> {
        let response = self
            .auth(self.client.put(self.api_url(&path)).json(&body))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        data.get("event_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| TransportError::Malformed("response missing event_id".into()))
    }

    fn message_path(&self, room_id: &str) -> String {
        format!(
            "rooms/{}/send/m.room.message/{}",
            urlencoding::encode(room_id),
            Uuid::new_v4()
        )
    }

    /// One `/sync` long-poll. `since` is the token from the previous
    /// batch; `None` starts a fresh stream (used once at startup to skip
    /// the backlog).
    pub async fn sync_once(
        &self,
        since: Option<&str>,
        timeout_ms: u64,
    ) -> Result<SyncBatch, TransportError> {
        let mut request = self
            .client
            .get(self.api_url("sync"))
            .query(&[("timeout", timeout_ms.to_string())]);
        if let Some(token) = since {
            request = request.query(&[("since", token)]);
        }

        let response = Self::check(self.auth(request).send().await?).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        let next_batch = data
            .get("next_batch")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Malformed("sync response missing next_batch".into()))?
            .to_string();

        Ok(SyncBatch {
            next_batch,
            events: collect_message_events(&data),
        })
    }
}

/// Pull `m.room.message` events out of a sync response body.
fn collect_message_events(sync: &Value) -> Vec<MessageEvent> {
    let mut events = Vec::new();
    let Some(rooms) = sync
        .get("rooms")
        .and_then(|r| r.get("join"))
        .and_then(Value::as_object)
    else {
        return events;
    };

    for (room_id, room) in rooms {
        let Some(timeline) = room
            .get("timeline")
            .and_then(|t| t.get("events"))
            .and_then(Value::as_array)
        else {
            continue;
        };

        for raw in timeline {
            if raw.get("type").and_then(Value::as_str) != Some("m.room.message") {
                continue;
            }
            let (Some(event_id), Some(sender), Some(content)) = (
                raw.get("event_id").and_then(Value::as_str),
                raw.get("sender").and_then(Value::as_str),
                raw.get("content"),
            ) else {
                continue;
            };
            let Some(msgtype) = content.get("msgtype").and_then(Value::as_str) else {
                continue;
            };

            let body = content
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let mut event = MessageEvent::new(room_id, event_id, sender, msgtype, body);
            if let Some(html) = content.get("formatted_body").and_then(Value::as_str) {
                event = event.with_formatted_body(html);
            }
            if let Some(url) = content.get("url").and_then(Value::as_str) {
                event = event.with_attachment(url);
            }
            if let Some(ts) = raw.get("origin_server_ts").and_then(Value::as_i64) {
                if let Some(at) = chrono::DateTime::from_timestamp_millis(ts) {
                    event.received_at = at;
                }
            }
            events.push(event);
        }
    }
    events
}

/// Split `mxc://<server>/<media-id>` into its parts.
fn parse_content_uri(locator: &str) -> Result<(&str, &str), TransportError> {
    let invalid = || TransportError::InvalidLocator(locator.to_string());
    let rest = locator.strip_prefix("mxc://").ok_or_else(invalid)?;
    let (server, media_id) = rest.split_once('/').ok_or_else(invalid)?;
    if server.is_empty() || media_id.is_empty() {
        return Err(invalid());
    }
    Ok((server, media_id))
}

#[async_trait]
impl ChatTransport for MatrixTransport {
    async fn send_message(&self, room_id: &str, body: &str) -> Result<String, TransportError> {
        // m.notice so other bots leave our reports alone.
        self.put_event(
            self.message_path(room_id),
            serde_json::json!({
                "msgtype": "m.notice",
                "body": body,
            }),
        )
        .await
    }

    async fn send_reply(
        &self,
        room_id: &str,
        in_reply_to: &str,
        body: &str,
    ) -> Result<String, TransportError> {
        self.put_event(
            self.message_path(room_id),
            serde_json::json!({
                "msgtype": "m.notice",
                "body": body,
                "m.relates_to": {
                    "m.in_reply_to": { "event_id": in_reply_to }
                }
            }),
        )
        .await
    }

    async fn redact(
        &self,
        room_id: &str,
        event_id: &str,
        reason: &str,
    ) -> Result<(), TransportError> {
        let path = format!(
            "rooms/{}/redact/{}/{}",
            urlencoding::encode(room_id),
            urlencoding::encode(event_id),
            Uuid::new_v4()
        );
        self.put_event(path, serde_json::json!({ "reason": reason }))
            .await?;
        Ok(())
    }

    async fn resolve_alias(&self, alias: &str) -> Result<String, TransportError> {
        let path = format!("directory/room/{}", urlencoding::encode(alias));
        let response = self
            .auth(self.client.get(self.api_url(&path)))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;
        data.get("room_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| TransportError::Malformed("response missing room_id".into()))
    }

    async fn download(&self, locator: &str) -> Result<Vec<u8>, TransportError> {
        let (server, media_id) = parse_content_uri(locator)?;
        let url = format!(
            "{}/_matrix/client/v1/media/download/{}/{}",
            self.base_url,
            urlencoding::encode(server),
            urlencoding::encode(media_id)
        );
        let response = Self::check(self.auth(self.client.get(url)).send().await?).await?;
        let bytes = response.bytes().await.map_err(TransportError::from)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentFetcher for MatrixTransport {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.download(locator).await.map_err(|e| match e {
            TransportError::NotFound(_) => FetchError::NotFound(locator.to_string()),
            TransportError::InvalidLocator(l) => FetchError::InvalidLocator(l),
            other => FetchError::Transport(other.to_string()),
        })
    }
}
