use async_trait::async_trait;
use crate::config::SlackConfig;
use crate::providers::traits::{Channel, MessagingError, MessagingService};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const PAGE_SIZE: &str = "200";

/// Slack Web API client authenticated with a bot token.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    token: String,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    channels: Vec<Channel>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    ts: Option<String>,
}

impl ConversationsListResponse {
    /// Channels on this page plus the cursor of the next one, if any.
    fn into_page(self) -> Result<(Vec<Channel>, Option<String>), MessagingError> {
        if !self.ok {
            return Err(api_error(self.error));
        }
        let next = self
            .response_metadata
            .map(|meta| meta.next_cursor)
            .filter(|cursor| !cursor.is_empty());
        Ok((self.channels, next))
    }
}

impl PostMessageResponse {
    fn into_ts(self) -> Result<String, MessagingError> {
        if !self.ok {
            return Err(api_error(self.error));
        }
        Ok(self.ts.unwrap_or_default())
    }
}

fn api_error(code: Option<String>) -> MessagingError {
    MessagingError::api(code.unwrap_or_else(|| "unknown_error".to_string()))
}

impl SlackClient {
    pub fn new(config: &SlackConfig, timeout: Duration) -> Result<Self, MessagingError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            token: config.token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }
}

#[async_trait]
impl MessagingService for SlackClient {
    async fn list_channels(&self) -> Result<Vec<Channel>, MessagingError> {
        let mut channels = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", PAGE_SIZE.to_string())];
            if let Some(cursor) = &cursor {
                query.push(("cursor", cursor.clone()));
            }

            let response: ConversationsListResponse = self.client
                .get(self.endpoint("conversations.list"))
                .bearer_auth(&self.token)
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let (page, next) = response.into_page()?;
            log::debug!("conversations.list returned {} channels", page.len());
            channels.extend(page);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(channels)
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<String, MessagingError> {
        let response: PostMessageResponse = self.client
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&json!({
                "channel": channel_id,
                "text": text,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_ts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryMode;
    use crate::notify::{Notifier, NotifyOutcome};
    use axum::extract::{Query, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_list_page_with_cursor() {
        let body = r#"{
            "ok": true,
            "channels": [
                {"id": "C012AB3CD", "name": "general", "is_channel": true, "is_archived": false},
                {"id": "C061EG9T2", "name": "aiagent", "is_channel": true, "num_members": 4}
            ],
            "response_metadata": {"next_cursor": "dGVhbTpDMDYxRkE1UEI="}
        }"#;
        let response: ConversationsListResponse = serde_json::from_str(body).unwrap();
        let (channels, next) = response.into_page().unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1], Channel { id: "C061EG9T2".into(), name: "aiagent".into() });
        assert_eq!(next.as_deref(), Some("dGVhbTpDMDYxRkE1UEI="));
    }

    #[test]
    fn test_last_page_has_empty_cursor() {
        let body = r#"{"ok": true, "channels": [], "response_metadata": {"next_cursor": ""}}"#;
        let response: ConversationsListResponse = serde_json::from_str(body).unwrap();
        let (channels, next) = response.into_page().unwrap();
        assert!(channels.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn test_list_error_carries_slack_code() {
        let body = r#"{"ok": false, "error": "invalid_auth"}"#;
        let response: ConversationsListResponse = serde_json::from_str(body).unwrap();
        match response.into_page() {
            Err(MessagingError::Api { code }) => assert_eq!(code, "invalid_auth"),
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[test]
    fn test_post_message_outcomes() {
        let ok: PostMessageResponse =
            serde_json::from_str(r#"{"ok": true, "channel": "C061EG9T2", "ts": "1503435956.000247"}"#).unwrap();
        assert_eq!(ok.into_ts().unwrap(), "1503435956.000247");

        let rejected: PostMessageResponse =
            serde_json::from_str(r#"{"ok": false, "error": "not_in_channel"}"#).unwrap();
        assert!(matches!(rejected.into_ts(), Err(MessagingError::Api { code }) if code == "not_in_channel"));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = SlackConfig {
            token: "xoxb-test".into(),
            api_url: "http://localhost:9999/api/".into(),
            webhook_url: None,
            channel: "aiagent".into(),
            delivery: DeliveryMode::Api,
        };
        let client = SlackClient::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint("chat.postMessage"), "http://localhost:9999/api/chat.postMessage");
    }

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn client_for(api_url: String) -> SlackClient {
        let config = SlackConfig {
            token: "xoxb-test".into(),
            api_url,
            webhook_url: None,
            channel: "aiagent".into(),
            delivery: DeliveryMode::Api,
        };
        SlackClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[derive(Clone, Default)]
    struct Workspace {
        cursors: Arc<Mutex<Vec<Option<String>>>>,
        archived_included: Arc<Mutex<Vec<bool>>>,
        posts: Arc<Mutex<Vec<(String, String)>>>,
    }

    async fn conversations_list(
        State(ws): State<Workspace>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer xoxb-test") {
            return Json(json!({"ok": false, "error": "not_authed"}));
        }
        let cursor = params.get("cursor").cloned();
        ws.cursors.lock().unwrap().push(cursor.clone());
        ws.archived_included
            .lock()
            .unwrap()
            .push(params.get("exclude_archived").map_or(true, |v| v != "true"));

        match cursor.as_deref() {
            None => Json(json!({
                "ok": true,
                "channels": [{"id": "C01", "name": "general"}, {"id": "C02", "name": "random"}],
                "response_metadata": {"next_cursor": "dGVhbTpDMDM="}
            })),
            Some(_) => Json(json!({
                "ok": true,
                "channels": [{"id": "C03", "name": "aiagent", "is_archived": true}],
                "response_metadata": {"next_cursor": ""}
            })),
        }
    }

    async fn post_message(State(ws): State<Workspace>, Json(body): Json<Value>) -> Json<Value> {
        let channel = body["channel"].as_str().unwrap_or_default().to_string();
        let text = body["text"].as_str().unwrap_or_default().to_string();
        ws.posts.lock().unwrap().push((channel.clone(), text));
        Json(json!({"ok": true, "channel": channel, "ts": "1503435956.000247"}))
    }

    fn workspace_app(ws: Workspace) -> axum::Router {
        axum::Router::new()
            .route("/api/conversations.list", get(conversations_list))
            .route("/api/chat.postMessage", post(post_message))
            .with_state(ws)
    }

    #[tokio::test]
    async fn test_listing_follows_cursor_to_last_page() {
        let ws = Workspace::default();
        let slack = client_for(serve(workspace_app(ws.clone())).await);

        let channels = slack.list_channels().await.unwrap();

        let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["general", "random", "aiagent"]);
        assert_eq!(
            *ws.cursors.lock().unwrap(),
            vec![None, Some("dGVhbTpDMDM=".to_string())]
        );
        assert!(ws.archived_included.lock().unwrap().iter().all(|included| *included));
    }

    #[tokio::test]
    async fn test_channel_on_second_page_receives_the_post() {
        let ws = Workspace::default();
        let slack = Arc::new(client_for(serve(workspace_app(ws.clone())).await));

        let outcome = Notifier::api(slack).notify("aiagent", "Q: a\nA: b").await;

        assert_eq!(
            outcome,
            NotifyOutcome::Delivered { channel_id: Some("C03".into()), ts: Some("1503435956.000247".into()) }
        );
        assert_eq!(*ws.posts.lock().unwrap(), vec![("C03".to_string(), "Q: a\nA: b".to_string())]);
    }
}
