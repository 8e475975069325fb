use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::common::ChatMessage;
use crate::config::AppConfig;
use crate::error::{CompanionError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    user_message: &'a str,
    conversation_history: Vec<HistoryEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry<'a> {
    content: &'a str,
    is_user: bool,
}

/// Client for the remote chat function that streams assistant answers.
pub struct ChatGateway {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl ChatGateway {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.chat_endpoint.trim().to_string(),
            access_token: config.access_token.clone(),
            timeout,
        })
    }

    /// POST the question and return the response whose body is the event stream.
    ///
    /// Only the wait for response headers is bounded; the body may stream for
    /// as long as the endpoint keeps it open.
    pub async fn open_stream(
        &self,
        user_message: &str,
        history: &[ChatMessage],
    ) -> Result<Response> {
        if self.endpoint.is_empty() {
            return Err(CompanionError::Config("chat endpoint is not set".into()));
        }

        let body = ChatRequest {
            user_message,
            conversation_history: history
                .iter()
                .map(|message| HistoryEntry {
                    content: &message.content,
                    is_user: message.is_user,
                })
                .collect(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| CompanionError::Timeout(self.timeout))??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::TOO_MANY_REQUESTS => log::warn!("Chat endpoint rate limited: {body}"),
            StatusCode::PAYMENT_REQUIRED => log::warn!("Chat endpoint out of credits: {body}"),
            _ => log::error!("Chat endpoint returned {status}: {body}"),
        }
        Err(CompanionError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use mockito::Matcher;

    use super::*;

    fn config_for(endpoint: String) -> AppConfig {
        AppConfig {
            chat_endpoint: endpoint,
            access_token: Some("anon-key".into()),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn posts_question_with_history_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", "Bearer anon-key")
            .match_body(Matcher::Json(serde_json::json!({
                "userMessage": "How do I sleep better?",
                "conversationHistory": [
                    { "content": "Hi", "isUser": true },
                    { "content": "Hello!", "isUser": false }
                ]
            })))
            .with_header("content-type", "text/event-stream")
            .with_body("data: [DONE]\n\n")
            .create_async()
            .await;

        let gateway = ChatGateway::new(&config_for(format!("{}/chat", server.url()))).unwrap();
        let history = vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello!")];
        let response = gateway
            .open_stream("How do I sleep better?", &history)
            .await
            .unwrap();

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"data: [DONE]\n\n");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_is_a_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let gateway = ChatGateway::new(&config_for(format!("{}/chat", server.url()))).unwrap();
        let err = gateway.open_stream("hello", &[]).await.unwrap_err();

        assert!(err.is_transport());
        assert!(matches!(
            err,
            CompanionError::HttpStatus { status: 429, ref body } if body == "slow down"
        ));
    }

    #[tokio::test]
    async fn empty_endpoint_is_a_config_error() {
        let gateway = ChatGateway::new(&config_for("  ".into())).unwrap();
        let err = gateway.open_stream("hello", &[]).await.unwrap_err();
        assert!(matches!(err, CompanionError::Config(_)));
    }
}
