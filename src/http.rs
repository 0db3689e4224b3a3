use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::models::*;
use crate::remote::{CommentApi, ConfessionApi};

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON REST client for the Weylo API.
#[derive(Clone)]
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteClient {
    pub fn new(config: &ClientConfig) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::ACCEPT, "application/json");
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    async fn send(rb: RequestBuilder) -> RemoteResult<Response> {
        let resp = rb.send().await.map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message.or(body.error).unwrap_or(fallback),
            Err(_) => fallback,
        };
        Err(RemoteError::Status { status: status.as_u16(), message })
    }

    async fn fetch<T: DeserializeOwned>(rb: RequestBuilder) -> RemoteResult<T> {
        Self::send(rb)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    // acknowledgement bodies are ignored
    async fn ack(rb: RequestBuilder) -> RemoteResult<()> {
        Self::send(rb).await.map(|_| ())
    }
}

#[async_trait]
impl ConfessionApi for HttpRemoteClient {
    async fn list_confessions(&self, page: u32, per_page: u32) -> RemoteResult<Page<Confession>> {
        let rb = self.request(Method::GET, "/confessions").query(&[("page", page), ("per_page", per_page)]);
        Self::fetch(rb).await
    }
    async fn get_confession(&self, id: Id) -> RemoteResult<Confession> {
        let env: Envelope<Confession> = Self::fetch(self.request(Method::GET, &format!("/confessions/{id}"))).await?;
        Ok(env.data)
    }
    async fn like(&self, id: Id) -> RemoteResult<()> {
        Self::ack(self.request(Method::POST, &format!("/confessions/{id}/like"))).await
    }
    async fn unlike(&self, id: Id) -> RemoteResult<()> {
        Self::ack(self.request(Method::DELETE, &format!("/confessions/{id}/like"))).await
    }
    async fn create_confession(&self, new: NewConfession) -> RemoteResult<Confession> {
        let env: Envelope<Confession> = Self::fetch(self.request(Method::POST, "/confessions").json(&new)).await?;
        Ok(env.data)
    }
    async fn delete_confession(&self, id: Id) -> RemoteResult<()> {
        Self::ack(self.request(Method::DELETE, &format!("/confessions/{id}"))).await
    }
    async fn report_confession(&self, id: Id, report: NewReport) -> RemoteResult<()> {
        Self::ack(self.request(Method::POST, &format!("/confessions/{id}/report")).json(&report)).await
    }
}

#[async_trait]
impl CommentApi for HttpRemoteClient {
    async fn list_comments(&self, confession_id: Id) -> RemoteResult<Vec<Comment>> {
        let env: Envelope<Vec<Comment>> =
            Self::fetch(self.request(Method::GET, &format!("/confessions/{confession_id}/comments"))).await?;
        Ok(env.data)
    }
    async fn add_comment(&self, confession_id: Id, new: NewComment) -> RemoteResult<Comment> {
        let rb = self.request(Method::POST, &format!("/confessions/{confession_id}/comments")).json(&new);
        let env: Envelope<Comment> = Self::fetch(rb).await?;
        Ok(env.data)
    }
    async fn delete_comment(&self, confession_id: Id, comment_id: Id) -> RemoteResult<()> {
        Self::ack(self.request(Method::DELETE, &format!("/confessions/{confession_id}/comments/{comment_id}"))).await
    }
}
