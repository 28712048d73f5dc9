use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Article, Slug, Tag, User},
    error::ApiException,
    protocol::{ArticleEnvelope, ArticleListResponse, LoginRequest, UserEnvelope},
};
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "https://api.realworld.io/api";

/// Remote operations the stores depend on.
#[async_trait]
pub trait ConduitApi: Send + Sync {
    async fn list_articles(&self, tag: &Tag) -> ClientResult<ArticleListResponse>;
    async fn get_article(&self, slug: &Slug) -> ClientResult<Article>;
    async fn login(&self, email: &str, password: &str) -> ClientResult<User>;
    async fn current_user(&self, token: &str) -> ClientResult<User>;
}

pub struct HttpConduitApi {
    http: Client,
    base_url: Url,
}

impl HttpConduitApi {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> ClientResult<Self> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
        auth_endpoint: bool,
    ) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, context, "api: response received");

        if !status.is_success() {
            let exception = ApiException::from_body(status.as_u16(), &body);
            return Err(if auth_endpoint || is_auth_status(status) {
                ClientError::Auth {
                    status: exception.status,
                    message: exception.message,
                }
            } else {
                ClientError::Status {
                    status: exception.status,
                    message: exception.message,
                }
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::decode(context, e))
    }
}

#[async_trait]
impl ConduitApi for HttpConduitApi {
    async fn list_articles(&self, tag: &Tag) -> ClientResult<ArticleListResponse> {
        let mut url = self.endpoint("articles")?;
        if !tag.is_unfiltered() {
            url.query_pairs_mut().append_pair("tag", tag.as_str());
        }
        self.read(self.http.get(url), "article list", false).await
    }

    async fn get_article(&self, slug: &Slug) -> ClientResult<Article> {
        let mut url = self.endpoint("articles")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(slug.as_str());
        let envelope: ArticleEnvelope = self.read(self.http.get(url), "article", false).await?;
        Ok(envelope.article)
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let url = self.endpoint("users/login")?;
        let envelope: UserEnvelope = self
            .read(
                self.http.post(url).json(&LoginRequest::new(email, password)),
                "login",
                true,
            )
            .await?;
        Ok(envelope.user)
    }

    async fn current_user(&self, token: &str) -> ClientResult<User> {
        let url = self.endpoint("user")?;
        let envelope: UserEnvelope = self
            .read(self.http.get(url).bearer_auth(token), "current user", false)
            .await?;
        Ok(envelope.user)
    }
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// `Url::join` drops the last path segment unless it ends with `/`.
fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
