use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{Article, Author, Slug, Tag, User},
    protocol::ArticleListResponse,
};
use tokio::{net::TcpListener, sync::oneshot};

use crate::{
    api::ConduitApi,
    error::{ClientError, ClientResult},
};

pub(crate) const VALID_PASSWORD: &str = "secret";
pub(crate) const VALID_TOKEN: &str = "jwt-token";

pub(crate) fn user(username: &str) -> User {
    User {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        bio: Some("bio".to_string()),
        image: Some("image".to_string()),
        token: VALID_TOKEN.to_string(),
    }
}

pub(crate) fn article(slug: &str, tags: &[&str]) -> Article {
    Article {
        slug: Slug::from(slug),
        title: format!("This is the title of {slug}"),
        description: "This is an article description that summarizes the article body."
            .to_string(),
        body: "This is the article body containing the entire article text.".to_string(),
        tag_list: tags.iter().map(|tag| Tag::from(*tag)).collect(),
        created_at: "2023-06-26T06:06:10.816Z".parse().expect("timestamp"),
        updated_at: "2023-06-26T06:06:10.816Z".parse().expect("timestamp"),
        favorited: false,
        favorites_count: 124,
        author: Author {
            username: "coolBanana".to_string(),
            bio: Some("Likes apples".to_string()),
            image: Some("image".to_string()),
            following: false,
        },
    }
}

pub(crate) fn list(articles: Vec<Article>) -> ArticleListResponse {
    ArticleListResponse {
        article_count: articles.len() as u64,
        articles,
    }
}

pub(crate) enum Scripted<T> {
    Ready(T),
    Gated(T, oneshot::Receiver<()>),
    Decode,
    Status(u16),
    Auth(u16),
}

impl<T> Scripted<T> {
    async fn resolve(next: Option<Self>, context: &str) -> ClientResult<T> {
        match next {
            None => Err(ClientError::Status {
                status: 404,
                message: format!("no scripted response for {context}"),
            }),
            Some(Self::Ready(value)) => Ok(value),
            Some(Self::Gated(value, gate)) => {
                let _ = gate.await;
                Ok(value)
            }
            Some(Self::Decode) => Err(ClientError::decode(
                context,
                serde_json::from_str::<Value>("{not json").expect_err("malformed"),
            )),
            Some(Self::Status(status)) => Err(ClientError::Status {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Self::Auth(status)) => Err(ClientError::Auth {
                status,
                message: "email or password is invalid".to_string(),
            }),
        }
    }
}

/// In-process [`ConduitApi`] replaying queued outcomes per key.
#[derive(Default)]
pub(crate) struct ScriptedApi {
    lists: Mutex<HashMap<Tag, VecDeque<Scripted<ArticleListResponse>>>>,
    details: Mutex<HashMap<Slug, VecDeque<Scripted<Article>>>>,
    logins: Mutex<VecDeque<Scripted<User>>>,
    current_users: Mutex<VecDeque<Scripted<User>>>,
    pub(crate) list_calls: Mutex<Vec<Tag>>,
    pub(crate) article_calls: Mutex<Vec<Slug>>,
    pub(crate) tokens_seen: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub(crate) fn push_list(&self, tag: &str, outcome: Scripted<ArticleListResponse>) {
        self.lists
            .lock()
            .expect("lists")
            .entry(Tag::from(tag))
            .or_default()
            .push_back(outcome);
    }

    /// Queues a list response released by the returned sender.
    pub(crate) fn push_gated_list(
        &self,
        tag: &str,
        response: ArticleListResponse,
    ) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.push_list(tag, Scripted::Gated(response, gate));
        release
    }

    pub(crate) fn push_article(&self, slug: &str, outcome: Scripted<Article>) {
        self.details
            .lock()
            .expect("details")
            .entry(Slug::from(slug))
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn push_login(&self, outcome: Scripted<User>) {
        self.logins.lock().expect("logins").push_back(outcome);
    }

    pub(crate) fn push_current_user(&self, outcome: Scripted<User>) {
        self.current_users
            .lock()
            .expect("current users")
            .push_back(outcome);
    }
}

#[async_trait]
impl ConduitApi for ScriptedApi {
    async fn list_articles(&self, tag: &Tag) -> ClientResult<ArticleListResponse> {
        self.list_calls.lock().expect("calls").push(tag.clone());
        let next = self
            .lists
            .lock()
            .expect("lists")
            .get_mut(tag)
            .and_then(VecDeque::pop_front);
        Scripted::resolve(next, "article list").await
    }

    async fn get_article(&self, slug: &Slug) -> ClientResult<Article> {
        self.article_calls
            .lock()
            .expect("calls")
            .push(slug.clone());
        let next = self
            .details
            .lock()
            .expect("details")
            .get_mut(slug)
            .and_then(VecDeque::pop_front);
        Scripted::resolve(next, "article").await
    }

    async fn login(&self, _email: &str, _password: &str) -> ClientResult<User> {
        let next = self.logins.lock().expect("logins").pop_front();
        Scripted::resolve(next, "login").await
    }

    async fn current_user(&self, token: &str) -> ClientResult<User> {
        self.tokens_seen
            .lock()
            .expect("tokens")
            .push(token.to_string());
        let next = self.current_users.lock().expect("current users").pop_front();
        Scripted::resolve(next, "current user").await
    }
}

#[derive(Clone, Default)]
pub(crate) struct ConduitServerState {
    pub(crate) article_queries: Arc<tokio::sync::Mutex<Vec<Option<String>>>>,
    pub(crate) login_bodies: Arc<tokio::sync::Mutex<Vec<Value>>>,
}

async fn handle_list_articles(
    State(state): State<ConduitServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let tag = query.get("tag").cloned();
    state.article_queries.lock().await.push(tag.clone());

    match tag.as_deref() {
        None => Json(list(vec![
            article("article-1", &["rerum", "Tag 1"]),
            article("article-2", &["Tag 2"]),
        ]))
        .into_response(),
        Some("rerum") => Json(list(vec![article("article-1", &["rerum", "Tag 1"])])).into_response(),
        Some("broken") => Json(json!({ "articles": "not-a-list" })).into_response(),
        Some("down") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "errors": { "body": ["database unavailable"] } })),
        )
            .into_response(),
        Some(_) => Json(list(Vec::new())).into_response(),
    }
}

async fn handle_get_article(Path(slug): Path<String>) -> Response {
    if slug == "article-1" {
        return Json(json!({ "article": article("article-1", &["rerum"]) })).into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "errors": { "article": ["not found"] } })),
    )
        .into_response()
}

async fn handle_login(
    State(state): State<ConduitServerState>,
    Json(body): Json<Value>,
) -> Response {
    state.login_bodies.lock().await.push(body.clone());
    if body["user"]["password"] == VALID_PASSWORD {
        return Json(json!({ "user": user("jake") })).into_response();
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": { "email or password": ["is invalid"] } })),
    )
        .into_response()
}

async fn handle_current_user(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {VALID_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if authorized {
        return Json(json!({ "user": user("jake") })).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "errors": { "token": ["is missing"] } })),
    )
        .into_response()
}

/// Serves a minimal Conduit API under `/api` and returns its base url.
pub(crate) async fn spawn_conduit_server() -> Result<(String, ConduitServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ConduitServerState::default();
    let app = Router::new()
        .route("/api/articles", get(handle_list_articles))
        .route("/api/articles/:slug", get(handle_get_article))
        .route("/api/users/login", post(handle_login))
        .route("/api/user", get(handle_current_user))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), state))
}

/// A base url nobody listens on.
pub(crate) async fn unreachable_api_url() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api"))
}
