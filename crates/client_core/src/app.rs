use std::sync::Arc;

use shared::domain::User;
use storage::LocalStore;
use tracing::{info, warn};

use crate::{
    api::ConduitApi,
    article_cache::ArticleCache,
    error::ClientResult,
    feed::ArticleFeed,
    session::SessionStore,
};

/// Owns every store a front end talks to.
pub struct AppContext {
    api: Arc<dyn ConduitApi>,
    session: Arc<SessionStore>,
    articles: Arc<ArticleCache>,
    feed: ArticleFeed,
}

impl AppContext {
    pub fn new(api: Arc<dyn ConduitApi>, storage: Arc<dyn LocalStore>) -> Self {
        let session = Arc::new(SessionStore::new(storage));
        let articles = Arc::new(ArticleCache::new(api.clone()));
        let feed = ArticleFeed::new(articles.clone(), session.clone());
        Self {
            api,
            session,
            articles,
            feed,
        }
    }

    /// Builds the context and restores any saved session.
    pub async fn bootstrap(api: Arc<dyn ConduitApi>, storage: Arc<dyn LocalStore>) -> Self {
        let context = Self::new(api, storage);
        context.rehydrate().await;
        context
    }

    pub async fn rehydrate(&self) -> bool {
        self.session.rehydrate().await
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn articles(&self) -> &Arc<ArticleCache> {
        &self.articles
    }

    pub fn feed(&self) -> &ArticleFeed {
        &self.feed
    }

    /// Authenticates and, only on success, logs the session in.
    pub async fn submit_login(&self, email: &str, password: &str) -> ClientResult<User> {
        let user = self.api.login(email, password).await?;
        info!(username = %user.username, "auth: login accepted");
        self.session.login(user.clone()).await;
        Ok(user)
    }

    pub async fn request_logout(&self) {
        self.session.logout().await;
        info!("auth: logged out");
    }

    /// Re-reads the current user with the stored token.
    ///
    /// A rejected token logs the session out; other failures leave it as is.
    pub async fn revalidate_session(&self) -> ClientResult<Option<User>> {
        let Some(current) = self.session.user().await else {
            return Ok(None);
        };

        match self.api.current_user(&current.token).await {
            Ok(user) => {
                self.session.login(user.clone()).await;
                Ok(Some(user))
            }
            Err(err) if err.is_auth() => {
                warn!("auth: stored token rejected, logging out: {err}");
                self.session.logout().await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
