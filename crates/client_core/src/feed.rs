use std::sync::Arc;

use shared::domain::{Article, Tag};
use tokio::sync::RwLock;

use crate::{
    article_cache::{ArticleCache, ArticleView},
    error::ClientResult,
    session::SessionStore,
};

/// The home-page article list: one active tag over the shared cache.
///
/// Results for a tag that is no longer active still land in that tag's
/// cache entry, but [`ArticleFeed::current`] only ever reads the active tag.
pub struct ArticleFeed {
    cache: Arc<ArticleCache>,
    session: Arc<SessionStore>,
    active_tag: RwLock<Tag>,
}

impl ArticleFeed {
    pub fn new(cache: Arc<ArticleCache>, session: Arc<SessionStore>) -> Self {
        Self {
            cache,
            session,
            active_tag: RwLock::new(Tag::unfiltered()),
        }
    }

    pub async fn active_tag(&self) -> Tag {
        self.active_tag.read().await.clone()
    }

    pub async fn set_tag(&self, tag: impl Into<Tag>) -> ClientResult<Vec<Article>> {
        let tag = tag.into();
        *self.active_tag.write().await = tag.clone();
        self.cache.load_articles(&tag).await
    }

    pub async fn refresh(&self) -> ClientResult<Vec<Article>> {
        let tag = self.active_tag().await;
        self.cache.load_articles(&tag).await
    }

    pub async fn current(&self) -> ArticleView {
        let tag = self.active_tag().await;
        self.cache.view(&tag).await
    }

    pub async fn favorite_affordance_visible(&self) -> bool {
        self.session.is_logged_in().await
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
