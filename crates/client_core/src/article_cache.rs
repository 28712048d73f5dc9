use std::{collections::HashMap, sync::Arc};

use shared::domain::{Article, Slug, Tag};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::{
    api::ConduitApi,
    error::{ClientResult, ErrorKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(ErrorKind),
}

impl FetchStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// What a front end renders for one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleView {
    pub tag: Tag,
    pub articles: Vec<Article>,
    pub article_count: Option<u64>,
    pub is_provisional: bool,
    pub status: FetchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    ArticlesLoading { tag: Tag, seeded: bool },
    ArticlesUpdated { tag: Tag },
    ArticlesFailed { tag: Tag, kind: ErrorKind },
    ArticleUpdated { slug: Slug },
    ArticleFailed { slug: Slug, kind: ErrorKind },
}

#[derive(Debug, Default)]
struct ListEntry {
    data: Option<Vec<Article>>,
    article_count: Option<u64>,
    provisional: Option<Vec<Article>>,
    status: FetchStatus,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct DetailEntry {
    article: Option<Article>,
    provisional: Option<Article>,
    status: FetchStatus,
    in_flight: usize,
}

/// Counts one load out; `true` once nothing else is pending.
fn settle(in_flight: &mut usize) -> bool {
    *in_flight = in_flight.saturating_sub(1);
    *in_flight == 0
}

#[derive(Default)]
struct CacheState {
    lists: HashMap<Tag, ListEntry>,
    details: HashMap<Slug, DetailEntry>,
}

impl CacheState {
    fn unfiltered(&self) -> Option<&Vec<Article>> {
        self.lists
            .get(&Tag::unfiltered())
            .and_then(|entry| entry.data.as_ref())
    }

    fn unfiltered_article(&self, slug: &Slug) -> Option<&Article> {
        self.unfiltered()?
            .iter()
            .find(|article| &article.slug == slug)
    }
}

/// Tag-keyed article lists plus slug-keyed article details.
///
/// Entries grow without bound. Overlapping loads are not cancelled: each
/// completion is applied to its own entry as it arrives, so for a single
/// tag the last request to complete wins. An entry stays `Loading` until
/// every load started for it has completed.
pub struct ArticleCache {
    api: Arc<dyn ConduitApi>,
    state: RwLock<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

impl ArticleCache {
    pub fn new(api: Arc<dyn ConduitApi>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            state: RwLock::new(CacheState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub async fn load_articles(&self, tag: &Tag) -> ClientResult<Vec<Article>> {
        let seeded = self.begin_list_load(tag).await;
        let _ = self.events.send(CacheEvent::ArticlesLoading {
            tag: tag.clone(),
            seeded,
        });

        match self.api.list_articles(tag).await {
            Ok(response) => {
                {
                    let mut state = self.state.write().await;
                    let entry = state.lists.entry(tag.clone()).or_default();
                    entry.data = Some(response.articles.clone());
                    entry.article_count = Some(response.article_count);
                    entry.provisional = None;
                    if settle(&mut entry.in_flight) {
                        entry.status = FetchStatus::Ready;
                    }
                }
                info!(
                    "articles: tag={:?} loaded {} article(s)",
                    tag.as_str(),
                    response.articles.len()
                );
                let _ = self
                    .events
                    .send(CacheEvent::ArticlesUpdated { tag: tag.clone() });
                Ok(response.articles)
            }
            Err(err) => {
                let kind = err.kind();
                {
                    let mut state = self.state.write().await;
                    let entry = state.lists.entry(tag.clone()).or_default();
                    if settle(&mut entry.in_flight) {
                        entry.provisional = None;
                        entry.status = FetchStatus::Failed(kind);
                    }
                }
                warn!("articles: tag={:?} load failed: {err}", tag.as_str());
                let _ = self.events.send(CacheEvent::ArticlesFailed {
                    tag: tag.clone(),
                    kind,
                });
                Err(err)
            }
        }
    }

    pub async fn load_article(&self, slug: &Slug) -> ClientResult<Article> {
        {
            let mut state = self.state.write().await;
            let seed = state.unfiltered_article(slug).cloned();
            let entry = state.details.entry(slug.clone()).or_default();
            entry.status = FetchStatus::Loading;
            entry.in_flight += 1;
            if entry.article.is_none() {
                entry.provisional = seed;
            }
        }

        match self.api.get_article(slug).await {
            Ok(article) => {
                {
                    let mut state = self.state.write().await;
                    let entry = state.details.entry(slug.clone()).or_default();
                    entry.article = Some(article.clone());
                    entry.provisional = None;
                    if settle(&mut entry.in_flight) {
                        entry.status = FetchStatus::Ready;
                    }
                }
                debug!("articles: slug={slug} loaded");
                let _ = self
                    .events
                    .send(CacheEvent::ArticleUpdated { slug: slug.clone() });
                Ok(article)
            }
            Err(err) => {
                let kind = err.kind();
                {
                    let mut state = self.state.write().await;
                    let entry = state.details.entry(slug.clone()).or_default();
                    if settle(&mut entry.in_flight) {
                        entry.provisional = None;
                        entry.status = FetchStatus::Failed(kind);
                    }
                }
                warn!("articles: slug={slug} load failed: {err}");
                let _ = self.events.send(CacheEvent::ArticleFailed {
                    slug: slug.clone(),
                    kind,
                });
                Err(err)
            }
        }
    }

    /// Confirmed data for `tag`; provisional lists are never returned here.
    pub async fn articles(&self, tag: &Tag) -> Option<Vec<Article>> {
        self.state
            .read()
            .await
            .lists
            .get(tag)
            .and_then(|entry| entry.data.clone())
    }

    pub async fn view(&self, tag: &Tag) -> ArticleView {
        let state = self.state.read().await;
        let Some(entry) = state.lists.get(tag) else {
            return ArticleView {
                tag: tag.clone(),
                articles: Vec::new(),
                article_count: None,
                is_provisional: false,
                status: FetchStatus::Idle,
            };
        };

        let (articles, is_provisional) = match (&entry.data, &entry.provisional) {
            (Some(data), _) => (data.clone(), false),
            (None, Some(provisional)) => (provisional.clone(), true),
            (None, None) => (Vec::new(), false),
        };
        ArticleView {
            tag: tag.clone(),
            articles,
            article_count: entry.article_count,
            is_provisional,
            status: entry.status,
        }
    }

    pub async fn status(&self, tag: &Tag) -> FetchStatus {
        self.state
            .read()
            .await
            .lists
            .get(tag)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    /// Detail entry for `slug`, else its seed, else the unfiltered list copy.
    pub async fn article(&self, slug: &Slug) -> Option<Article> {
        let state = self.state.read().await;
        if let Some(entry) = state.details.get(slug) {
            if let Some(article) = entry.article.as_ref().or(entry.provisional.as_ref()) {
                return Some(article.clone());
            }
        }
        state.unfiltered_article(slug).cloned()
    }

    pub async fn article_status(&self, slug: &Slug) -> FetchStatus {
        self.state
            .read()
            .await
            .details
            .get(slug)
            .map(|entry| entry.status)
            .unwrap_or_default()
    }

    pub async fn invalidate(&self, tag: &Tag) {
        if self.state.write().await.lists.remove(tag).is_some() {
            debug!("articles: tag={:?} invalidated", tag.as_str());
        }
    }

    /// Marks the entry loading and seeds it from the unfiltered list when it
    /// has nothing confirmed yet and at least one unfiltered article carries
    /// the tag. Returns whether a seed was installed.
    async fn begin_list_load(&self, tag: &Tag) -> bool {
        let mut state = self.state.write().await;
        let seed = if tag.is_unfiltered() {
            None
        } else {
            state.unfiltered().map(|articles| {
                articles
                    .iter()
                    .filter(|article| article.has_tag(tag))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|seed| !seed.is_empty())
        };

        let entry = state.lists.entry(tag.clone()).or_default();
        entry.status = FetchStatus::Loading;
        entry.in_flight += 1;
        if entry.data.is_some() {
            return false;
        }
        entry.provisional = seed;
        entry.provisional.is_some()
    }
}

#[cfg(test)]
#[path = "tests/article_cache_tests.rs"]
mod tests;
