pub mod api;
pub mod app;
pub mod article_cache;
pub mod error;
pub mod feed;
pub mod session;

pub use api::{ConduitApi, HttpConduitApi, DEFAULT_API_URL};
pub use app::AppContext;
pub use article_cache::{ArticleCache, ArticleView, CacheEvent, FetchStatus};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use feed::ArticleFeed;
pub use session::{Session, SessionAction, SessionEvent, SessionStore, USER_STORAGE_KEY};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
