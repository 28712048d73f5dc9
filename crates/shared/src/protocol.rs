use serde::{Deserialize, Serialize};

use crate::domain::{Article, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user: LoginCredentials,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: LoginCredentials {
                email: email.into(),
                password: password.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    #[serde(default, rename = "articleCount", alias = "articlesCount")]
    pub article_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleEnvelope {
    pub article: Article,
}
