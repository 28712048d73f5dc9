use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{AppContext, ArticleView, HttpConduitApi};
use shared::domain::{Article, Slug};
use storage::Storage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "conduit", about = "Terminal client for a Conduit blogging API")]
struct Args {
    /// Overrides the configured API base url.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the user locally.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the remembered user.
    Whoami {
        /// Re-read the user from the API with the stored token.
        #[arg(long)]
        refresh: bool,
    },
    /// List articles, optionally filtered by tag.
    Articles {
        #[arg(long, default_value = "")]
        tag: String,
    },
    Article {
        slug: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let api_url = args.api_url.unwrap_or(settings.api_url);
    let api = match settings.request_timeout_secs {
        Some(secs) => HttpConduitApi::with_timeout(&api_url, Duration::from_secs(secs)),
        None => HttpConduitApi::new(&api_url),
    }
    .with_context(|| format!("invalid api url '{api_url}'"))?;

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open local storage at '{database_url}'"))?;

    let context = AppContext::bootstrap(Arc::new(api), Arc::new(storage)).await;
    debug!(%api_url, %database_url, "conduit: context ready");

    match args.command {
        Command::Login { email, password } => {
            let user = context
                .submit_login(&email, &password)
                .await
                .context("login failed")?;
            println!("Logged in as {}", user.username);
        }
        Command::Logout => {
            context.request_logout().await;
            println!("Logged out");
        }
        Command::Whoami { refresh } => {
            let user = if refresh {
                context
                    .revalidate_session()
                    .await
                    .context("failed to refresh the current user")?
            } else {
                context.session().user().await
            };
            match user {
                Some(user) => println!("{} <{}>", user.username, user.email),
                None => println!("Not logged in"),
            }
        }
        Command::Articles { tag } => {
            context
                .feed()
                .set_tag(tag)
                .await
                .context("failed to load articles")?;
            let view = context.feed().current().await;
            let show_favorites = context.feed().favorite_affordance_visible().await;
            print_feed(&view, show_favorites);
        }
        Command::Article { slug } => {
            let article = context
                .articles()
                .load_article(&Slug::from(slug))
                .await
                .context("failed to load article")?;
            print_article(&article);
        }
    }

    Ok(())
}

fn print_feed(view: &ArticleView, show_favorites: bool) {
    if view.tag.is_unfiltered() {
        println!("All articles ({})", view.article_count.unwrap_or_default());
    } else {
        println!(
            "Articles tagged '{}' ({})",
            view.tag,
            view.article_count.unwrap_or_default()
        );
    }
    for article in &view.articles {
        let favorites = if show_favorites {
            let marker = if article.favorited { "♥" } else { "♡" };
            format!(" {marker} {}", article.favorites_count)
        } else {
            String::new()
        };
        println!(
            "  {} - {} by {}{favorites}",
            article.slug, article.title, article.author.username
        );
    }
}

fn print_article(article: &Article) {
    println!("{}", article.title);
    println!(
        "by {} on {}",
        article.author.username,
        article.created_at.format("%Y-%m-%d")
    );
    if !article.tag_list.is_empty() {
        let tags: Vec<&str> = article.tag_list.iter().map(|tag| tag.as_str()).collect();
        println!("tags: {}", tags.join(", "));
    }
    println!();
    println!("{}", article.body);
}
