use super::model::{NewClient, NewPost};
use crate::model::{BrandGuide, Client, Post};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{info, instrument};
use uuid::Uuid;

pub type Pool = SqlitePool;

const CLIENT_COLUMNS: &str =
    "id, owner_id, name, company_name, job_title, linkedin, website, image, brand_guide, created_at";
const POST_COLUMNS: &str = "id, client_id, owner_id, content, image_url, created_at";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let mut options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    if !normalized.starts_with("sqlite::memory") {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }
    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL and create its parent
/// directory. In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{path}?{q}"),
        None => format!("sqlite://{path}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn client_from_row(row: &SqliteRow) -> Result<Client> {
    let guide: String = row.try_get("brand_guide")?;
    let brand_guide: BrandGuide = if guide.trim().is_empty() {
        BrandGuide::default()
    } else {
        serde_json::from_str(&guide).context("stored brand guide is not valid JSON")?
    };
    Ok(Client {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        company_name: row.try_get("company_name")?,
        job_title: row.try_get("job_title")?,
        linkedin: row.try_get("linkedin")?,
        website: row.try_get("website")?,
        image: row.try_get("image")?,
        brand_guide,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        owner_id: row.try_get("owner_id")?,
        content: row.try_get("content")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// Clients belonging to `owner_id`, newest first.
#[instrument(skip_all)]
pub async fn list_clients(pool: &Pool, owner_id: &str) -> Result<Vec<Client>> {
    let rows = sqlx::query(&format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(client_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_client(pool: &Pool, client_id: &str) -> Result<Option<Client>> {
    let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?"))
        .bind(client_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(client_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn create_client(pool: &Pool, new: &NewClient) -> Result<Client> {
    if new.owner_id.trim().is_empty() {
        return Err(anyhow!("client owner must be non-empty"));
    }
    if new.name.trim().is_empty() {
        return Err(anyhow!("client name must be non-empty"));
    }
    let client = Client {
        id: Uuid::new_v4().to_string(),
        owner_id: new.owner_id.trim().to_string(),
        name: new.name.trim().to_string(),
        company_name: new.company_name.clone(),
        job_title: new.job_title.clone(),
        linkedin: new.linkedin.clone(),
        website: new.website.clone(),
        image: new.image.clone(),
        brand_guide: new.brand_guide.clone(),
        created_at: Utc::now(),
    };
    let guide = serde_json::to_string(&client.brand_guide)?;
    sqlx::query(&format!(
        "INSERT INTO clients ({CLIENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&client.id)
    .bind(&client.owner_id)
    .bind(&client.name)
    .bind(&client.company_name)
    .bind(&client.job_title)
    .bind(&client.linkedin)
    .bind(&client.website)
    .bind(&client.image)
    .bind(guide)
    .bind(client.created_at)
    .execute(pool)
    .await?;
    info!(client_id = %client.id, "client created");
    Ok(client)
}

/// Delete a client and its posts. Returns false if no such client exists.
#[instrument(skip_all)]
pub async fn delete_client(pool: &Pool, client_id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let posts = sqlx::query("DELETE FROM posts WHERE client_id = ?")
        .bind(client_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let removed = sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(client_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    if removed > 0 {
        info!(client_id, posts, "client deleted");
    }
    Ok(removed > 0)
}

/// Posts for one client, newest first.
#[instrument(skip_all)]
pub async fn list_posts(pool: &Pool, client_id: &str) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE client_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(post_from_row).collect()
}

/// Posts across every client of `owner_id`, newest first.
#[instrument(skip_all)]
pub async fn list_posts_for_owner(pool: &Pool, owner_id: &str) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(post_from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_post(pool: &Pool, post_id: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?"))
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(post_from_row).transpose()
}

#[instrument(skip_all)]
pub async fn create_post(pool: &Pool, new: &NewPost) -> Result<Post> {
    if new.content.trim().is_empty() {
        return Err(anyhow!("post content must be non-empty"));
    }
    let owner_id: Option<String> = sqlx::query_scalar("SELECT owner_id FROM clients WHERE id = ?")
        .bind(&new.client_id)
        .fetch_optional(pool)
        .await?;
    let Some(owner_id) = owner_id else {
        return Err(anyhow!("client {} not found", new.client_id));
    };
    let post = Post {
        id: Uuid::new_v4().to_string(),
        client_id: new.client_id.clone(),
        owner_id,
        content: new.content.clone(),
        image_url: None,
        created_at: Utc::now(),
    };
    sqlx::query(&format!(
        "INSERT INTO posts ({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
    ))
    .bind(&post.id)
    .bind(&post.client_id)
    .bind(&post.owner_id)
    .bind(&post.content)
    .bind(&post.image_url)
    .bind(post.created_at)
    .execute(pool)
    .await?;
    Ok(post)
}

/// Record the chosen image on a post. Returns false if the post is missing.
#[instrument(skip_all)]
pub async fn set_post_image(pool: &Pool, post_id: &str, image_url: &str) -> Result<bool> {
    let updated = sqlx::query("UPDATE posts SET image_url = ? WHERE id = ?")
        .bind(image_url)
        .bind(post_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(updated > 0)
}

#[instrument(skip_all)]
pub async fn delete_post(pool: &Pool, post_id: &str) -> Result<bool> {
    let removed = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(removed > 0)
}
