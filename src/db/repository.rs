use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{Article, Polarity, Sentiment, Timestamp};

use super::schema::SCHEMA;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Deduplicated article store keyed by source URL.
///
/// All calls run on the single `tokio-rusqlite` connection thread, one at a
/// time, so concurrent upserts for the same URL are serialized and the last
/// one to reach the thread wins.
pub struct ArticleStore {
    conn: Connection,
    op_timeout: Duration,
}

impl ArticleStore {
    /// Open (or create) the database and apply the schema. Failure here is
    /// fatal: no other operation can be served without the table.
    pub async fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Bound every subsequent storage call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    async fn call<F, R>(&self, op: &'static str, function: F) -> Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        // On expiry the closure may still run to completion on the connection
        // thread; the caller only stops waiting for it.
        match tokio::time::timeout(self.op_timeout, self.conn.call(function)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Timeout(format!(
                "storage {op} exceeded {:?}",
                self.op_timeout
            ))),
        }
    }

    /// Run raw SQL against the store, for tests that need to break it.
    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
        self.call("execute_batch", move |conn| {
            conn.execute_batch(sql)?;
            Ok(())
        })
        .await
    }

    pub async fn try_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        self.call("exists", move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM articles WHERE url = ?1",
                    params![url],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Dedup check. A storage failure is logged and reported as "already
    /// stored". The pipeline uses [`Self::try_exists`] to count such failures.
    #[cfg(test)]
    pub async fn exists(&self, url: &str) -> bool {
        match self.try_exists(url).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url, error = %e, "dedup check failed, treating article as not new");
                true
            }
        }
    }

    /// Insert a new article, or on URL conflict overwrite only its sentiment.
    pub async fn upsert(&self, article: Article) -> Result<()> {
        self.call("upsert", move |conn| {
            conn.execute(
                r#"INSERT INTO articles (url, headline, source_country, timestamp, sentiment_label, sentiment_confidence)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                   ON CONFLICT(url) DO UPDATE SET
                       sentiment_label = excluded.sentiment_label,
                       sentiment_confidence = excluded.sentiment_confidence"#,
                params![
                    article.url,
                    article.headline,
                    article.source_country,
                    article.timestamp,
                    article.sentiment.label.map(|label| label.as_str()),
                    article.sentiment.confidence,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.call("count", |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }

    /// Newest `min_count` articles from the last `hours`, backfilled with the
    /// newest older articles when the window alone is too thin.
    pub async fn get_window(&self, min_count: usize, hours: u32) -> Result<Vec<Article>> {
        self.get_window_at(Utc::now(), min_count, hours).await
    }

    pub async fn get_window_at(
        &self,
        now: DateTime<Utc>,
        min_count: usize,
        hours: u32,
    ) -> Result<Vec<Article>> {
        // An offset past the representable range opens the window to every row.
        let start = TimeDelta::try_hours(i64::from(hours))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let window_start = Timestamp::from_datetime(start);
        let limit = i64::try_from(min_count).unwrap_or(i64::MAX);

        self.call("get_window", move |conn| {
            let tx = conn.transaction()?;

            let mut articles = select_articles(
                &tx,
                r#"SELECT url, headline, source_country, timestamp, sentiment_label, sentiment_confidence
                   FROM articles
                   WHERE timestamp >= ?1
                   ORDER BY timestamp DESC, url ASC
                   LIMIT ?2"#,
                params![window_start, limit],
            )?;

            if articles.len() < min_count {
                let needed = i64::try_from(min_count - articles.len()).unwrap_or(i64::MAX);
                // Everything older than the window start is disjoint from the
                // windowed rows, so no URL can appear twice.
                let backfill = select_articles(
                    &tx,
                    r#"SELECT url, headline, source_country, timestamp, sentiment_label, sentiment_confidence
                       FROM articles
                       WHERE timestamp < ?1
                       ORDER BY timestamp DESC, url ASC
                       LIMIT ?2"#,
                    params![window_start, needed],
                )?;
                articles.extend(backfill);
            }

            tx.commit()?;
            Ok(articles)
        })
        .await
    }
}

fn select_articles(
    conn: &rusqlite::Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Article>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, article_from_row)?;
    rows.collect()
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    let label: Option<String> = row.get(4)?;
    let label = match label {
        Some(raw) => match raw.parse::<Polarity>() {
            Ok(label) => Some(label),
            Err(e) => {
                tracing::warn!(label = %raw, error = %e, "ignoring unknown sentiment label");
                None
            }
        },
        None => None,
    };

    Ok(Article {
        url: row.get(0)?,
        headline: row.get(1)?,
        source_country: row.get(2)?,
        timestamp: row.get(3)?,
        sentiment: Sentiment {
            label,
            confidence: if label.is_some() { row.get(5)? } else { None },
        },
    })
}
