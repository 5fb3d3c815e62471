use std::path::{Path, PathBuf};

use crate::db::ArticleStore;
use crate::error::Result;
use crate::models::Article;

pub fn render(articles: &[Article]) -> Result<String> {
    Ok(serde_json::to_string_pretty(articles)?)
}

/// Write the articles as a pretty JSON array, replacing `path` atomically.
pub fn write_json(path: &Path, articles: &[Article]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut content = render(articles)?;
    content.push('\n');

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read the current window from the store and write it to `path`, or to
/// stdout when `path` is `None`. Returns the number of articles exported.
pub async fn export_window(
    store: &ArticleStore,
    min_count: usize,
    hours: u32,
    path: Option<&Path>,
) -> Result<usize> {
    let articles = store.get_window(min_count, hours).await?;

    match path {
        Some(path) => {
            write_json(path, &articles)?;
            tracing::info!(count = articles.len(), path = %path.display(), "exported articles");
        }
        None => println!("{}", render(&articles)?),
    }

    Ok(articles.len())
}
