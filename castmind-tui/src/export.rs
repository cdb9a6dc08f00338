//! Writes rendered excerpt documents to the export directory.

use castmind_client::template;
use castmind_client::types::Article;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No article selected")]
    NothingSelected,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `document` for `article` into `dir`, creating it if needed.
/// Returns the written path. An existing file is overwritten.
pub fn write_document(
    dir: &Path,
    article: &Article,
    template_id: &str,
    document: &str,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(template::export_file_name(article, template_id));
    std::fs::write(&path, document)?;
    tracing::info!(path = %path.display(), article_id = article.id, "exported document");
    Ok(path)
}
