//! Page store module
//!
//! Title-addressed flat file storage: one file per page holding the raw body bytes.
//!
//! The store trusts its callers. Titles are joined into the file path without
//! escaping, so only titles that passed the router's validation may reach it.
//! There is no locking either: two concurrent saves of the same title race and
//! the file ends up with whichever write finished last.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::{Result, WikiError};
use super::Page;

pub struct PageStore {
    data_dir: PathBuf,
    extension: String,
}

impl PageStore {
    pub fn new(data_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            extension: extension.to_string(),
        }
    }

    /// Create the data directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    /// Storage location for a title: `<data_dir>/<title><extension>`
    pub fn page_path(&self, title: &str) -> PathBuf {
        self.data_dir.join(format!("{title}{}", self.extension))
    }

    /// Write the page body, replacing any previous content
    pub async fn save(&self, page: &Page) -> Result<()> {
        let path = self.page_path(&page.title);
        write_private(&path, &page.body).await?;
        Ok(())
    }

    /// Load a page, `NotFound` when nothing was ever saved under the title
    pub async fn load(&self, title: &str) -> Result<Page> {
        match fs::read(self.page_path(title)).await {
            Ok(body) => Ok(Page::new(title, body)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(WikiError::NotFound(title.to_string()))
            }
            Err(e) => Err(WikiError::Io(e)),
        }
    }
}

#[cfg(unix)]
async fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(body).await?;
    file.flush().await
}

#[cfg(not(unix))]
async fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    fs::write(path, body).await
}
