// Wiki error module
// Error kinds shared by the page store, router and renderer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WikiError {
    /// Request path does not match the route grammar
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Title supplied through a form is not a valid page title
    #[error("invalid page title: '{0}'")]
    InvalidTitle(String),

    /// No stored page for the title
    #[error("page not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("render failed: {0}")]
    Render(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, WikiError>;
