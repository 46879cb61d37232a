//! Wiki module
//!
//! The page entity, its flat file storage and the error kinds shared across
//! request handling.

mod error;
pub mod store;

pub use error::{Result, WikiError};
pub use store::PageStore;

/// Title of the placeholder page shown by the new-page form
pub const NEW_PAGE_TITLE: &str = "Title";
/// Body of the placeholder page shown by the new-page form
pub const NEW_PAGE_BODY: &str = "Enter text here...";

/// A wiki page, alive for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
        }
    }

    /// Blank page, used when editing a title that was never saved
    pub fn empty(title: &str) -> Self {
        Self::new(title, Vec::new())
    }

    /// Placeholder shown by the new-page form
    pub fn placeholder() -> Self {
        Self::new(NEW_PAGE_TITLE, NEW_PAGE_BODY)
    }

    /// Body as text for templates; invalid UTF-8 is replaced, not rejected
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
