//! Request handler module
//!
//! Responsible for request routing dispatch and the wiki operations:
//! view, edit, save, create, the new-page form and the home page.

pub mod pages;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
