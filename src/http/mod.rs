//! HTTP protocol layer module
//!
//! Response builders and request form decoding, kept apart from the wiki
//! handlers so they can be tested without a socket.

pub mod form;
pub mod response;

// Re-export commonly used types
pub use form::{decode_form, read_body, BodyError, FormData, FormError};
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_415_response, build_500_response, build_html_response, build_redirect_response,
};
