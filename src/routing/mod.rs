//! Routing module
//!
//! Provides the wiki's route table and title validation:
//! - Percent-decoding of request paths
//! - Ordered route matching on exact paths and path prefixes
//! - Title extraction against the `/(view|edit|save)/<title>` grammar

mod matcher;

pub use matcher::{decode_path, extract_title, is_valid_title, match_route, Route};
