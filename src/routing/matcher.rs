//! Route matching module
//!
//! Implements the ordered route table and the page title grammar.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;

use crate::wiki::{Result, WikiError};

/// Wiki operations a request path can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    View,
    NewPage,
    Edit,
    Save,
    Create,
    Home,
}

impl Route {
    /// Operation name used in trace lines
    pub const fn name(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::NewPage => "new",
            Self::Edit => "edit",
            Self::Save => "save",
            Self::Create => "create",
            Self::Home => "home",
        }
    }

    /// Routes that write a page from form fields
    pub const fn writes_page(self) -> bool {
        matches!(self, Self::Save | Self::Create)
    }
}

/// Path matching condition
#[derive(Debug, Clone, Copy)]
enum RouteMatch {
    /// Exact path match
    Path(&'static str),
    /// Path prefix match (e.g., "/view/" matches "/view/Foo")
    Prefix(&'static str),
}

impl RouteMatch {
    fn matches(self, path: &str) -> bool {
        match self {
            Self::Path(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix),
        }
    }
}

/// Registered routes, evaluated in order. `/edit/new` sits before `/edit/`
/// so the new-page form wins over editing a page called "new".
const ROUTES: &[(RouteMatch, Route)] = &[
    (RouteMatch::Prefix("/view/"), Route::View),
    (RouteMatch::Path("/edit/new"), Route::NewPage),
    (RouteMatch::Prefix("/edit/"), Route::Edit),
    (RouteMatch::Prefix("/save/"), Route::Save),
    (RouteMatch::Prefix("/create/"), Route::Create),
    (RouteMatch::Path("/"), Route::Home),
];

/// Find the first registered route matching the path
pub fn match_route(path: &str) -> Option<Route> {
    ROUTES
        .iter()
        .find(|(rule, _)| rule.matches(path))
        .map(|(_, route)| *route)
}

/// Percent-decode a request path before matching.
/// `None` when the decoded bytes are not UTF-8.
pub fn decode_path(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

fn valid_path() -> &'static Regex {
    static VALID_PATH: OnceLock<Regex> = OnceLock::new();
    VALID_PATH.get_or_init(|| {
        Regex::new(r"^/(edit|save|view)/([a-zA-Z0-9]+)$").expect("valid path pattern")
    })
}

/// Extract the page title from a `/(view|edit|save)/<title>` path
pub fn extract_title(path: &str) -> Result<&str> {
    valid_path()
        .captures(path)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .ok_or_else(|| WikiError::InvalidPath(path.to_string()))
}

/// Check a title supplied outside the path against the same character rule
pub fn is_valid_title(title: &str) -> bool {
    !title.is_empty() && title.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_route_prefixes() {
        assert_eq!(match_route("/view/Foo"), Some(Route::View));
        assert_eq!(match_route("/edit/Foo"), Some(Route::Edit));
        assert_eq!(match_route("/save/Foo"), Some(Route::Save));
        assert_eq!(match_route("/create/"), Some(Route::Create));
        assert_eq!(match_route("/"), Some(Route::Home));
    }

    #[test]
    fn test_match_route_new_page_is_exact() {
        assert_eq!(match_route("/edit/new"), Some(Route::NewPage));
        assert_eq!(match_route("/edit/newspaper"), Some(Route::Edit));
        assert_eq!(match_route("/edit/new/"), Some(Route::Edit));
    }

    #[test]
    fn test_match_route_unknown() {
        assert_eq!(match_route("/unknown/path"), None);
        assert_eq!(match_route("/view"), None);
        assert_eq!(match_route(""), None);
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("/view/Foo1").unwrap(), "Foo1");
        assert_eq!(extract_title("/edit/abcXYZ09").unwrap(), "abcXYZ09");
        assert_eq!(extract_title("/save/Welcome").unwrap(), "Welcome");
    }

    #[test]
    fn test_extract_title_rejects_bad_paths() {
        for path in [
            "/view/../etc",
            "/view/",
            "/view/Foo/Bar",
            "/view/Foo.txt",
            "/view/Foo Bar",
            "/create/Foo",
            "/view/Foo%2F",
            "view/Foo",
        ] {
            let err = extract_title(path).unwrap_err();
            assert!(
                matches!(err, WikiError::InvalidPath(ref p) if p == path),
                "expected InvalidPath for {path}"
            );
        }
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/view/%46oo").as_deref(), Some("/view/Foo"));
        assert_eq!(decode_path("/view/Plain").as_deref(), Some("/view/Plain"));
        assert_eq!(decode_path("/view/%FF"), None);

        // Encoded separators decode into real ones and fail the title grammar
        let decoded = decode_path("/view/a%2F..%2Fb").unwrap();
        assert_eq!(decoded, "/view/a/../b");
        assert!(extract_title(&decoded).is_err());
    }

    #[test]
    fn test_writes_page() {
        assert!(Route::Save.writes_page());
        assert!(Route::Create.writes_page());
        assert!(!Route::View.writes_page());
        assert!(!Route::Edit.writes_page());
    }

    #[test]
    fn test_is_valid_title() {
        assert!(is_valid_title("Test"));
        assert!(is_valid_title("a1"));
        assert!(!is_valid_title(""));
        assert!(!is_valid_title("../etc"));
        assert!(!is_valid_title("two words"));
        assert!(!is_valid_title("Ünïcode"));
    }
}
