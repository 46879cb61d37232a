//! Wiki page handlers
//!
//! One function per operation. Each runs a single request/response
//! transaction against the page store and the template set; nothing is kept
//! between requests.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::config::AppState;
use crate::http::{self, FormData};
use crate::logger;
use crate::routing::{extract_title, is_valid_title, Route};
use crate::wiki::{Page, Result, WikiError};

/// Request data the handlers need, detached from the hyper request
#[derive(Debug, Default)]
pub struct PageRequest {
    pub path: String,
    pub is_head: bool,
    pub form: FormData,
}

impl PageRequest {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_form(path: &str, form: FormData) -> Self {
        Self {
            form,
            ..Self::new(path)
        }
    }
}

/// Run the handler for an already matched route
pub async fn dispatch(route: Route, req: &PageRequest, state: &AppState) -> Response<Full<Bytes>> {
    run(route, req, state)
        .await
        .unwrap_or_else(|e| error_response(route, &e))
}

/// Path titles are checked before any handler logic runs
async fn run(route: Route, req: &PageRequest, state: &AppState) -> Result<Response<Full<Bytes>>> {
    match route {
        Route::View => view(state, extract_title(&req.path)?, req.is_head).await,
        Route::Edit => edit(state, extract_title(&req.path)?, req.is_head).await,
        Route::Save => save(state, extract_title(&req.path)?, req.form.value("body")).await,
        Route::Create => create(state, &req.form).await,
        Route::NewPage => new_page(state, req.is_head),
        Route::Home => home(state, req.is_head),
    }
}

/// Show a page; a missing page sends the client to its edit form
async fn view(state: &AppState, title: &str, is_head: bool) -> Result<Response<Full<Bytes>>> {
    match state.store.load(title).await {
        Ok(page) => render(state, "view", Some(&page), is_head),
        Err(WikiError::NotFound(_)) => Ok(http::build_redirect_response(&format!("/edit/{title}"))),
        Err(e) => Err(e),
    }
}

/// Edit form; a missing page starts out blank
async fn edit(state: &AppState, title: &str, is_head: bool) -> Result<Response<Full<Bytes>>> {
    let page = match state.store.load(title).await {
        Ok(page) => page,
        Err(WikiError::NotFound(_)) => Page::empty(title),
        Err(e) => return Err(e),
    };
    render(state, "edit", Some(&page), is_head)
}

async fn save(state: &AppState, title: &str, body: &str) -> Result<Response<Full<Bytes>>> {
    store_and_redirect(state, Page::new(title, body), Route::Save).await
}

/// Save a page whose title comes from the form instead of the path.
/// The title gets the same character check the path grammar applies.
async fn create(state: &AppState, form: &FormData) -> Result<Response<Full<Bytes>>> {
    let title = form.value("title");
    if !is_valid_title(title) {
        return Err(WikiError::InvalidTitle(title.to_string()));
    }
    store_and_redirect(state, Page::new(title, form.value("body")), Route::Create).await
}

async fn store_and_redirect(
    state: &AppState,
    page: Page,
    route: Route,
) -> Result<Response<Full<Bytes>>> {
    state.store.save(&page).await?;
    logger::log_trace(route.name(), &page.title);
    Ok(http::build_redirect_response(&format!("/view/{}", page.title)))
}

fn new_page(state: &AppState, is_head: bool) -> Result<Response<Full<Bytes>>> {
    render(state, "new", Some(&Page::placeholder()), is_head)
}

fn home(state: &AppState, is_head: bool) -> Result<Response<Full<Bytes>>> {
    render(state, "home", None, is_head)
}

fn render(
    state: &AppState,
    template: &str,
    page: Option<&Page>,
    is_head: bool,
) -> Result<Response<Full<Bytes>>> {
    logger::log_trace(template, page.map_or("Home", |p| p.title.as_str()));
    let html = state.templates.render(template, page)?;
    Ok(http::build_html_response(html, is_head))
}

fn error_response(route: Route, err: &WikiError) -> Response<Full<Bytes>> {
    match err {
        WikiError::InvalidPath(path) => {
            logger::log_warning(&format!("Invalid path: {path}"));
            http::build_404_response()
        }
        WikiError::NotFound(_) => http::build_404_response(),
        WikiError::InvalidTitle(title) => {
            logger::log_warning(&format!("{} rejected title '{title}'", route.name()));
            http::build_400_response(&err.to_string())
        }
        WikiError::Io(_) | WikiError::Render(_) => {
            logger::log_error(&format!("{} failed: {err}", route.name()));
            http::build_500_response(&err.to_string())
        }
    }
}
