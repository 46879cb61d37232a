//! Template rendering module
//!
//! Bridges request handlers to minijinja. The template set is built once at
//! startup and only read afterwards, so one `Renderer` is shared by every
//! connection without locking.

use minijinja::{context, default_auto_escape_callback, Environment};
use std::path::Path;

use crate::wiki::{Page, Result};

/// Names of the templates every renderer must provide
pub const TEMPLATE_NAMES: [&str; 4] = ["home", "view", "edit", "new"];

pub trait TemplateEngine: Send + Sync {
    /// Render the named template (without extension) for an optional page
    fn render(&self, name: &str, page: Option<&Page>) -> Result<String>;
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Renderer backed by the templates compiled into the binary
    pub fn builtin() -> Result<Self> {
        let mut env = new_environment();
        env.add_template("home.html", include_str!("../../templates/home.html"))?;
        env.add_template("view.html", include_str!("../../templates/view.html"))?;
        env.add_template("edit.html", include_str!("../../templates/edit.html"))?;
        env.add_template("new.html", include_str!("../../templates/new.html"))?;
        Ok(Self { env })
    }

    /// Renderer reading `<dir>/<name>.html` for every required template
    ///
    /// Fails when any template is missing or does not parse, so a broken
    /// template directory stops the server at startup rather than per request.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut env = new_environment();
        for name in TEMPLATE_NAMES {
            let file_name = format!("{name}.html");
            let source = std::fs::read_to_string(dir.join(&file_name))?;
            env.add_template_owned(file_name, source)?;
        }
        Ok(Self { env })
    }

    /// Pick the template source from configuration
    pub fn load(template_dir: Option<&str>) -> Result<Self> {
        match template_dir {
            Some(dir) => Self::from_dir(Path::new(dir)),
            None => Self::builtin(),
        }
    }
}

impl TemplateEngine for Renderer {
    fn render(&self, name: &str, page: Option<&Page>) -> Result<String> {
        let tmpl = self.env.get_template(&format!("{name}.html"))?;
        let ctx = match page {
            Some(p) => context! {
                page => true,
                title => p.title.as_str(),
                body => p.body_text(),
            },
            None => context! { page => false },
        };
        Ok(tmpl.render(ctx)?)
    }
}

fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(default_auto_escape_callback);
    env
}
