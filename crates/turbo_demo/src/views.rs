// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partials read from a directory of `.html` files
//!
//! Partials are [`minijinja`] templates, so `{{ message.content }}` looks up a dotted path
//! in the locals. Output is HTML-escaped. Undefined names and `null` render as nothing.

use std::path::{Component, Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior};
use turbo_stream::{Locals, Renderer};

#[derive(thiserror::Error, Debug)]
pub enum ViewError {
    #[error("partial name {0:?} must be a relative path inside the partials directory")]
    InvalidName(String),
    #[error("couldn't read partial {partial:?} from {path:?}: {source}")]
    Read {
        partial: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't render partial {partial:?}: {source:#}")]
    Template {
        partial: String,
        source: minijinja::Error,
    },
}

/// Renders `<root>/<partial>.html`, re-reading the file on every render.
#[derive(Clone, Debug)]
pub struct PartialDirectory {
    root: PathBuf,
    env: Environment<'static>,
}

impl PartialDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_keep_trailing_newline(true);
        env.set_formatter(|out, state, value| {
            if value.is_none() {
                Ok(())
            } else {
                minijinja::escape_formatter(out, state, value)
            }
        });
        Self {
            root: root.into(),
            env,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, partial: &str) -> Result<PathBuf, ViewError> {
        let relative = Path::new(partial);
        let well_formed = !partial.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !well_formed {
            return Err(ViewError::InvalidName(partial.to_owned()));
        }
        Ok(self.root.join(format!("{partial}.html")))
    }
}

#[async_trait::async_trait]
impl Renderer for PartialDirectory {
    type Error = ViewError;

    async fn render(&self, partial: &str, locals: &Locals) -> Result<String, ViewError> {
        let path = self.path_for(partial)?;
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(source) => {
                return Err(ViewError::Read {
                    partial: partial.to_owned(),
                    path,
                    source,
                })
            }
        };
        // The `.html` suffix on the name is what turns on auto-escaping.
        let name = format!("{partial}.html");
        self.env
            .render_named_str(&name, &source, locals)
            .map_err(|source| ViewError::Template {
                partial: partial.to_owned(),
                source,
            })
    }
}
