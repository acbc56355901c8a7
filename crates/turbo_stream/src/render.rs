// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between stream responses and whatever renders views

use std::future::Future;

/// Named values passed into a partial when it is rendered.
pub type Locals = serde_json::Map<String, serde_json::Value>;

/// Renders a named partial to an HTML string.
///
/// Implementations own template lookup, compilation, caching and escaping; stream
/// responses only ever see the finished string. Errors are handed back to the caller of
/// the stream action exactly as returned here.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn render(&self, partial: &str, locals: &Locals) -> Result<String, Self::Error>;
}

/// [`Renderer`] backed by an async closure.
///
/// ```
/// use turbo_stream::{FnRenderer, Locals, Renderer};
///
/// # futures::executor::block_on(async {
/// let renderer = FnRenderer::new(|partial: String, _locals: Locals| async move {
///     Ok::<_, std::io::Error>(format!("<p>{partial}</p>"))
/// });
/// let html = renderer.render("greeting", &Locals::new()).await.unwrap();
/// assert_eq!(html, "<p>greeting</p>");
/// # });
/// ```
#[derive(Clone)]
pub struct FnRenderer<F>(F);

impl<F> FnRenderer<F> {
    pub fn new(render: F) -> Self {
        Self(render)
    }
}

#[async_trait::async_trait]
impl<F, Fut, E> Renderer for FnRenderer<F>
where
    F: Fn(String, Locals) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    async fn render(&self, partial: &str, locals: &Locals) -> Result<String, E> {
        (self.0)(partial.to_owned(), locals.clone()).await
    }
}
