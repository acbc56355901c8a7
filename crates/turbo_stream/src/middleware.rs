// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Installing [`StreamResponder`]s in front of a request handler

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::Request;

use crate::render::Renderer;
use crate::responder::StreamResponder;

/// Attaches a fresh [`StreamResponder`] to every request passing through it.
///
/// Responders live in the request's extensions, so each one belongs to exactly one
/// request. Installing twice is harmless: the innermost attachment replaces the outer one.
///
/// ```
/// use std::net::SocketAddr;
/// use std::sync::Arc;
///
/// use hyper::Request;
/// use turbo_stream::response::{self, GenericResponse, StatusCode};
/// use turbo_stream::{Locals, Renderer, StreamResponder, TurboStreams};
///
/// struct Blank;
///
/// #[async_trait::async_trait]
/// impl Renderer for Blank {
///     type Error = std::io::Error;
///
///     async fn render(&self, _partial: &str, _locals: &Locals) -> Result<String, Self::Error> {
///         Ok(String::new())
///     }
/// }
///
/// async fn handle(mut request: Request<()>, _peer: SocketAddr) -> GenericResponse {
///     let Some(streams) = StreamResponder::<Blank>::take_from(&mut request) else {
///         return response::text(StatusCode::INTERNAL_SERVER_ERROR, "no responder");
///     };
///     match streams.remove("message_1", None).await {
///         Ok(response) => response,
///         Err(err) => response::text(StatusCode::INTERNAL_SERVER_ERROR, err),
///     }
/// }
///
/// let respond = TurboStreams::new(Arc::new(Blank)).wrap(handle);
/// let peer = SocketAddr::from(([127, 0, 0, 1], 3000));
/// let response = futures::executor::block_on(respond(Request::new(()), peer));
/// assert_eq!(response.status(), StatusCode::OK);
/// ```
pub struct TurboStreams<R: ?Sized> {
    renderer: Arc<R>,
}

impl<R: ?Sized> Clone for TurboStreams<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: self.renderer.clone(),
        }
    }
}

impl<R> TurboStreams<R>
where
    R: Renderer + ?Sized + 'static,
{
    pub fn new(renderer: Arc<R>) -> Self {
        Self { renderer }
    }

    /// Attach a new [`StreamResponder`] to `request`, replacing any already attached.
    pub fn attach<B>(&self, request: &mut Request<B>) {
        request
            .extensions_mut()
            .insert(StreamResponder::new(self.renderer.clone()));
    }

    /// Wrap `next` so that it sees requests with a [`StreamResponder`] attached.
    ///
    /// The returned closure attaches the responder and then calls `next` straight away;
    /// it never inspects the request or skips `next`.
    pub fn wrap<B, N, F>(self, next: N) -> impl Fn(Request<B>, SocketAddr) -> F + Clone
    where
        N: Fn(Request<B>, SocketAddr) -> F + Clone,
        F: Future,
    {
        move |mut request: Request<B>, peer: SocketAddr| {
            self.attach(&mut request);
            next(request, peer)
        }
    }
}
