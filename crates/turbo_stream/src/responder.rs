// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`StreamResponder`] and its options

use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::envelope::StreamEnvelope;
use crate::render::{Locals, Renderer};
use crate::response::{self, GenericResponse, TURBO_STREAM_CONTENT_TYPE};

/// What to render inside a stream's `<template>`.
///
/// Without a `partial` nothing is rendered and the template stays empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub partial: Option<String>,
    #[serde(default)]
    pub locals: Locals,
}

impl StreamOptions {
    pub fn partial(partial: impl Into<String>) -> Self {
        Self {
            partial: Some(partial.into()),
            locals: Locals::new(),
        }
    }

    pub fn with_locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    /// Insert one local, replacing any previous value of the same name.
    pub fn with_local(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }
}

/// Builds exactly one stream response for one request.
///
/// A fresh responder is attached to each request by [`TurboStreams`](crate::TurboStreams).
/// Status and headers may be adjusted before calling an action; the action then only
/// overwrites `Content-Type`. Every action consumes the responder, so a request can't
/// be answered twice.
pub struct StreamResponder<R: ?Sized> {
    renderer: Arc<R>,
    status: StatusCode,
    headers: HeaderMap,
}

// Derive would require `R: Clone`.
impl<R: ?Sized> Clone for StreamResponder<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: self.renderer.clone(),
            status: self.status,
            headers: self.headers.clone(),
        }
    }
}

impl<R> StreamResponder<R>
where
    R: Renderer + ?Sized + 'static,
{
    pub fn new(renderer: Arc<R>) -> Self {
        Self {
            renderer,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Removes the responder attached to `request`, if any.
    pub fn take_from<B>(request: &mut Request<B>) -> Option<Self> {
        request.extensions_mut().remove::<Self>()
    }

    pub fn status_mut(&mut self) -> &mut StatusCode {
        &mut self.status
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub async fn append(
        self,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        self.stream(Action::Append, target, options).await
    }

    pub async fn prepend(
        self,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        self.stream(Action::Prepend, target, options).await
    }

    pub async fn replace(
        self,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        self.stream(Action::Replace, target, options).await
    }

    pub async fn update(
        self,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        self.stream(Action::Update, target, options).await
    }

    pub async fn remove(
        self,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        self.stream(Action::Remove, target, options).await
    }

    /// Render `options.partial` (if any) and wrap it in a stream envelope for `target`.
    ///
    /// The only await is the render call. A render error is returned as-is and no
    /// response is produced.
    pub async fn stream(
        self,
        action: Action,
        target: &str,
        options: Option<StreamOptions>,
    ) -> Result<GenericResponse, R::Error> {
        let StreamOptions { partial, locals } = options.unwrap_or_default();
        let content = match &partial {
            Some(partial) => self.renderer.render(partial, &locals).await?,
            None => String::new(),
        };
        debug!(
            %action,
            stream_target = target,
            partial = partial.as_deref().unwrap_or("<none>"),
            "Built turbo stream"
        );
        let envelope = StreamEnvelope::new(action, target, &content).to_string();
        Ok(self.finish(envelope))
    }

    fn finish(self, envelope: String) -> GenericResponse {
        let mut headers = self.headers;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(TURBO_STREAM_CONTENT_TYPE),
        );
        let mut response = Response::new(response::body(envelope));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}
