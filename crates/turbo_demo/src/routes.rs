// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::net::SocketAddr;

use anyhow::Context;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use turbo_stream::response::{self, ErrResponse, GenericResponse, ResponseResult, StatusCode};
use turbo_stream::{accepts_turbo_stream, StreamOptions, StreamResponder};

use crate::views::{PartialDirectory, ViewError};

/// Largest JSON body accepted by the message endpoints.
pub const JSON_SIZE_LIMIT: u64 = 64 * 1024;

/// Target element holding the list of messages.
pub const MESSAGES_TARGET: &str = "messages";

const MESSAGE_PARTIAL: &str = "messages/show";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub content: String,
}

#[derive(Clone, Debug, Deserialize)]
struct MessageEdit {
    content: String,
}

/// Request handler; expects a [`StreamResponder`] attached by [`turbo_stream::TurboStreams`].
pub async fn respond<B>(mut request: Request<B>, peer: SocketAddr) -> GenericResponse
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let Some(streams) = StreamResponder::<PartialDirectory>::take_from(&mut request) else {
        error!("No stream responder attached to request from {peer}");
        return response::text(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    };

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let result = match (&method, segments.as_slice()) {
        (&Method::GET, ["version"]) => Ok(version()),
        (&Method::POST, ["messages"]) => create_message(streams, request).await,
        (&Method::PATCH, ["messages", id]) => edit_message(streams, id, request).await,
        (&Method::DELETE, ["messages", id]) => delete_message(streams, id, request).await,
        _ => Ok(response::not_found()),
    };
    match result {
        Ok(r) | Err(ErrResponse(r)) => r,
    }
}

fn version() -> GenericResponse {
    let version = serde_json::json!({ "version": env!("CARGO_PKG_VERSION") });
    response::json(StatusCode::OK, version)
}

async fn create_message<B>(
    streams: StreamResponder<PartialDirectory>,
    request: Request<B>,
) -> ResponseResult
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    require_stream_support(&request)?;
    let message: Message = read_json_body(request).await?;
    let options = message_options(&message)?;
    streams
        .append(MESSAGES_TARGET, Some(options))
        .await
        .map_err(render_failed)
}

async fn edit_message<B>(
    streams: StreamResponder<PartialDirectory>,
    id: &str,
    request: Request<B>,
) -> ResponseResult
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    require_stream_support(&request)?;
    let id = parse_id(id)?;
    let MessageEdit { content } = read_json_body(request).await?;
    let message = Message { id, content };
    let options = message_options(&message)?;
    streams
        .replace(&message_target(id), Some(options))
        .await
        .map_err(render_failed)
}

async fn delete_message<B>(
    streams: StreamResponder<PartialDirectory>,
    id: &str,
    request: Request<B>,
) -> ResponseResult {
    require_stream_support(&request)?;
    let id = parse_id(id)?;
    streams
        .remove(&message_target(id), None)
        .await
        .map_err(render_failed)
}

pub fn message_target(id: u64) -> String {
    format!("message_{id}")
}

fn message_options(message: &Message) -> Result<StreamOptions, ErrResponse> {
    let message = serde_json::to_value(message)
        .context("serializing message")
        .map_err(|err| {
            error!("{err:#}");
            ErrResponse(response::text(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ))
        })?;
    Ok(StreamOptions::partial(MESSAGE_PARTIAL).with_local("message", message))
}

fn require_stream_support<B>(request: &Request<B>) -> Result<(), ErrResponse> {
    if accepts_turbo_stream(request.headers()) {
        Ok(())
    } else {
        Err(ErrResponse(response::text(
            StatusCode::NOT_ACCEPTABLE,
            "this endpoint only responds with text/vnd.turbo-stream.html",
        )))
    }
}

fn parse_id(id: &str) -> Result<u64, ErrResponse> {
    id.parse().map_err(|_| {
        ErrResponse(response::text(
            StatusCode::BAD_REQUEST,
            format_args!("invalid message id {id:?}"),
        ))
    })
}

fn render_failed(err: ViewError) -> ErrResponse {
    warn!("Couldn't render stream: {err}");
    ErrResponse(response::text(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error",
    ))
}

/// Read a body with a fixed `Content-Length` no larger than [`JSON_SIZE_LIMIT`] as JSON.
async fn read_json_body<B, T>(request: Request<B>) -> Result<T, ErrResponse>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
    T: DeserializeOwned,
{
    let bad_request = |msg: String| ErrResponse(response::text(StatusCode::BAD_REQUEST, msg));
    let body = match request.body().size_hint().exact() {
        Some(size) if size <= JSON_SIZE_LIMIT => request
            .into_body()
            .collect()
            .await
            .map_err(|err| bad_request(format!("couldn't read body: {err}")))?
            .to_bytes(),
        Some(size) => {
            return Err(bad_request(format!(
                "request too large ({size}b), maximum {JSON_SIZE_LIMIT}b"
            )))
        }
        None => {
            return Err(bad_request(
                "request must have a fixed Content-Length, chunked encoding not supported".into(),
            ))
        }
    };
    serde_json::from_slice(&body).map_err(|err| bad_request(format!("invalid JSON body: {err}")))
}
