// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turbo Stream responses for hyper-based servers
//!
//! [`TurboStreams`] is installed in front of a request handler and attaches a
//! [`StreamResponder`] to every request. The handler takes the responder out of the
//! request and calls one of its action methods, which renders a partial through a
//! [`Renderer`], wraps it in a `<turbo-stream>` envelope and builds the response.

pub mod action;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod render;
pub mod request;
pub mod responder;
pub mod response;

pub use action::Action;
pub use envelope::StreamEnvelope;
pub use error::Error;
pub use middleware::TurboStreams;
pub use render::{FnRenderer, Locals, Renderer};
pub use request::accepts_turbo_stream;
pub use responder::{StreamOptions, StreamResponder};
pub use response::TURBO_STREAM_CONTENT_TYPE;
