// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Errors raised by this crate itself.
///
/// Rendering failures are not represented here: they are returned as the
/// [`Renderer`](crate::Renderer)'s own error type, untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A string didn't name one of the five stream actions.
    #[error("unknown turbo stream action {0:?}")]
    UnknownAction(String),
}
