// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `<turbo-stream>` markup wrapped around rendered content

use std::fmt::Display;

use crate::action::Action;

/// A `<turbo-stream>` element ready to be written out via [`Display`].
///
/// The layout (leading newline, indentation, trailing newline and two spaces) is fixed;
/// clients compare responses against it byte-for-byte.
///
/// **BEWARE:** `target` is embedded as-is, without any HTML escaping. It must come from
/// trusted code, not from user input. `content` is whatever the renderer produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEnvelope<'a> {
    pub action: Action,
    pub target: &'a str,
    pub content: &'a str,
}

impl<'a> StreamEnvelope<'a> {
    pub fn new(action: Action, target: &'a str, content: &'a str) -> Self {
        Self {
            action,
            target,
            content,
        }
    }
}

impl Display for StreamEnvelope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\n  <turbo-stream action=\"{}\" target=\"{}\">\n    <template>\n{}\n    </template>\n  </turbo-stream>\n  ",
            self.action, self.target, self.content
        )
    }
}
