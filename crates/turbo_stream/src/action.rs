// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What the client should do with a stream's content and its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Append,
    Prepend,
    Replace,
    Update,
    Remove,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Append,
        Action::Prepend,
        Action::Replace,
        Action::Update,
        Action::Remove,
    ];

    /// Name used for the `action` attribute of the envelope.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Append => "append",
            Action::Prepend => "prepend",
            Action::Replace => "replace",
            Action::Update => "update",
            Action::Remove => "remove",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_owned()))
    }
}
