// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use http::header::{HeaderValue, ACCEPT};
use http::HeaderMap;

/// Media type Turbo lists in `Accept` when it can apply stream responses.
pub const TURBO_STREAM_MEDIA_TYPE: &str = "text/vnd.turbo-stream.html";

/// Whether a request's `Accept` headers include [`TURBO_STREAM_MEDIA_TYPE`].
///
/// Media type parameters (`;q=0.9` and so on) are ignored, as are unparseable headers.
pub fn accepts_turbo_stream(headers: &HeaderMap<HeaderValue>) -> bool {
    headers
        .get_all(ACCEPT)
        .into_iter()
        .filter_map(|accept| accept.to_str().ok())
        .flat_map(|accept| accept.split(','))
        .filter_map(|media_range| media_range.split(';').next())
        .any(|media_type| {
            media_type
                .trim()
                .eq_ignore_ascii_case(TURBO_STREAM_MEDIA_TYPE)
        })
}
