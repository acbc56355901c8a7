// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response-related helpers

use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::Response;
pub use hyper::StatusCode;

/// Content type of every stream response.
pub const TURBO_STREAM_CONTENT_TYPE: &str = "text/html; turbo-stream; charset=utf-8";

/// Holds a [`GenericResponse`], possibly wrapped in an [`ErrResponse`].
pub type ResponseResult = Result<GenericResponse, ErrResponse>;

/// Type-erased HTTP response
pub type GenericResponse = Response<BoxBody<Bytes, anyhow::Error>>;

/// Wrapper for responses describing a failure, so handlers can bail out with `?`.
pub struct ErrResponse(pub GenericResponse);

/// Box up a complete body.
pub fn body(content: impl Into<String>) -> BoxBody<Bytes, anyhow::Error> {
    let content: String = content.into();
    content.map_err(anyhow::Error::from).boxed()
}

/// Return a [`GenericResponse`] with known content.
pub fn full(
    status: StatusCode,
    content_type: &'static str,
    content: impl ToString,
) -> GenericResponse {
    let mut response = Response::new(body(content.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Return a plain text response with known content.
pub fn text(status: StatusCode, content: impl ToString) -> GenericResponse {
    full(status, "text/plain; charset=utf-8", content)
}

/// Return a JSON response with known content.
pub fn json(status: StatusCode, content: impl ToString) -> GenericResponse {
    full(status, "application/json", content)
}

/// Return a plain text "404 not found" response with appropriate status code
pub fn not_found() -> GenericResponse {
    text(StatusCode::NOT_FOUND, "404 not found")
}

#[cfg(test)]
pub(crate) fn to_body(response: GenericResponse) -> Vec<u8> {
    let body = response.into_body().collect();
    futures::executor::block_on(body)
        .unwrap()
        .to_bytes()
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanity_check_full_response() {
        let response = full(
            StatusCode::CREATED,
            "foo/bar",
            format_args!("double = {}, square = {}", 123 + 123, 123 * 123),
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "foo/bar");
        assert_eq!(to_body(response), b"double = 246, square = 15129");
    }

    #[test]
    fn sanity_check_not_found() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(to_body(response), b"404 not found");
    }

    #[test]
    fn sanity_check_err_response() {
        fn inner() -> ResponseResult {
            Err(ErrResponse(json(StatusCode::BAD_REQUEST, "{}")))?;
            unreachable!();
        }
        let ErrResponse(response) = inner().err().unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(to_body(response), b"{}");
    }
}
