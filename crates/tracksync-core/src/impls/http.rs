//! Shared reqwest plumbing for the remote clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;

use crate::config::ConfigError;
use crate::domain::{RemoteError, Service};

pub(crate) fn build_client(
    service: &'static str,
    headers: header::HeaderMap,
    timeout: Duration,
) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|error| ConfigError::HttpClient {
            service,
            reason: error.to_string(),
        })
}

pub(crate) fn header_value(
    key: &'static str,
    value: &str,
) -> Result<header::HeaderValue, ConfigError> {
    header::HeaderValue::from_str(value).map_err(|error| ConfigError::Invalid {
        key,
        reason: error.to_string(),
    })
}

pub(crate) fn endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');
    format!("{base}/{suffix}")
}

/// Send and return the status with the raw body; transport failures become `RemoteError`.
async fn send(service: Service, request: RequestBuilder) -> Result<(StatusCode, String), RemoteError> {
    let response = request
        .send()
        .await
        .map_err(|error| RemoteError::new(service, error.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| RemoteError::with_status(service, status.as_u16(), error.to_string()))?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(service: Service, status: StatusCode, body: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|error| {
        RemoteError::with_status(
            service,
            status.as_u16(),
            format!("malformed response body: {error}"),
        )
    })
}

fn failure(service: Service, status: StatusCode, body: String) -> RemoteError {
    RemoteError::with_status(service, status.as_u16(), body)
}

pub(crate) async fn request_json<T: DeserializeOwned>(
    service: Service,
    request: RequestBuilder,
) -> Result<T, RemoteError> {
    let (status, body) = send(service, request).await?;
    if !status.is_success() {
        return Err(failure(service, status, body));
    }
    decode(service, status, &body)
}

/// Like `request_json`, but a 404 reads as `None`.
pub(crate) async fn request_optional_json<T: DeserializeOwned>(
    service: Service,
    request: RequestBuilder,
) -> Result<Option<T>, RemoteError> {
    let (status, body) = send(service, request).await?;
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(failure(service, status, body));
    }
    decode(service, status, &body).map(Some)
}

pub(crate) async fn request_status_only(
    service: Service,
    request: RequestBuilder,
) -> Result<(), RemoteError> {
    let (status, body) = send(service, request).await?;
    if status.is_success() {
        Ok(())
    } else {
        Err(failure(service, status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://api.example.com", "repos/a/b", "https://api.example.com/repos/a/b")]
    #[case("https://api.example.com/", "/repos/a/b", "https://api.example.com/repos/a/b")]
    #[case("http://localhost:9000/v5//", "projects/1", "http://localhost:9000/v5/projects/1")]
    fn endpoint_joins_with_single_slash(
        #[case] base: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(endpoint(base, path), expected);
    }

    #[test]
    fn header_value_rejects_control_characters() {
        let err = header_value("TOKEN", "abc\ndef").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TOKEN", .. }));
    }
}
