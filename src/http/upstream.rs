//! Forwarding to an upstream application server.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream authority
//! - Ask for an unencoded body so the page can be decorated
//! - Map upstream failures to 502/504

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::request_id;

/// Upstream HTTP application.
#[derive(Clone)]
pub struct Upstream {
    authority: Authority,
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Upstream {
    pub fn new(authority: Authority, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            authority,
            client,
            timeout,
        }
    }

    pub fn parse(address: &str, timeout: Duration) -> Result<Self, axum::http::uri::InvalidUri> {
        Ok(Self::new(Authority::from_str(address)?, timeout))
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Forward a request and return the upstream response unchanged.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let request_id = request_id(&request).to_string();
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Cannot build upstream URI");
                return (StatusCode::BAD_GATEWAY, "Bad upstream URI").into_response();
            }
        };
        // Compressed bodies cannot be decorated.
        parts.headers.remove(header::ACCEPT_ENCODING);

        tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding to upstream");

        let exchange = self.client.request(Request::from_parts(parts, body));
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            Err(_) => {
                tracing::error!(request_id = %request_id, timeout = ?self.timeout, "Upstream timed out");
                (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
            }
        }
    }
}
