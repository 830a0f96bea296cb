//! Static pages served by the built-in application.

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::PageConfig;

/// A fixed response for one path.
#[derive(Debug, Clone)]
pub struct StaticPage {
    status: StatusCode,
    content_type: HeaderValue,
    body: String,
}

impl StaticPage {
    pub fn new(status: StatusCode, content_type: &str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: HeaderValue::from_str(content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            body: body.into(),
        }
    }

    pub fn respond(&self, method: &Method) -> Response {
        if method != Method::GET && method != Method::HEAD {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "GET, HEAD")],
                "Method Not Allowed",
            )
                .into_response();
        }
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, self.content_type.clone());
        response
    }
}

/// Exact-path lookup of static pages.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<String, StaticPage>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(pages: &[PageConfig]) -> Self {
        pages.iter().fold(Self::new(), |acc, page| {
            let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);
            acc.add(&page.path, StaticPage::new(status, &page.content_type, page.body.clone()))
        })
    }

    pub fn add(mut self, path: impl Into<String>, page: StaticPage) -> Self {
        self.pages.insert(path.into(), page);
        self
    }

    pub fn get(&self, path: &str) -> Option<&StaticPage> {
        self.pages.get(path)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
