use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::auth::Authenticator;
use crate::lms::LmsApi;

#[derive(Clone)]
pub struct AppState {
    pub lms: Arc<dyn LmsApi>,
    pub auth: Arc<Authenticator>,
    /// Browser-facing LMS root used to build gradebook links.
    pub html_url: String,
    pub web_origin: HeaderValue,
    pub request_timeout: Duration,
}
