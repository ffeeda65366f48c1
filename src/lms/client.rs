use std::time::Duration;

use axum::http::StatusCode;
use reqwest::{Client, Url, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::AppError;

/// One undecoded upstream page and its raw `Link` header.
#[derive(Debug)]
pub struct RawPage {
    pub body: String,
    pub link: Option<String>,
}

/// Authenticated GET client that knows how to follow `Link: rel="next"` cursors.
#[derive(Clone)]
pub struct PagedClient {
    client: Client,
    access_token: String,
}

impl PagedClient {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, access_token })
    }

    pub async fn get_raw(&self, url: &str) -> Result<RawPage, AppError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("upstream returned {} for {}", status, url);
            let status = StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            return Err(AppError::Upstream {
                status,
                url: url.to_string(),
            });
        }

        let link = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response.text().await?;

        Ok(RawPage { body, link })
    }

    pub async fn get_one<T: DeserializeOwned>(&self, url: &str) -> Result<T, AppError> {
        let page = self.get_raw(url).await?;
        Ok(serde_json::from_str(&page.body)?)
    }

    /// Fetches every page starting at `url`, decoding each one as `P`.
    pub async fn get_pages<P: DeserializeOwned>(&self, url: String) -> Result<Vec<P>, AppError> {
        let mut pages = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next {
            let page = self.get_raw(&url).await?;
            pages.push(serde_json::from_str::<P>(&page.body)?);
            next = page.link.as_deref().and_then(next_link);
        }

        Ok(pages)
    }

    /// Fetches every page of a JSON array resource and concatenates them in page order.
    pub async fn get_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>, AppError> {
        let pages = self.get_pages::<Vec<T>>(url).await?;
        Ok(pages.into_iter().flatten().collect())
    }
}

/// Extracts the `rel="next"` target from an RFC 5988 `Link` header value.
///
/// Any token that is not of the form `<url>; rel="next"` is ignored, so an
/// empty or malformed header simply ends pagination.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|token| {
        let mut parts = token.trim().split(';');
        let target = parts.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;

        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });

        (is_next && !url.is_empty()).then(|| url.to_string())
    })
}

/// Builds `{base}/{path}?{params}` with repeatable query keys such as `include[]`.
pub fn endpoint(base_url: &str, path: &str, params: &[(&str, String)]) -> Result<String, AppError> {
    let mut url = parse_endpoint(base_url, path)?;
    append_params(&mut url, params);
    Ok(url.to_string())
}

/// Like [`endpoint`], with `segment` escaped into a single trailing path segment.
pub fn endpoint_with_segment(
    base_url: &str,
    path: &str,
    segment: &str,
    params: &[(&str, String)],
) -> Result<String, AppError> {
    let mut url = parse_endpoint(base_url, path)?;
    url.path_segments_mut()
        .map_err(|_| AppError::Internal(format!("upstream url cannot take a path: {}", base_url)))?
        .pop_if_empty()
        .push(segment);
    append_params(&mut url, params);
    Ok(url.to_string())
}

fn parse_endpoint(base_url: &str, path: &str) -> Result<Url, AppError> {
    let raw = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|e| AppError::Internal(format!("invalid upstream url {}: {}", raw, e)))
}

fn append_params(url: &mut Url, params: &[(&str, String)]) {
    if params.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in params {
        query.append_pair(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_link_picks_the_next_relation() {
        let header = r#"<https://x/p2>; rel="next", <https://x/p1>; rel="prev""#;
        assert_eq!(next_link(header), Some("https://x/p2".to_string()));
    }

    #[test]
    fn next_link_handles_upstream_formatting_without_spaces() {
        let header = r#"<https://x/p1>; rel="current",<https://x/p3>; rel="next",<https://x/p9>; rel="last""#;
        assert_eq!(next_link(header), Some("https://x/p3".to_string()));
    }

    #[test]
    fn next_link_is_none_without_next_relation() {
        let header = r#"<https://x/p1>; rel="prev", <https://x/p1>; rel="first""#;
        assert_eq!(next_link(header), None);
    }

    #[test]
    fn next_link_is_none_for_empty_or_malformed_headers() {
        assert_eq!(next_link(""), None);
        assert_eq!(next_link("garbage"), None);
        assert_eq!(next_link(r#"https://x/p2; rel="next""#), None);
        assert_eq!(next_link(r#"<>; rel="next""#), None);
    }

    #[test]
    fn endpoint_appends_repeated_keys() {
        let url = endpoint(
            "https://lms.example/api/v1/",
            "/users/5/courses",
            &[
                ("per_page", "50".to_string()),
                ("include[]", "account".to_string()),
                ("include[]", "total_students".to_string()),
            ],
        )
        .unwrap();

        assert!(url.starts_with("https://lms.example/api/v1/users/5/courses?"));
        assert!(url.contains("per_page=50"));
        assert_eq!(url.matches("include%5B%5D=").count(), 2);
    }

    #[test]
    fn segments_are_escaped_as_one_path_segment() {
        let url = endpoint_with_segment(
            "https://lms.example/api/v1/",
            "users",
            "sis_user_id:x/../../accounts/1?a=b#c",
            &[],
        )
        .unwrap();

        assert_eq!(
            url,
            "https://lms.example/api/v1/users/sis_user_id:x%2F..%2F..%2Faccounts%2F1%3Fa=b%23c"
        );
    }
}
