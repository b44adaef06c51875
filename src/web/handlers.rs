//! HTTP handlers
//!
//! Handlers validate query parameters, call the matching [`IconService`]
//! method and render the cached result. They never fail for a valid request.
//!
//! [`IconService`]: crate::service::IconService

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use std::time::Duration;

use crate::cache::CacheLookup;
use crate::errors::{AppError, AppResult};
use crate::utils::jitter::random_whole_days;
use crate::web::AppState;
use crate::web::responses::{
    HealthResponse, OutputFormat, image_response, json_response, json_value_response,
};

const DEFAULT_LANG: &str = "en";

#[derive(Debug, Deserialize)]
pub struct SizedImageQuery {
    pub url: Option<String>,
    pub size: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileIconQuery {
    pub user: Option<String>,
    pub size: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FaviconQuery {
    pub url: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListIconsQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    pub query: Option<String>,
    pub lang: Option<String>,
}

fn required(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::validation(field, format!("'{field}' is required"))),
    }
}

/// Parse a requested edge length in `1..=max`
fn parse_size(value: Option<&str>, max: u32) -> AppResult<u32> {
    let raw = required("size", value)?;
    let size: i64 = raw
        .parse()
        .map_err(|_| AppError::validation("size", format!("'{raw}' is not an integer")))?;
    if size <= 0 || size > max as i64 {
        return Err(AppError::validation(
            "size",
            format!("size must be between 1 and {max}"),
        ));
    }
    Ok(size as u32)
}

fn parse_format(value: Option<&str>) -> AppResult<OutputFormat> {
    value.map(str::parse::<OutputFormat>).transpose().map(Option::unwrap_or_default)
}

impl AppState {
    /// Client max-age for an image result
    fn image_max_age(&self, lookup: &CacheLookup) -> Duration {
        if lookup.ttl_is_client_facing() {
            return lookup.ttl;
        }
        let responses = &self.service.config().responses;
        random_whole_days(
            responses.image_max_age_min_days,
            responses.image_max_age_max_days,
        )
    }

    /// Client max-age for a JSON result
    fn json_max_age(&self, lookup: &CacheLookup) -> Duration {
        if lookup.ttl_is_client_facing() {
            lookup.ttl
        } else {
            self.service.config().responses.json_max_age
        }
    }

    fn max_icon_size(&self) -> u32 {
        self.service.config().web.max_icon_size
    }

    fn render_image(&self, lookup: CacheLookup, format: OutputFormat) -> Response {
        let max_age = self.image_max_age(&lookup);
        image_response(lookup.value, format, max_age)
    }

    fn render_json(&self, lookup: CacheLookup) -> Response {
        let max_age = self.json_max_age(&lookup);
        json_response(lookup.value, max_age)
    }
}

/// `GET /icon?url&size[&format]`
pub async fn icon(
    State(state): State<AppState>,
    Query(params): Query<SizedImageQuery>,
) -> AppResult<Response> {
    let url = required("url", params.url.as_deref())?;
    let size = parse_size(params.size.as_deref(), state.max_icon_size())?;
    let format = parse_format(params.format.as_deref())?;

    let lookup = state.service.resolve_icon(&url, size).await;
    Ok(state.render_image(lookup, format))
}

/// `GET /icons?url`
pub async fn icons(
    State(state): State<AppState>,
    Query(params): Query<ListIconsQuery>,
) -> AppResult<Response> {
    let url = required("url", params.url.as_deref())?;
    let lookup = state.service.list_icons(&url).await;
    Ok(state.render_json(lookup))
}

/// `GET /image?url&size[&format]`
pub async fn image(
    State(state): State<AppState>,
    Query(params): Query<SizedImageQuery>,
) -> AppResult<Response> {
    let url = required("url", params.url.as_deref())?;
    let size = parse_size(params.size.as_deref(), state.max_icon_size())?;
    let format = parse_format(params.format.as_deref())?;

    let lookup = state.service.resolve_image(&url, size).await;
    Ok(state.render_image(lookup, format))
}

/// `GET /favicon?url[&format]`
pub async fn favicon(
    State(state): State<AppState>,
    Query(params): Query<FaviconQuery>,
) -> AppResult<Response> {
    let url = required("url", params.url.as_deref())?;
    let format = parse_format(params.format.as_deref())?;

    let lookup = state.service.favicon(&url).await;
    Ok(state.render_image(lookup, format))
}

/// `GET /facebook-icon?user&size[&format]`
pub async fn facebook_icon(
    State(state): State<AppState>,
    Query(params): Query<ProfileIconQuery>,
) -> AppResult<Response> {
    let user = required("user", params.user.as_deref())?;
    let size = parse_size(params.size.as_deref(), state.max_icon_size())?;
    let format = parse_format(params.format.as_deref())?;

    let lookup = state.service.facebook_icon(&user, size).await;
    Ok(state.render_image(lookup, format))
}

/// `GET /twitter-icon?user&size[&format]`
pub async fn twitter_icon(
    State(state): State<AppState>,
    Query(params): Query<ProfileIconQuery>,
) -> AppResult<Response> {
    let user = required("user", params.user.as_deref())?;
    let size = parse_size(params.size.as_deref(), state.max_icon_size())?;
    let format = parse_format(params.format.as_deref())?;

    let lookup = state.service.twitter_icon(&user, size).await;
    Ok(state.render_image(lookup, format))
}

/// `GET /google-search-suggestions?query[&lang]`
pub async fn search_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionsQuery>,
) -> AppResult<Response> {
    let query = required("query", params.query.as_deref())?;
    let lang = params
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(DEFAULT_LANG)
        .to_string();

    let lookup = state.service.search_suggestions(&query, &lang).await;
    Ok(state.render_json(lookup))
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    let blacklisted = state.service.blacklist().len().await;
    json_value_response(
        StatusCode::OK,
        &HealthResponse::healthy(blacklisted),
        Duration::ZERO,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("64"), Ok(64))]
    #[case(Some(" 1 "), Ok(1))]
    #[case(Some("1024"), Ok(1024))]
    #[case(Some("1025"), Err(()))]
    #[case(Some("0"), Err(()))]
    #[case(Some("-5"), Err(()))]
    #[case(Some("abc"), Err(()))]
    #[case(Some(""), Err(()))]
    #[case(None, Err(()))]
    fn test_parse_size(#[case] raw: Option<&str>, #[case] expected: Result<u32, ()>) {
        assert_eq!(parse_size(raw, 1024).map_err(|_| ()), expected);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format(None).unwrap(), OutputFormat::Png);
        assert_eq!(parse_format(Some("base64")).unwrap(), OutputFormat::Base64);
        assert!(parse_format(Some("gif")).is_err());
    }

    #[test]
    fn test_required() {
        assert_eq!(required("url", Some(" github.com ")).unwrap(), "github.com");
        assert!(required("url", Some("   ")).is_err());
        assert!(required("url", None).is_err());
    }
}
