use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::reference::{BBox, GeoError, LoadReport, MatchSource, Resolution, ResolveLevel};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

impl From<GeoError> for ApiError {
    fn from(e: GeoError) -> Self {
        let status = if e.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError(status, e.to_string())
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(api_error(StatusCode::BAD_REQUEST, format!("Missing '{}' parameter", name))),
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ─── GET /api/countries ──────────────────────────────────────────

#[derive(Serialize)]
pub struct CountryEntry {
    pub name: String,
    pub iso_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MatchSource>,
}

pub async fn countries(State(state): State<Arc<AppState>>) -> Json<Vec<CountryEntry>> {
    let resolver = &state.resolver;
    let names = resolver.name_map();
    let list = resolver
        .countries()
        .into_iter()
        .map(|name| {
            let entry = names.entry(name);
            CountryEntry {
                name: name.to_string(),
                iso_code: entry.map(|e| e.iso_code.clone()),
                source: entry.map(|e| e.source),
            }
        })
        .collect();
    Json(list)
}

// ─── GET /api/subdivisions ───────────────────────────────────────

#[derive(Deserialize)]
pub struct SubdivisionsQuery {
    pub country: Option<String>,
}

#[derive(Serialize)]
pub struct SubdivisionsResponse {
    pub country: String,
    pub iso_code: String,
    pub subdivisions: Vec<String>,
}

pub async fn subdivisions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SubdivisionsQuery>,
) -> Result<Json<SubdivisionsResponse>, ApiError> {
    let country = required(&params.country, "country")?;
    let iso = state.resolver.require_iso(country)?;

    Ok(Json(SubdivisionsResponse {
        country: country.to_string(),
        iso_code: iso.to_string(),
        subdivisions: state.resolver.subdivisions_of(iso).into_iter().map(String::from).collect(),
    }))
}

// ─── GET /api/cities ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CitiesQuery {
    pub country: Option<String>,
    pub subdivision: Option<String>,
}

#[derive(Serialize)]
pub struct CitiesResponse {
    pub country: String,
    pub subdivision: String,
    pub subdivision_code: String,
    pub cities: Vec<String>,
}

pub async fn cities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CitiesQuery>,
) -> Result<Json<CitiesResponse>, ApiError> {
    let country = required(&params.country, "country")?;
    let subdivision = required(&params.subdivision, "subdivision")?;
    let resolver = &state.resolver;

    let iso = resolver.require_iso(country)?;
    let code = resolver.require_subdivision_code(iso, subdivision)?;

    Ok(Json(CitiesResponse {
        country: country.to_string(),
        subdivision: subdivision.to_string(),
        subdivision_code: code.to_string(),
        cities: resolver.cities_in(iso, code).into_iter().map(String::from).collect(),
    }))
}

// ─── GET /api/bounds ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BoundsQuery {
    pub country: Option<String>,
    pub subdivision: Option<String>,
}

#[derive(Serialize)]
pub struct BoundsResponse {
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision: Option<String>,
    pub bbox: BBox,
}

pub async fn bounds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundsQuery>,
) -> Result<Json<BoundsResponse>, ApiError> {
    let country = required(&params.country, "country")?;
    let subdivision = optional(&params.subdivision);
    let resolver = &state.resolver;

    let bbox = match subdivision {
        Some(name) => resolver.bounds_for_subdivision(resolver.require_iso(country)?, name)?,
        None => resolver.bounds_for_country(country)?,
    };

    Ok(Json(BoundsResponse {
        country: country.to_string(),
        subdivision: subdivision.map(String::from),
        bbox,
    }))
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub level: Option<String>,
    pub country: Option<String>,
    pub subdivision: Option<String>,
    pub city: Option<String>,
}

/// Without an explicit level, the deepest level the inputs name.
fn implied_level(params: &ResolveQuery) -> ResolveLevel {
    if optional(&params.city).is_some() {
        ResolveLevel::City
    } else if optional(&params.subdivision).is_some() {
        ResolveLevel::Subdivision
    } else if optional(&params.country).is_some() {
        ResolveLevel::Country
    } else {
        ResolveLevel::Global
    }
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let start = Instant::now();

    let level = match optional(&params.level) {
        Some(l) => l.parse::<ResolveLevel>().map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        None => implied_level(&params),
    };
    let country = optional(&params.country).unwrap_or("");
    let resolution = state.resolver.resolve_detailed(
        level,
        country,
        optional(&params.subdivision),
        optional(&params.city),
    );

    tracing::info!(
        ?level,
        country,
        reached = %resolution.reached,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/resolve"
    );

    Ok(Json(resolution))
}

// ─── GET /api/status ─────────────────────────────────────────────

pub async fn status(State(state): State<Arc<AppState>>) -> Json<LoadReport> {
    Json(state.resolver.report().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{GeoFilter, GeoResolver, SelectionState};
    use crate::reference::fixtures;
    use tempfile::TempDir;

    fn state() -> Arc<AppState> {
        let dir = TempDir::new().unwrap();
        let config = fixtures::write_all(dir.path(), true);
        let (resolver, _) = GeoResolver::load(&config).unwrap();
        Arc::new(AppState { resolver: Arc::new(resolver) })
    }

    fn status_of<T>(r: Result<T, ApiError>) -> StatusCode {
        match r {
            Ok(_) => StatusCode::OK,
            Err(e) => e.0,
        }
    }

    #[tokio::test]
    async fn test_countries_lists_mapping() {
        let Json(list) = countries(State(state())).await;
        let us = list.iter().find(|c| c.name == "United States of America").unwrap();
        assert_eq!(us.iso_code.as_deref(), Some("US"));
        assert_eq!(us.source, Some(MatchSource::Override));
        let flat = list.iter().find(|c| c.name == "Flatland").unwrap();
        assert!(flat.iso_code.is_none());
    }

    #[tokio::test]
    async fn test_subdivisions_requires_country() {
        let s = state();
        let r = subdivisions(State(s.clone()), Query(SubdivisionsQuery { country: None })).await;
        assert_eq!(status_of(r), StatusCode::BAD_REQUEST);

        let r = subdivisions(State(s.clone()), Query(SubdivisionsQuery { country: Some("Atlantis".into()) })).await;
        assert_eq!(status_of(r), StatusCode::NOT_FOUND);

        let Json(body) = subdivisions(State(s), Query(SubdivisionsQuery { country: Some("Japan".into()) }))
            .await
            .ok()
            .unwrap();
        assert_eq!(body.iso_code, "JP");
        assert_eq!(body.subdivisions, vec!["Osaka", "Tokyo"]);
    }

    #[tokio::test]
    async fn test_cities_by_subdivision_name() {
        let q = CitiesQuery {
            country: Some("United States of America".into()),
            subdivision: Some("Illinois".into()),
        };
        let Json(body) = cities(State(state()), Query(q)).await.ok().unwrap();
        assert_eq!(body.subdivision_code, "IL");
        assert_eq!(body.cities.first().map(String::as_str), Some("Chicago"));
    }

    #[tokio::test]
    async fn test_bounds_subdivision_not_found() {
        let q = BoundsQuery {
            country: Some("United States of America".into()),
            subdivision: Some("Massachusetts".into()),
        };
        assert_eq!(status_of(bounds(State(state()), Query(q)).await), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resolve_implies_level() {
        let q = ResolveQuery {
            level: None,
            country: Some("Japan".into()),
            subdivision: Some("Tokyo".into()),
            city: Some("Tokyo".into()),
        };
        let Json(res) = resolve(State(state()), Query(q)).await.ok().unwrap();
        assert_eq!(res.reached, SelectionState::CitySelected);
        assert!(matches!(res.filter, GeoFilter::Point { .. }));
    }

    #[tokio::test]
    async fn test_resolve_rejects_unknown_level() {
        let q = ResolveQuery {
            level: Some("galaxy".into()),
            country: None,
            subdivision: None,
            city: None,
        };
        assert_eq!(status_of(resolve(State(state()), Query(q)).await), StatusCode::BAD_REQUEST);
    }
}
