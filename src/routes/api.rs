// JSON API: targets, scheduler status, recent rows, period aggregates

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::aggregation;
use crate::config::MAX_RECENT_LIMIT;
use crate::models::{Measurement, Period, SiteAggregate};
use crate::scheduler::StatsSnapshot;

#[derive(Debug, Deserialize)]
pub(super) struct SiteQuery {
    site: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecentQuery {
    site: String,
    limit: Option<u32>,
}

/// One raw row as returned by GET /api/recent.
#[derive(Debug, Serialize)]
pub(super) struct RecentMeasurement {
    time: String,
    ttfb: f64,
    load_delay: Option<f64>,
}

impl From<Measurement> for RecentMeasurement {
    fn from(m: Measurement) -> Self {
        Self {
            time: m.timestamp_str(),
            ttfb: m.ttfb,
            load_delay: m.load_delay,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StatusResponse {
    targets: usize,
    #[serde(flatten)]
    stats: StatsSnapshot,
}

fn ensure_known_target(state: &AppState, site: &str) -> Result<(), ApiError> {
    if state.targets.iter().any(|t| t == site) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("unknown target {:?}", site)))
    }
}

/// GET /api/targets: configured targets in stagger order.
pub(super) async fn targets_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.targets.as_ref().clone())
}

/// GET /api/status: scheduler counters.
pub(super) async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        targets: state.targets.len(),
        stats: state.stats.snapshot(),
    })
}

/// GET /api/recent?site=URL&limit=N: most recent rows for one target, oldest-first.
pub(super) async fn recent_handler(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<RecentMeasurement>>, ApiError> {
    ensure_known_target(&state, &query.site)?;
    let limit = query.limit.unwrap_or(state.api.recent_limit);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be > 0".into()));
    }
    let rows = state
        .store
        .query_latest(&query.site, limit.min(MAX_RECENT_LIMIT))
        .await?;
    Ok(Json(rows.into_iter().map(RecentMeasurement::from).collect()))
}

/// GET /api/aggregate/{period}?site=URL: per-site buckets for daily, weekly or monthly.
pub(super) async fn aggregate_handler(
    State(state): State<AppState>,
    Path(period): Path<String>,
    Query(query): Query<SiteQuery>,
) -> Result<Json<Vec<SiteAggregate>>, ApiError> {
    let period: Period = period.parse()?;
    let sites: Vec<&String> = match &query.site {
        Some(site) => {
            ensure_known_target(&state, site)?;
            vec![site]
        }
        None => state.targets.iter().collect(),
    };

    let today = chrono::Local::now().date_naive();
    let mut out = Vec::with_capacity(sites.len());
    for site in sites {
        let buckets = aggregation::aggregate(state.store.as_ref(), period, site, today).await?;
        out.push(SiteAggregate {
            site: site.clone(),
            buckets,
        });
    }
    Ok(Json(out))
}
