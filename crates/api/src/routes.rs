use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use zenpro_core::domain::BrokerParsed;
use zenpro_core::lookup::find_broker;
use zenpro_core::ranking::{sort_by_score, top_by_experience, top_by_regulation, top_by_score};
use zenpro_core::risk::RiskPolicy;
use zenpro_core::storage::{load_broker, load_brokers, BrokerSource};
use zenpro_core::views::{cards, BrokerCard, BrokerDetail, HomeViews, PageMetadata, ViewLimits};

const DEFAULT_RANKING_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn BrokerSource>,
    pub limits: ViewLimits,
    pub policy: RiskPolicy,
    pub site_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/brokers", get(list_brokers))
        .route("/api/brokers/:code", get(get_broker))
        .route("/api/home", get(home))
        .route("/api/rankings/:view", get(ranking))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

async fn list_brokers(State(state): State<AppState>) -> Json<Vec<BrokerParsed>> {
    let brokers = load_brokers(state.source.as_ref()).await;
    Json(sort_by_score(&brokers))
}

async fn get_broker(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<BrokerDetail>, ApiError> {
    let broker = match load_broker(state.source.as_ref(), &code).await {
        Some(b) => Some(b),
        // Cards link by name slug, which the source lookup does not know about.
        None => {
            let brokers = load_brokers(state.source.as_ref()).await;
            find_broker(&brokers, &code).cloned()
        }
    };

    let Some(broker) = broker else {
        tracing::debug!(%code, "broker not found");
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Broker not found",
                "metadata": PageMetadata::not_found(),
            })),
        ));
    };

    Ok(Json(BrokerDetail::build(
        broker,
        &state.policy,
        &state.site_name,
    )))
}

#[derive(Debug, Serialize)]
struct HomeResponse {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    views: HomeViews,
}

async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    let brokers = load_brokers(state.source.as_ref()).await;
    Json(HomeResponse {
        generated_at: Utc::now(),
        views: HomeViews::build(&brokers, &state.limits, &state.policy),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RankingView {
    Score,
    Regulation,
    Experience,
    Risky,
}

impl RankingView {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "score" => Some(Self::Score),
            "regulation" => Some(Self::Regulation),
            "experience" => Some(Self::Experience),
            "risky" => Some(Self::Risky),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RankingQuery {
    limit: Option<usize>,
}

async fn ranking(
    State(state): State<AppState>,
    Path(view): Path<String>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<BrokerCard>>, ApiError> {
    let Some(view) = RankingView::parse(&view) else {
        return Err(not_found("Unknown ranking view"));
    };
    let limit = query.limit.unwrap_or(DEFAULT_RANKING_LIMIT);

    let brokers = load_brokers(state.source.as_ref()).await;
    let selected = match view {
        RankingView::Score => top_by_score(&brokers, limit),
        RankingView::Regulation => top_by_regulation(&brokers, limit),
        RankingView::Experience => top_by_experience(&brokers, limit),
        RankingView::Risky => state.policy.risky_brokers(&sort_by_score(&brokers), limit),
    };

    Ok(Json(cards(&selected, &state.policy)))
}
