use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod entities;
pub mod error;
pub mod guidance;
pub mod ledger;
pub mod routes;
pub mod store;

use crate::guidance::TextGenerator;
use crate::ledger::{AggregationEngine, CommunitySettings, RetryPolicy, TransactionRecorder};
use crate::store::LedgerStore;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub recorder: Arc<TransactionRecorder>,
    pub views: Arc<AggregationEngine>,
    /// `None` when no text generator is configured; guidance routes answer 503.
    pub guidance: Option<Arc<dyn TextGenerator>>,
    pub community: CommunitySettings,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self {
            recorder: Arc::new(TransactionRecorder::new(store.clone(), retry)),
            views: Arc::new(AggregationEngine::new(store.clone())),
            store,
            guidance: None,
            community: CommunitySettings::default(),
        }
    }

    pub fn with_guidance(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.guidance = Some(generator);
        self
    }

    pub fn with_community(mut self, community: CommunitySettings) -> Self {
        self.community = community;
        self
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Barakah Ledger API",
        version = "0.1.0",
        description = "Interest-free community funding: requests, contributions and the public ledger"
    ),
    paths(
        health_check,
        routes::businesses::create_business,
        routes::businesses::borrower_businesses,
        routes::requests::create_request,
        routes::requests::discover_requests,
        routes::requests::request_summary,
        routes::requests::track_record,
        routes::requests::record_transaction,
        routes::dashboard::contributor_dashboard,
        routes::dashboard::borrower_repayments,
        routes::dashboard::borrower_requests,
        routes::ledger::public_ledger,
        routes::community::community_progress,
        routes::community::contribution_guidance,
        routes::admin::fraud_analysis,
        routes::users::register_user,
    ),
    components(schemas(
        ledger::FundingRequest,
        ledger::Transaction,
        ledger::TransactionType,
        ledger::TransactionStatus,
        ledger::RequestStatus,
        ledger::BusinessProfile,
        ledger::RequestTotals,
        ledger::RequestSummary,
        ledger::ContributorData,
        ledger::ContributorStats,
        ledger::PublicLedgerEntry,
        ledger::BusinessTrackRecord,
        ledger::CommunityProgress,
        ledger::DiscoverCard,
        guidance::GuidanceInput,
        guidance::GuidanceOutput,
        guidance::FraudAnalysisOutput,
        routes::businesses::CreateBusinessBody,
        routes::requests::CreateRequestBody,
        routes::requests::RecordTransactionBody,
        routes::admin::FraudAnalysisBody,
        routes::users::RegisterUserBody,
    ))
)]
pub struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/businesses", post(routes::businesses::create_business))
        .route("/borrowers/{id}/businesses", get(routes::businesses::borrower_businesses))
        .route(
            "/requests",
            get(routes::requests::discover_requests).post(routes::requests::create_request),
        )
        .route("/requests/{id}", get(routes::requests::request_summary))
        .route(
            "/requests/{id}/transactions",
            get(routes::requests::track_record).post(routes::requests::record_transaction),
        )
        .route("/contributors/{id}/dashboard", get(routes::dashboard::contributor_dashboard))
        .route("/borrowers/{id}/repayments", get(routes::dashboard::borrower_repayments))
        .route("/borrowers/{id}/requests", get(routes::dashboard::borrower_requests))
        .route("/ledger", get(routes::ledger::public_ledger))
        .route("/community/progress", get(routes::community::community_progress))
        .route("/community/guidance", post(routes::community::contribution_guidance))
        .route("/admin/fraud-analysis", post(routes::admin::fraud_analysis))
        .route("/users/{id}", put(routes::users::register_user))
        .with_state(state);

    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(api_routes)
        .merge(docs_router)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Wraps the app in a per-client-IP rate limit of `per_minute` requests.
///
/// The key extractor falls back to the peer address, so the server must be
/// started with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn with_rate_limit(app: Router, per_minute: u32) -> Router {
    let replenish = Duration::from_millis((60_000 / u64::from(per_minute.max(1))).max(1));
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .period(replenish)
        .burst_size(per_minute.max(1))
        .finish();

    match governor_conf {
        Some(config) => app.layer(GovernorLayer { config: Arc::new(config) }),
        None => {
            tracing::warn!(per_minute, "invalid rate limit, serving without one");
            app
        }
    }
}
