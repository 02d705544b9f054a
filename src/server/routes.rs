use axum::Router;
use axum::routing::get;

use crate::server::AppState;
use crate::server::handlers::{
    handle_debate, handle_debate_analysis, handle_debates, handle_healthcheck,
    handle_politician_activity, handle_vote,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handle_healthcheck))
        .route("/debates/", get(handle_debates))
        .route("/debates/:year/:month/:day/", get(handle_debate))
        .route(
            "/debates/:year/:month/:day/text-analysis/",
            get(handle_debate_analysis),
        )
        .route("/votes/:session/:number/", get(handle_vote))
        .route(
            "/politicians/:slug/activity/",
            get(handle_politician_activity),
        )

        .with_state(state)
}
