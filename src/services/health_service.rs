use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the match store answers, with the number of loaded matches.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let live_matches = state.match_handles().len();
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(live_matches),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(live_matches)
        }
    }
}
