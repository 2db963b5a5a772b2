use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of matches loaded in memory.
    pub live_matches: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(live_matches: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_matches,
        }
    }

    /// Create a health response indicating the match store does not answer.
    pub fn degraded(live_matches: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            live_matches,
        }
    }

    /// Whether the store failed its health check.
    pub fn is_degraded(&self) -> bool {
        self.status == "degraded"
    }
}
