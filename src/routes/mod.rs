use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod matches;
pub mod sse;

/// Compose the public, scorer, stream and documentation routes over the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(matches::public_router())
        .merge(matches::scorer_router(state.clone()));

    api_router.merge(docs::router()).with_state(state)
}
