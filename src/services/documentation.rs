use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Courtside Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::match_stream,
        crate::routes::matches::list_matches,
        crate::routes::matches::get_match,
        crate::routes::matches::list_events,
        crate::routes::matches::get_roster,
        crate::routes::matches::schedule_match,
        crate::routes::matches::declare_lineup,
        crate::routes::matches::start_clock,
        crate::routes::matches::stop_clock,
        crate::routes::matches::set_clock,
        crate::routes::matches::tick_clock,
        crate::routes::matches::record_basket,
        crate::routes::matches::record_foul,
        crate::routes::matches::record_substitution,
        crate::routes::matches::fill_vacancy,
        crate::routes::matches::record_timeout,
        crate::routes::matches::change_period,
        crate::routes::matches::end_match,
        crate::routes::matches::cancel_match,
        crate::routes::matches::restore_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::PlayerDisqualifiedEvent,
            crate::dto::sse::LineupDeclaredEvent,
            crate::dto::sse::ClockEvent,
            crate::state::events::MatchEventKind,
            crate::state::roster::FoulType,
            crate::state::rules::MatchRules,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Read-only match queries"),
        (name = "scorer", description = "Match commands reserved to the scorer's table"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
