use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::matches::{
        ChangePeriodRequest, CommandResponse, DeclareLineupRequest, FillVacancyRequest,
        MatchSnapshot, MatchSummary, RecordBasketRequest, RecordFoulRequest,
        RecordSubstitutionRequest, RecordTimeoutRequest, RosterResponse, ScheduleMatchRequest,
        SetClockRequest, TickClockRequest,
    },
    error::AppError,
    services::match_service,
    state::{SharedState, events::MatchEvent},
};

const SCORER_TOKEN_HEADER: &str = "x-scorer-token";

/// Read-only match endpoints open to every viewer.
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/events", get(list_events))
        .route("/matches/{id}/roster", get(get_roster))
}

/// Scorer-only endpoints that change match state.
pub fn scorer_router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/matches", post(schedule_match))
        .route("/matches/{id}/lineups", post(declare_lineup))
        .route("/matches/{id}/clock", axum::routing::put(set_clock))
        .route("/matches/{id}/clock/start", post(start_clock))
        .route("/matches/{id}/clock/stop", post(stop_clock))
        .route("/matches/{id}/clock/tick", post(tick_clock))
        .route("/matches/{id}/baskets", post(record_basket))
        .route("/matches/{id}/fouls", post(record_foul))
        .route("/matches/{id}/substitutions", post(record_substitution))
        .route("/matches/{id}/vacancies", post(fill_vacancy))
        .route("/matches/{id}/timeouts", post(record_timeout))
        .route("/matches/{id}/periods", post(change_period))
        .route("/matches/{id}/end", post(end_match))
        .route("/matches/{id}/cancel", post(cancel_match))
        .route("/matches/{id}/restore", post(restore_match))
        .route_layer(middleware::from_fn_with_state(state, require_scorer_token))
}

/// List every match loaded in memory.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    responses((status = 200, description = "Loaded matches, oldest first", body = [MatchSummary]))
)]
pub async fn list_matches(State(state): State<SharedState>) -> Json<Vec<MatchSummary>> {
    Json(match_service::list_matches(&state).await)
}

/// Current snapshot of a match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Match snapshot", body = MatchSnapshot),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::get_snapshot(&state, id).await?))
}

/// Event log of a match in chronological order.
#[utoipa::path(
    get,
    path = "/matches/{id}/events",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses((status = 200, description = "Match events", body = [MatchEvent]))
)]
pub async fn list_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MatchEvent>>, AppError> {
    Ok(Json(match_service::list_events(&state, id).await?))
}

/// Box score of every declared player.
#[utoipa::path(
    get,
    path = "/matches/{id}/roster",
    tag = "matches",
    params(("id" = Uuid, Path, description = "Match identifier")),
    responses((status = 200, description = "Match roster", body = RosterResponse))
)]
pub async fn get_roster(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RosterResponse>, AppError> {
    Ok(Json(match_service::get_roster(&state, id).await?))
}

/// Schedule a new match.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "scorer",
    params(("X-Scorer-Token" = String, Header, description = "Scorer token")),
    request_body = ScheduleMatchRequest,
    responses(
        (status = 201, description = "Match scheduled", body = MatchSnapshot),
        (status = 400, description = "Invalid teams or rules")
    )
)]
pub async fn schedule_match(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<ScheduleMatchRequest>>,
) -> Result<(StatusCode, Json<MatchSnapshot>), AppError> {
    let snapshot = match_service::schedule_match(&state, request).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Declare a team's players and starting five.
#[utoipa::path(
    post,
    path = "/matches/{id}/lineups",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = DeclareLineupRequest,
    responses((status = 200, description = "Lineup declared", body = CommandResponse))
)]
pub async fn declare_lineup(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<DeclareLineupRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        match_service::declare_lineup(&state, id, request).await?,
    ))
}

/// Start the game clock.
#[utoipa::path(
    post,
    path = "/matches/{id}/clock/start",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses(
        (status = 200, description = "Clock running", body = CommandResponse),
        (status = 409, description = "Match is over or the period clock expired")
    )
)]
pub async fn start_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::start_clock(&state, id).await?))
}

/// Stop the game clock.
#[utoipa::path(
    post,
    path = "/matches/{id}/clock/stop",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses((status = 200, description = "Clock stopped", body = CommandResponse))
)]
pub async fn stop_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::stop_clock(&state, id).await?))
}

/// Correct the remaining time of the current period.
#[utoipa::path(
    put,
    path = "/matches/{id}/clock",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = SetClockRequest,
    responses((status = 200, description = "Clock updated", body = CommandResponse))
)]
pub async fn set_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<SetClockRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::set_clock(&state, id, request).await?))
}

/// Apply elapsed time measured by the scorer's table.
#[utoipa::path(
    post,
    path = "/matches/{id}/clock/tick",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = TickClockRequest,
    responses((status = 200, description = "Clock advanced", body = CommandResponse))
)]
pub async fn tick_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<TickClockRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::tick_clock(&state, id, request).await?))
}

/// Record a made basket.
#[utoipa::path(
    post,
    path = "/matches/{id}/baskets",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = RecordBasketRequest,
    responses(
        (status = 200, description = "Basket recorded", body = CommandResponse),
        (status = 409, description = "Match not in progress or player not on court")
    )
)]
pub async fn record_basket(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<RecordBasketRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        match_service::record_basket(&state, id, request).await?,
    ))
}

/// Record a foul.
#[utoipa::path(
    post,
    path = "/matches/{id}/fouls",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = RecordFoulRequest,
    responses((status = 200, description = "Foul recorded", body = CommandResponse))
)]
pub async fn record_foul(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<RecordFoulRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::record_foul(&state, id, request).await?))
}

/// Record a substitution.
#[utoipa::path(
    post,
    path = "/matches/{id}/substitutions",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = RecordSubstitutionRequest,
    responses((status = 200, description = "Substitution recorded", body = CommandResponse))
)]
pub async fn record_substitution(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<RecordSubstitutionRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        match_service::record_substitution(&state, id, request).await?,
    ))
}

/// Fill a slot left open by a disqualification.
#[utoipa::path(
    post,
    path = "/matches/{id}/vacancies",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = FillVacancyRequest,
    responses((status = 200, description = "Player sent on court", body = CommandResponse))
)]
pub async fn fill_vacancy(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<FillVacancyRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::fill_vacancy(&state, id, request).await?))
}

/// Record a timeout.
#[utoipa::path(
    post,
    path = "/matches/{id}/timeouts",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = RecordTimeoutRequest,
    responses(
        (status = 200, description = "Timeout recorded", body = CommandResponse),
        (status = 422, description = "No timeouts left")
    )
)]
pub async fn record_timeout(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<RecordTimeoutRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        match_service::record_timeout(&state, id, request).await?,
    ))
}

/// Move to the next period.
#[utoipa::path(
    post,
    path = "/matches/{id}/periods",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    request_body = ChangePeriodRequest,
    responses((status = 200, description = "Period changed or match finished", body = CommandResponse))
)]
pub async fn change_period(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(request)): Valid<Json<ChangePeriodRequest>>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(
        match_service::change_period(&state, id, request).await?,
    ))
}

/// Finish a match in progress.
#[utoipa::path(
    post,
    path = "/matches/{id}/end",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses((status = 200, description = "Match finished", body = CommandResponse))
)]
pub async fn end_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::end_match(&state, id).await?))
}

/// Call a match off.
#[utoipa::path(
    post,
    path = "/matches/{id}/cancel",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses((status = 200, description = "Match cancelled", body = CommandResponse))
)]
pub async fn cancel_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommandResponse>, AppError> {
    Ok(Json(match_service::cancel_match(&state, id).await?))
}

/// Load a stored match back into memory.
#[utoipa::path(
    post,
    path = "/matches/{id}/restore",
    tag = "scorer",
    params(
        ("X-Scorer-Token" = String, Header, description = "Scorer token"),
        ("id" = Uuid, Path, description = "Match identifier")
    ),
    responses(
        (status = 200, description = "Match loaded", body = MatchSnapshot),
        (status = 404, description = "Match was never stored")
    )
)]
pub async fn restore_match(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    Ok(Json(match_service::restore_match(&state, id).await?))
}

async fn require_scorer_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(SCORER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing scorer token header `X-Scorer-Token`".into())
        })?;

    if provided != state.config().scorer_token() {
        return Err(AppError::Unauthorized("invalid scorer token".into()));
    }
    Ok(next.run(req).await)
}
