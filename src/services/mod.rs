/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Live match commands and queries.
pub mod match_service;
/// Write-behind persistence of match state.
pub mod persistence;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Per-match Server-Sent Events streams.
pub mod sse_service;
