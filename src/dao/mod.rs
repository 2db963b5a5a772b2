/// Match storage abstraction and the in-memory backend.
pub mod match_store;
/// Persisted representations of live matches.
pub mod models;
/// Storage error types.
pub mod storage;
