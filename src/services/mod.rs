/// OpenAPI documentation generation.
pub mod documentation;
/// Host-only room transitions (start, reveal, next, pause, resume, reset).
pub mod host_service;
/// Player-facing operations: joining and answering.
pub mod player_service;
/// Public service for read-only room information.
pub mod public_service;
/// Countdown and auto-advance timer tasks.
pub mod question_timer;
/// Room lifecycle: creation, code allocation, and loading.
pub mod room_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage persistence coordinator with reconnect backoff.
pub mod storage_supervisor;
