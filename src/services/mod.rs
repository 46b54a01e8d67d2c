/// Background task running the clocks of attached live games.
pub mod clock_ticker;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game creation, commands, and attachment of games to this instance.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events subscription and streaming.
pub mod sse_service;
/// Storage connection supervisor driving degraded mode.
pub mod storage_supervisor;
