/// Game document storage backends.
pub mod game_store;
/// Storage abstraction layer for database operations.
pub mod storage;
