pub mod blocking;
pub mod config;
pub mod error;
pub mod event_log;
pub mod notifier;
pub mod state_store;
pub mod storage;
pub mod timer_repository;
pub mod tip_generator;
