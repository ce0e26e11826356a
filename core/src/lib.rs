//! Control tower core: the revenue-lifecycle fixture, its views, the
//! optimization lab calculator and the heartbeat engine that records
//! operator actions.

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod rule_catalog;
pub mod scenario;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod work_queue;
