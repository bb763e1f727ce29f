//! Notification and static-asset cache worker for the RemoTalk web client.
//!
//! The worker handles platform events (install, activate, fetch, push,
//! notification click, page message) through [`Worker::dispatch`]. Platform
//! services are reached through the traits in [`host`], the network through
//! [`fetch::Fetcher`] and cache storage through [`cache::CacheStorage`].

pub mod cache;
pub mod click;
pub mod config;
pub mod event;
pub mod fetch;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod message;
pub mod notification;
pub mod push;
pub mod worker;

#[cfg(test)]
mod testing;

pub use worker::{Event, EventOutcome, Worker};
