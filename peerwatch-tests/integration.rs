//! Integration tests for Peerwatch
//!
//! Catalog access against a fake instance served over real HTTP, and the
//! fetch/playback actors wired together on one signal bus.

#[path = "support/fake_instance.rs"]
mod fake_instance;

#[path = "support/session.rs"]
mod session;

#[path = "integration/scenarios.rs"]
mod scenarios;

#[path = "integration/catalog_http.rs"]
mod catalog_http;

#[path = "integration/session_flow.rs"]
mod session_flow;

#[path = "integration/signal_order.rs"]
mod signal_order;
