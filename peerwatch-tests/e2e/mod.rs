//! End-to-end tests for Peerwatch
//!
//! Complete user workflows: browse a catalog served over HTTP, pick a video,
//! fetch it with the simulated engine and watch it through a scripted sink.

#[path = "../support/fake_instance.rs"]
mod fake_instance;

#[path = "../support/session.rs"]
mod session;

mod watch_workflow;
