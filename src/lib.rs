// ABOUTME: Root library module exposing all public modules
// ABOUTME: Provides access to the classifier, router, session store, transport, and server

pub mod agents;
pub mod config;
pub mod event;
pub mod responders;
pub mod router;
pub mod server;
pub mod session;
pub mod sweeper;
pub mod texts;
pub mod transport;
