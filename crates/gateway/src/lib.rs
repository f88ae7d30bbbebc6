//! HTTP surface for sluice: the forwarding fallback route, the link
//! generator API, health and the landing page.

pub mod error;
pub mod forward;
pub mod links;
pub mod server;

pub use server::{AppState, build_app, serve};
