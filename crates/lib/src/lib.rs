//! Ayna core library: REST and real-time clients, auth and session state, and the
//! thread/directory controllers used by the CLI.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod directory;
pub mod identity;
pub mod models;
pub mod notify;
pub mod realtime;
pub mod routing;
pub mod session;
pub mod storage;
pub mod thread;
pub mod validation;
