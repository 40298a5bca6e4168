//! # neptune-websock
//!
//! WebSocket session hub and client actor.
//!
//! The server side accepts upgrades with axum, registers each connection
//! as a [`Session`] in a [`Hub`], and runs a reader and writer per session.
//! The client side ([`WsClient`]) dials a server and exposes the same
//! frame model through callbacks.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod server;

pub use client::{ClientCallbacks, WsClient};
pub use config::WsConfig;
pub use connection::Session;
pub use error::{ClientError, ServerError, WsError};
pub use handlers::{Dispatcher, HandlerFuture};
pub use hub::{Hub, HubCallbacks};
pub use protocol::{CloseCode, Envelope, Frame, FrameKind, WsHeader, WsMessage};
pub use server::{WsServer, WsState};
