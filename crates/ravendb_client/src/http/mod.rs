//! HTTP layer.
//!
//! The transport is abstracted behind [`HttpClient`] so the executor can run
//! against `reqwest`, an in-process loopback server, or a test double.

mod client;
mod executor;
mod loopback;

pub use client::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestHttpClient, TransportError};
pub use executor::{RavenCommand, RequestExecutor, ServerNode};
pub use loopback::{LoopbackClient, LoopbackServer};
