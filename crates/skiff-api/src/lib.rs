//! Client library for the Skiff platform API.
//!
//! Skiff hosts containerized apps organised as projects, which own services,
//! which own apps. This crate provides:
//!
//! - [`endpoints`]: one trait per resource kind ([`Projects`], [`Services`],
//!   [`Apps`], [`RegistryCredentials`])
//! - [`Client`]: the HTTP implementation of those traits
//! - [`InMemoryPlatform`]: a local implementation for tests and demos
//! - [`LogStream`]: dual-channel log delivery
//! - [`ApiError`]: the error model shared by every operation
//!
//! # Example
//!
//! ```no_run
//! use skiff_api::{Apps, Client, ClientConfig};
//!
//! # async fn run() -> skiff_api::Result<()> {
//! let config = ClientConfig::new("https://api.skiff.example/v1/")?.with_access_token("token");
//! let client = Client::new(config)?;
//!
//! let app = client.scale("letschat", "frontend", "node", 3).await?.into_body();
//! assert_eq!(app.instances, Some(3));
//!
//! let (entries, error) = client.get_logs("letschat", "frontend", "node", 100).collect().await;
//! # let _ = (entries, error);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod logs;
pub mod memory;
pub mod metrics;
pub mod transport;
pub mod types;
pub mod validation;

pub use client::Client;
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::ClientConfig;
pub use endpoints::{Apps, Projects, RegistryCredentials, Services};
pub use error::{ApiError, ErrorKind, ErrorResponse, Result};
pub use logs::{LogScope, LogStream};
pub use memory::{InMemoryPlatform, MAX_INSTANCES, RegistryState, lets_chat_project};
pub use metrics::{DataPoint, DataPoints, Metrics, Series};
pub use transport::{ApiRequest, HttpTransport, RawResponse, RequestBody, Response, StreamingResponse, Transport};
pub use types::{App, Domain, LogEntry, PortMap, Project, ResourceKind, Service, StatusResponse, Volume};
pub use validation::{Mode, ValidationError, Violation, ViolationKind};
