//! ipintel library: IP-reputation aggregation.
//!
//! For each target IP the engine queries several third-party reputation and
//! geolocation providers in parallel, normalizes their answers into one
//! merged record, derives secondary judgments (usage type via voting,
//! native-vs-broadcast via registry/geo comparison, hosting flag), and can
//! stream per-IP results for a batch as they complete. An optional LLM
//! summarizer turns the derived record into Markdown.
//!
//! # Example
//!
//! ```no_run
//! use ipintel::{Config, Engine};
//! use ipintel::derive::build_record;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(Config::from_env())?;
//! let bundle = engine.check_ip("8.8.8.8", None).await;
//! let record = build_record(&bundle, None, engine.clock().now_millis());
//! println!("{} is {}", record.ip, record.summary.ip_type.value);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod derive;
mod error_handling;
pub mod exits;
mod fetcher;
pub mod initialization;
pub mod llm;
pub mod models;
pub mod providers;
pub mod server;
pub mod stream;

// Re-export the primary API at the crate root.
pub use aggregate::Engine;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{ErrorType, FetchFailure, ProcessingStats};
pub use models::{CfData, IpBundle, MergedMap, ProviderFailure, ProviderSuccess};
pub use server::{run_server, AppState};
