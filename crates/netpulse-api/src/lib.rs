// netpulse-api: resilient request client for appliance metric endpoints

pub mod client;
pub mod error;
pub mod models;
pub mod outcome;
pub mod stats;
pub mod token;
pub mod transport;

pub use client::{CSRF_HEADER, RequestClient, RetryConfig};
pub use error::Error;
pub use models::{HistoryRows, RawSnapshot, RawTimestamp};
pub use outcome::{FailureClass, OutcomeKind, RequestOutcome, RetryPolicy};
pub use reqwest;
pub use reqwest::Method;
pub use token::{NoToken, StaticToken, TokenProvider};
pub use transport::{TlsMode, TransportConfig};
