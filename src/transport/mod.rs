//! Request executor: authenticated HTTP calls behind a single response gate.

mod http;

pub use http::{HttpTransport, TransportError};
