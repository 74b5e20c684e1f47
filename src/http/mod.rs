//! HTTP response building module
//!
//! Translates envelopes into hyper responses, decoupled from dispatch logic.

pub mod response;

pub use response::{build_envelope_response, build_preflight_response};
