//! Utility functions shared by the flows and the terminal front end.
//!
//! - **Endpoints**: credential-safe endpoint checks and query construction
//! - **Text**: width-aware truncation, excerpts, HTML and control-char stripping
//! - **Body limits**: capped reads of HTTP response bodies

mod endpoint;
mod limits;
mod text;

pub use endpoint::{check_credential_endpoint, with_query, EndpointError};
pub use limits::{read_limited_bytes, BodyError};
pub use text::{excerpt, strip_control_chars, strip_html, truncate_to_width};
