mod http_transport;
mod prepared_upstream;

pub use http_transport::{error_for_upstream_status, HttpTransport};
pub use prepared_upstream::PreparedUpstream;
