use crate::config::AppConfig;
use crate::protocol::mapping::TranslationTables;
use crate::transport::{HttpTransport, PreparedUpstream};

/// Shared application state accessible to all handlers.
///
/// Everything here is read-only after startup; per-request stream state lives
/// in the response body stream.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub upstream: PreparedUpstream,
    pub tables: TranslationTables,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, transport: HttpTransport) -> Self {
        let upstream = PreparedUpstream::new(&config.upstream);
        let tables = TranslationTables::from_upstream(&config.upstream);
        Self {
            config,
            transport,
            upstream,
            tables,
        }
    }

    /// Build the transport from the server config as well.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        let transport = HttpTransport::new(&config.server);
        Self::new(config, transport)
    }
}
