#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub log: Log,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub host: String,
    pub port: u16,
    /// Request body limit in MiB.
    pub body_limit: u64,
    /// Per-request timeout in seconds.
    pub timeout: u64,
}

impl BackendServer {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` when the MiB limit does not fit in `usize` bytes.
    pub fn body_limit_bytes(&self) -> Option<usize> {
        self.body_limit
            .checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
    }
}

#[derive(Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout: u64,
}

// The URL usually carries the password.
impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Log {
    pub level: String,
}
