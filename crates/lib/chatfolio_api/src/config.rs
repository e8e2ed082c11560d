//! API server configuration.

/// Port the gateway has always listened on.
pub const DEFAULT_PORT: u16 = 8888;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8888").
    pub bind_addr: String,
}

impl ApiConfig {
    /// Listen on `host:port`.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            bind_addr: format!("{host}:{port}"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces() {
        assert_eq!(ApiConfig::default().bind_addr, "0.0.0.0:8888");
    }

    #[test]
    fn new_joins_host_and_port() {
        assert_eq!(ApiConfig::new("127.0.0.1", 0).bind_addr, "127.0.0.1:0");
    }
}
