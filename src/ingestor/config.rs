fn default_port() -> u16 {
    30047
}

fn default_reconnect_interval_ms() -> u64 {
    15_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_read_timeout_ms() -> u64 {
    250
}

/// `[feed]` section: where the aircraft JSON stream is read from.
#[derive(serde::Deserialize, Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl FeedConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{0}:{1}", self.host, self.port)
    }

    #[must_use]
    pub fn reconnect_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Never zero; a zero read timeout is rejected by the socket.
    #[must_use]
    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.read_timeout_ms.max(1))
    }
}
