use std::time::Duration;

pub const DEFAULT_MAX_CLIENTS: usize = 1024;

/// Runtime settings consumed by the server core.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// In debug mode a player who digs up a bomb stays connected.
    pub debug: bool,
    /// Upper bound on simultaneously connected sessions.
    pub max_clients: usize,
    /// Close a session that sends nothing for this long. None waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_clients: DEFAULT_MAX_CLIENTS,
            idle_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}
