use serde::{Deserialize, Serialize};

/// Options for reaching the DevTools endpoint of an already running browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Host of the CDP HTTP endpoint
    pub host: String,

    /// Remote debugging port
    pub port: u16,

    /// Overall deadline for finding or creating a page target (milliseconds)
    pub timeout: u64,

    /// Deadline for opening the debugger WebSocket (milliseconds)
    pub connect_timeout: u64,

    /// Deadline for a single CDP command (milliseconds)
    pub command_timeout: u64,

    /// Interval between `/json/list` polls (milliseconds)
    pub discovery_poll: u64,

    /// How long a freshly created tab may take to get a debugger URL (milliseconds)
    pub created_target_wait: u64,

    /// Fall back to any open page when no tab for the target host shows up
    pub reuse_any_page: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9222,
            timeout: 15_000,
            connect_timeout: 10_000,
            command_timeout: 30_000,
            discovery_poll: 300,
            created_target_wait: 6_000,
            reuse_any_page: false,
        }
    }
}

impl ConnectionOptions {
    /// Create options for the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the target discovery timeout in milliseconds
    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the WebSocket connect timeout in milliseconds
    pub fn connect_timeout(mut self, timeout: u64) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-command timeout in milliseconds
    pub fn command_timeout(mut self, timeout: u64) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the interval between target list polls in milliseconds
    pub fn discovery_poll(mut self, interval: u64) -> Self {
        self.discovery_poll = interval;
        self
    }

    /// Set how long a created tab may take to become attachable
    pub fn created_target_wait(mut self, wait: u64) -> Self {
        self.created_target_wait = wait;
        self
    }

    /// Allow falling back to any open page
    pub fn reuse_any_page(mut self, reuse: bool) -> Self {
        self.reuse_any_page = reuse;
        self
    }

    /// Base URL of the CDP HTTP endpoint
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
