//! Socket and accept-loop options.

/// Default size of the single read performed per connection.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 128;

/// Options applied when a [`Server`](super::Server) creates and drives its socket.
///
/// # Examples
///
/// ```
/// use barehttp::server::ServerConfig;
///
/// let config = ServerConfig::default().read_buffer_size(4096).reuse_address(false);
/// assert_eq!(config.read_buffer_size, 4096);
/// assert!(!config.reuse_address);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Set `SO_REUSEADDR` before binding. Failing to set it is logged, not fatal.
    pub reuse_address: bool,
    /// Upper bound on the bytes read from each client. Anything past this
    /// bound is not read, so oversized header blocks arrive truncated.
    pub read_buffer_size: usize,
    pub backlog: u32,
}

impl ServerConfig {
    #[must_use]
    pub fn reuse_address(mut self, enabled: bool) -> Self {
        self.reuse_address = enabled;
        self
    }

    /// Sets the per-connection read bound. Zero is raised to one byte.
    #[must_use]
    pub fn read_buffer_size(mut self, bytes: usize) -> Self {
        self.read_buffer_size = bytes.max(1);
        self
    }

    #[must_use]
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            reuse_address: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            backlog: DEFAULT_BACKLOG,
        }
    }
}
