pub struct Config {
    pub listen_addr: String,
    /// Set TCP_NODELAY on accepted client sockets.
    pub nodelay: bool,
}

impl Config {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Config {
            listen_addr: listen_addr.into(),
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "127.0.0.1:1080".to_owned(),
            nodelay: true,
        }
    }
}
