/// Configuration for the Nginx reverse proxy in front of the app.
///
/// # Example
///
/// ```
/// use dockhand::Proxy;
///
/// let proxy = Proxy::new(3000)
///     .server_name("app.example.com")
///     .client_max_body_size("20m");
///
/// assert_eq!(proxy.listen, 80);
/// assert_eq!(proxy.upstream(), "http://127.0.0.1:3000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub listen: u16,
    pub upstream_port: u16,
    pub server_name: String,
    pub client_max_body_size: Option<String>,
    pub websockets: bool,
    pub extra_directives: Vec<String>,
}

impl Proxy {
    #[must_use]
    pub fn new(upstream_port: u16) -> Self {
        Self {
            listen: 80,
            upstream_port,
            server_name: "_".to_string(),
            client_max_body_size: None,
            websockets: true,
            extra_directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = name.to_string();
        self
    }

    #[must_use]
    pub fn client_max_body_size(mut self, size: &str) -> Self {
        self.client_max_body_size = Some(size.to_string());
        self
    }

    #[must_use]
    pub const fn websockets(mut self, enabled: bool) -> Self {
        self.websockets = enabled;
        self
    }

    #[must_use]
    pub fn directive(mut self, raw: &str) -> Self {
        self.extra_directives.push(raw.to_string());
        self
    }

    /// Loopback address the proxy forwards to.
    #[must_use]
    pub fn upstream(&self) -> String {
        format!("http://127.0.0.1:{}", self.upstream_port)
    }
}
