//! Facade configuration

/// Facade configuration
///
/// `client` is the tenant identifier stamped on every record and implicitly
/// filtered on by every query; it is the isolation boundary between
/// publishers sharing one backend namespace.
#[derive(Clone, Debug)]
pub struct Config {
    /// Tenant identifier (required)
    pub client: String,
    /// Public gateway URL template with a `{cid}` placeholder
    pub public_gateway: String,
    /// Private (authenticated) gateway URL template with a `{cid}` placeholder
    pub private_gateway: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: String::new(),
            public_gateway: "https://gateway.pinata.cloud/ipfs/{cid}".to_string(),
            private_gateway: "https://gateway.pinata.cloud/ipfs/{cid}".to_string(),
        }
    }
}

impl Config {
    /// Create a new config for the given tenant
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            ..Default::default()
        }
    }

    /// Set the public gateway template
    pub fn with_public_gateway(mut self, template: impl Into<String>) -> Self {
        self.public_gateway = template.into();
        self
    }

    /// Set the private gateway template
    pub fn with_private_gateway(mut self, template: impl Into<String>) -> Self {
        self.private_gateway = template.into();
        self
    }
}
