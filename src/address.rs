use std::fmt;

/// The default port used when an address does not specify one.
pub const DEFAULT_PORT: u16 = 27017;

/// The address of a database server.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ServerAddress {
    /// The hostname of the address.
    pub hostname: String,

    /// The port of the address. `None` means the default port.
    pub port: Option<u16>,
}

impl ServerAddress {
    /// Constructs an address from a hostname and an optional port.
    pub fn new(hostname: impl Into<String>, port: impl Into<Option<u16>>) -> Self {
        Self {
            hostname: hostname.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{}:{}",
            self.hostname,
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }
}

#[cfg(test)]
mod test {
    use super::ServerAddress;

    #[test]
    fn display_includes_default_port() {
        assert_eq!(
            ServerAddress::new("example.com", None).to_string(),
            "example.com:27017"
        );
        assert_eq!(
            ServerAddress::new("example.com", 1234).to_string(),
            "example.com:1234"
        );
    }
}
