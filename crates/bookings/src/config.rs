use std::net::SocketAddr;

/// Environment variable naming the booking business
pub const ENV_BUSINESS_ID: &str = "MICROSOFT_BOOKINGS_BUSINESS_ID";

/// Environment variable overriding the HTTP listen address
pub const ENV_BIND_ADDR: &str = "BOOKINGS_BIND_ADDR";

/// Default HTTP listen address
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 3001);

/// Booking service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingsConfig {
    /// Booking business id; `None` leaves the service unconfigured
    pub business_id: Option<String>,
    pub bind_addr: SocketAddr,
}

impl Default for BookingsConfig {
    fn default() -> Self {
        Self {
            business_id: None,
            bind_addr: DEFAULT_BIND_ADDR,
        }
    }
}

impl BookingsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset and
    /// an unparseable bind address falls back to the default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            business_id: non_blank(ENV_BUSINESS_ID),
            bind_addr: non_blank(ENV_BIND_ADDR)
                .and_then(|addr| addr.trim().parse().ok())
                .unwrap_or(DEFAULT_BIND_ADDR),
        }
    }

    pub fn with_business_id(mut self, business_id: impl Into<String>) -> Self {
        self.business_id = Some(business_id.into());
        self
    }

    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.business_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = BookingsConfig::from_lookup(lookup(&[
            (ENV_BUSINESS_ID, "contoso@contoso.onmicrosoft.com"),
            (ENV_BIND_ADDR, "0.0.0.0:8080"),
        ]));
        assert!(config.is_configured());
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn test_blank_and_invalid_values() {
        let config = BookingsConfig::from_lookup(lookup(&[
            (ENV_BUSINESS_ID, "  "),
            (ENV_BIND_ADDR, "not-an-address"),
        ]));
        assert!(!config.is_configured());
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }
}
