use pong_shared::config::GameConfig;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub game: GameConfig,
    /// Seed for serve randomness. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Outbound messages buffered per session before snapshots are dropped
    pub outbox_capacity: usize,
    pub max_connections: usize,
    /// Accepted `Origin` header values. Empty accepts any origin.
    pub allowed_origins: Vec<String>,
    pub max_message_bytes: usize,
    pub ping_interval: Duration,
    /// Connection is closed after this long without inbound frames
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            game: GameConfig::default(),
            rng_seed: None,
            outbox_capacity: 64,
            max_connections: 1000,
            allowed_origins: Vec::new(),
            max_message_bytes: 4096,
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `PONG_ALLOWED_ORIGINS`, `PONG_RNG_SEED`
    /// and `PONG_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| format!("PORT is not a valid port: {:?}", port))?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(origins) = lookup("PONG_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(seed) = lookup("PONG_RNG_SEED") {
            let seed = seed
                .trim()
                .parse()
                .map_err(|_| format!("PONG_RNG_SEED is not a u64: {:?}", seed))?;
            config.rng_seed = Some(seed);
        }
        if let Some(max) = lookup("PONG_MAX_CONNECTIONS") {
            config.max_connections = max
                .trim()
                .parse()
                .map_err(|_| format!("PONG_MAX_CONNECTIONS is not a number: {:?}", max))?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.game.validate()?;
        if self.outbox_capacity == 0 {
            return Err("outbox_capacity must be > 0".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        if self.ping_interval.is_zero() || self.idle_timeout <= self.ping_interval {
            return Err("idle_timeout must exceed a non-zero ping_interval".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_server_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "9100"),
            ("PONG_ALLOWED_ORIGINS", "http://localhost:8080, https://pong.example ,"),
            ("PONG_RNG_SEED", "7"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9100");
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:8080", "https://pong.example"]
        );
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn missing_env_keeps_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.outbox_capacity, 64);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("PORT", "70000")])).is_err());
    }

    #[test]
    fn zero_outbox_invalid() {
        let config = ServerConfig {
            outbox_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
