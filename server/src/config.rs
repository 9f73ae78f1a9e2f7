//! Server tunables. The binary fills these from command-line arguments.

use plantation_shared::framing::DEFAULT_MAX_FRAME_LEN;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Lobby size that starts the session without an operator.
    pub auto_start_players: usize,
    /// Fewest players a session can start or continue with.
    pub min_players: usize,
    pub total_cycles: u32,
    /// Attacks are rejected while the cycle is at or below this.
    pub peace_cycles: u32,
    pub starting_soldiers: u32,
    pub max_frame_len: usize,
    /// Fixed seed for shuffles, refunds and steals. Entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            auto_start_players: 4,
            min_players: 2,
            total_cycles: 15,
            peace_cycles: 5,
            starting_soldiers: 1000,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            rng_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_classic_game() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.auto_start_players, 4);
        assert_eq!(config.min_players, 2);
        assert_eq!(config.total_cycles, 15);
        assert_eq!(config.peace_cycles, 5);
        assert_eq!(config.starting_soldiers, 1000);
        assert!(config.rng_seed.is_none());
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:0");
    }
}
