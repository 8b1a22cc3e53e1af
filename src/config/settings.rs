use crate::wallet::DEFAULT_KEY_FILE;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::{PoisonError, RwLock};

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:3001";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const KEY_FILE_KEY: &str = "KEY_FILE";
const PEERS_KEY: &str = "PEERS";

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Seeds the settings from the process environment
    pub fn new() -> Config {
        Config::from_vars(env::vars())
    }

    pub fn from_vars<I: IntoIterator<Item = (String, String)>>(vars: I) -> Config {
        let mut map = HashMap::new();
        map.insert(
            String::from(NODE_ADDRESS_KEY),
            String::from(DEFAULT_NODE_ADDR),
        );
        map.insert(String::from(KEY_FILE_KEY), String::from(DEFAULT_KEY_FILE));

        for (key, value) in vars {
            if [NODE_ADDRESS_KEY, KEY_FILE_KEY, PEERS_KEY].contains(&key.as_str()) {
                map.insert(key, value);
            }
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    // A poisoned map is still a consistent map of strings
    fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(String::from(key), value);
    }

    pub fn get_node_addr(&self) -> String {
        self.get(NODE_ADDRESS_KEY)
            .unwrap_or_else(|| String::from(DEFAULT_NODE_ADDR))
    }

    pub fn set_node_addr(&self, addr: String) {
        self.set(NODE_ADDRESS_KEY, addr);
    }

    pub fn get_key_file(&self) -> String {
        self.get(KEY_FILE_KEY)
            .unwrap_or_else(|| String::from(DEFAULT_KEY_FILE))
    }

    pub fn set_key_file(&self, path: String) {
        self.set(KEY_FILE_KEY, path);
    }

    /// Peers to contact at startup, from the comma separated PEERS value
    pub fn get_initial_peers(&self) -> Vec<String> {
        self.get(PEERS_KEY)
            .map(|peers| {
                peers
                    .split(',')
                    .map(str::trim)
                    .filter(|peer| !peer.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_initial_peers(&self, peers: &[String]) {
        let mut all = self.get_initial_peers();
        for peer in peers {
            if !all.contains(peer) {
                all.push(peer.clone());
            }
        }
        self.set(PEERS_KEY, all.join(","));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vec![]);
        assert_eq!(config.get_node_addr(), "127.0.0.1:3001");
        assert_eq!(config.get_key_file(), DEFAULT_KEY_FILE);
        assert!(config.get_initial_peers().is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_vars(vars(&[
            ("NODE_ADDRESS", "0.0.0.0:4000"),
            ("PEERS", "127.0.0.1:3002, 127.0.0.1:3003,,"),
            ("UNRELATED", "x"),
        ]));
        assert_eq!(config.get_node_addr(), "0.0.0.0:4000");
        assert_eq!(
            config.get_initial_peers(),
            vec!["127.0.0.1:3002".to_string(), "127.0.0.1:3003".to_string()]
        );
    }

    #[test]
    fn test_setters_and_peer_merge() {
        let config = Config::from_vars(vars(&[("PEERS", "a:1")]));
        config.set_node_addr("127.0.0.1:9".to_string());
        config.set_key_file("/tmp/k".to_string());
        config.add_initial_peers(&["a:1".to_string(), "b:2".to_string()]);
        assert_eq!(config.get_node_addr(), "127.0.0.1:9");
        assert_eq!(config.get_key_file(), "/tmp/k");
        assert_eq!(config.get_initial_peers(), vec!["a:1", "b:2"]);
    }
}
