use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::{ClientError, Result};

/// Chooses which server receives the next request
pub trait HostManager: Send + Sync {
    /// Host for the next request
    fn host(&self) -> String;

    /// Report a host that could not be reached
    fn suspect(&self, host: &str);
}

/// Always the same host; the server cluster routes requests internally
#[derive(Debug, Clone)]
pub struct SingleHostManager {
    host: String,
}

impl SingleHostManager {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl HostManager for SingleHostManager {
    fn host(&self) -> String {
        self.host.clone()
    }

    fn suspect(&self, _host: &str) {}
}

/// Ordered host list: the first entry is used until it fails to connect,
/// then it moves behind every other host.
///
/// A suspected host becomes first again only after all the others have been
/// suspected too.
#[derive(Debug)]
pub struct OrderedHostManager {
    hosts: Mutex<VecDeque<String>>,
}

impl OrderedHostManager {
    pub fn new<I, S>(hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: VecDeque<String> = hosts.into_iter().map(Into::into).collect();
        if hosts.is_empty() {
            return Err(ClientError::client("host list cannot be empty"));
        }
        Ok(Self {
            hosts: Mutex::new(hosts),
        })
    }

    /// Snapshot of the current order
    pub fn hosts(&self) -> Vec<String> {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts.iter().cloned().collect()
    }
}

impl HostManager for OrderedHostManager {
    fn host(&self) -> String {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        // Never empty: construction rejects empty lists and suspect only reorders
        hosts.front().cloned().unwrap_or_default()
    }

    fn suspect(&self, host: &str) {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = hosts.iter().position(|h| h == host) {
            if let Some(suspected) = hosts.remove(pos) {
                tracing::warn!(host = %suspected, "Moving suspected host to the end of the list");
                hosts.push_back(suspected);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_host_ignores_suspicion() {
        let manager = SingleHostManager::new("http://a:8080");
        for _ in 0..5 {
            manager.suspect("http://a:8080");
            assert_eq!(manager.host(), "http://a:8080");
        }
    }

    #[test]
    fn test_ordered_full_cycle() {
        let manager = OrderedHostManager::new(["A", "B"]).unwrap();
        assert_eq!(manager.host(), "A");

        manager.suspect("A");
        assert_eq!(manager.host(), "B");

        manager.suspect("B");
        assert_eq!(manager.host(), "A");
    }

    #[test]
    fn test_pick_is_not_round_robin() {
        let manager = OrderedHostManager::new(["A", "B", "C"]).unwrap();
        for _ in 0..3 {
            assert_eq!(manager.host(), "A");
        }
    }

    #[test]
    fn test_suspect_unknown_host_is_noop() {
        let manager = OrderedHostManager::new(["A", "B"]).unwrap();
        manager.suspect("X");
        assert_eq!(manager.host(), "A");
        assert_eq!(manager.hosts(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_suspect_moves_behind_trusted_hosts() {
        let manager = OrderedHostManager::new(["A", "B", "C"]).unwrap();
        manager.suspect("B");
        assert_eq!(manager.hosts(), vec!["A", "C", "B"]);
        manager.suspect("A");
        assert_eq!(manager.hosts(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_empty_host_list_rejected() {
        let result = OrderedHostManager::new(Vec::<String>::new());
        assert!(matches!(result, Err(ClientError::Client { .. })));
    }

    #[test]
    fn test_concurrent_suspicion_keeps_every_host() {
        let manager = Arc::new(OrderedHostManager::new(["A", "B", "C", "D"]).unwrap());

        let handles: Vec<_> = ["A", "B", "C", "D", "X"]
            .into_iter()
            .map(|host| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    for _ in 0..100 {
                        manager.suspect(host);
                        let _ = manager.host();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut hosts = manager.hosts();
        hosts.sort();
        assert_eq!(hosts, vec!["A", "B", "C", "D"]);
    }
}
