use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// A proxy address that may only become known after startup.
///
/// Readers wait with a timeout until a value has been set.
#[derive(Clone)]
pub struct EventualAddr {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl EventualAddr {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn with_value(addr: impl Into<String>) -> Self {
        let eventual = Self::new();
        eventual.set(addr);
        eventual
    }

    pub fn set(&self, addr: impl Into<String>) {
        self.tx.send_replace(Some(addr.into()));
    }

    /// Returns the address without waiting, if one has been set.
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub async fn get(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.tx.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await;
        match waited {
            Ok(Ok(value)) => value.clone(),
            _ => None,
        }
    }
}

impl Default for EventualAddr {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a bare `host:port` proxy address into a URL reqwest accepts.
pub fn proxy_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}
