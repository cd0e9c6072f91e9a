//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::time::Duration;
use tfplug::RetryPolicy;

/// Runner timing for resource operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimeouts {
    /// Read-after-write and refresh polling
    pub read: Duration,
    /// Find-by-name searches in data sources
    pub search: Duration,
    /// Waiting for a deleted object to disappear
    pub delete: Duration,
    pub backoff: Duration,
}

impl Default for RetryTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(5 * 60),
            search: Duration::from_secs(15),
            delete: Duration::from_secs(30),
            backoff: tfplug::retry::DEFAULT_BACKOFF,
        }
    }
}

impl RetryTimeouts {
    pub fn read_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.read).with_backoff(self.backoff)
    }

    pub fn search_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.search).with_backoff(self.backoff)
    }

    pub fn delete_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.delete).with_backoff(self.backoff)
    }
}

#[derive(Clone)]
pub struct GenesysCloudProviderData {
    pub client: Client,
    pub timeouts: RetryTimeouts,
    pub bypass_consistency_checker: bool,
}

impl GenesysCloudProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeouts: RetryTimeouts::default(),
            bypass_consistency_checker: false,
        }
    }

    pub fn with_timeouts(mut self, timeouts: RetryTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_bypass_consistency_checker(mut self, bypass: bool) -> Self {
        self.bypass_consistency_checker = bypass;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let timeouts = RetryTimeouts::default();

        assert_eq!(timeouts.read_policy().timeout, Duration::from_secs(300));
        assert_eq!(timeouts.search_policy().timeout, Duration::from_secs(15));
        assert_eq!(timeouts.delete_policy().timeout, Duration::from_secs(30));
        assert_eq!(timeouts.delete_policy().backoff, Duration::from_secs(1));
    }
}
