//! URL admission policy: which target URLs `connect_session` accepts.

use crate::error::BrokerError;
use std::collections::HashSet;
use url::Url;

/// Host allow-list and scheme check applied at connect time.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    allowed_hosts: HashSet<String>,
    allow_any_host: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        AdmissionPolicy {
            allowed_hosts: ["localhost", "127.0.0.1", "::1"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            allow_any_host: false,
        }
    }
}

impl AdmissionPolicy {
    pub fn new(allowed_hosts: impl IntoIterator<Item = String>, allow_any_host: bool) -> Self {
        AdmissionPolicy {
            allowed_hosts: allowed_hosts.into_iter().collect(),
            allow_any_host,
        }
    }

    /// Validate a candidate target URL: `ws://`/`wss://` only, host in the
    /// allow-list unless `allow_any_host` was explicitly configured.
    pub fn validate(&self, url: &Url) -> Result<(), BrokerError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(BrokerError::InvalidParameters(format!(
                    "unsupported scheme '{other}', only ws:// and wss:// are accepted"
                )))
            }
        }

        let host = url.host_str().ok_or_else(|| {
            BrokerError::InvalidParameters("target URL has no host".to_owned())
        })?;

        if self.allow_any_host || self.allowed_hosts.contains(host) {
            Ok(())
        } else {
            Err(BrokerError::InvalidParameters(format!(
                "host '{host}' is not in the connect allow-list"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_localhost_hosts() {
        let policy = AdmissionPolicy::default();
        assert!(policy.validate(&Url::parse("ws://localhost:9229/t").unwrap()).is_ok());
        assert!(policy.validate(&Url::parse("wss://127.0.0.1:9229/t").unwrap()).is_ok());
    }

    #[test]
    fn rejects_non_ws_schemes() {
        let policy = AdmissionPolicy::default();
        let err = policy
            .validate(&Url::parse("http://localhost:9229/t").unwrap())
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParameters(_)));
    }

    #[test]
    fn rejects_hosts_outside_the_allow_list() {
        let policy = AdmissionPolicy::default();
        let err = policy
            .validate(&Url::parse("ws://remote.example.com:9229/t").unwrap())
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParameters(_)));
    }

    #[test]
    fn allow_any_host_opts_in_explicitly() {
        let policy = AdmissionPolicy::new(std::iter::empty(), true);
        assert!(policy
            .validate(&Url::parse("ws://remote.example.com:9229/t").unwrap())
            .is_ok());
    }
}
