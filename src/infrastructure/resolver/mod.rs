//! Multi-source public-IP resolution
//!
//! Probes a shuffled list of plain-text IP echo services one at a time,
//! each with a bounded timeout, and returns the first response that parses
//! as an IP address. Individual source failures are logged and skipped;
//! exhausting every source yields `None`, not an error.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::application::errors::BotError;

/// Well-known services returning the caller's IP as plain text
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://l2.io/ip",
    "https://eth0.me",
    "https://icanhazip.com",
    "https://ipecho.net/plain",
    "https://ifconfig.me/",
    "https://ifconfig.co/",
];

pub const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Some echo services answer differently to browser agents
const USER_AGENT: &str = "curl/7.68.0";

/// Seam between the resolver and the network, so the probing order and
/// short-circuit behavior can be tested without sockets.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Fetch the response body of one source
    async fn fetch(&self, url: &str) -> Result<String, BotError>;
}

/// Probe backed by a reqwest client with a per-request timeout
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, BotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BotError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn fetch(&self, url: &str) -> Result<String, BotError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("HTTP error: {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| BotError::Network(e.to_string()))
    }
}

pub struct AddressResolver {
    sources: Vec<String>,
    probe: Box<dyn Probe>,
}

impl AddressResolver {
    pub fn new(sources: Vec<String>, timeout: Duration) -> Result<Self, BotError> {
        Ok(Self {
            sources,
            probe: Box::new(HttpProbe::new(timeout)?),
        })
    }

    pub fn with_probe(sources: Vec<String>, probe: Box<dyn Probe>) -> Self {
        Self { sources, probe }
    }

    /// Resolve the current public address, or `None` if every source failed.
    ///
    /// The source list is shuffled per call so repeated resolutions spread
    /// load across providers instead of hammering the first entry; probing
    /// is strictly sequential, never parallel.
    pub async fn resolve(&self) -> Option<IpAddr> {
        let mut order: Vec<&str> = self.sources.iter().map(String::as_str).collect();
        order.shuffle(&mut rand::thread_rng());
        self.probe_in_order(&order).await
    }

    async fn probe_in_order(&self, order: &[&str]) -> Option<IpAddr> {
        for url in order {
            tracing::info!("Get IP by {}", url);
            match self.probe.fetch(url).await {
                Ok(body) => match body.trim().parse::<IpAddr>() {
                    Ok(ip) => return Some(ip),
                    Err(_) => {
                        tracing::info!("Failed get IP by {}: not an address: {:?}", url, body.trim());
                    }
                },
                Err(e) => {
                    tracing::info!("Failed get IP by {}: {}", url, e);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Probe answering from a canned table and recording every fetch
    struct MockProbe {
        responses: HashMap<String, Result<String, String>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockProbe {
        fn new(entries: &[(&str, Result<&str, &str>)]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let responses = entries
                .iter()
                .map(|(url, outcome)| {
                    let outcome = match outcome {
                        Ok(body) => Ok(body.to_string()),
                        Err(msg) => Err(msg.to_string()),
                    };
                    (url.to_string(), outcome)
                })
                .collect();
            let calls = Arc::new(Mutex::new(Vec::new()));
            let probe = Self {
                responses,
                calls: calls.clone(),
            };
            (probe, calls)
        }
    }

    #[async_trait]
    impl Probe for MockProbe {
        async fn fetch(&self, url: &str) -> Result<String, BotError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(msg)) => Err(BotError::Network(msg.clone())),
                None => Err(BotError::Network("unknown source".to_string())),
            }
        }
    }

    fn resolver_with(
        entries: &[(&str, Result<&str, &str>)],
    ) -> (AddressResolver, Arc<Mutex<Vec<String>>>) {
        let (probe, calls) = MockProbe::new(entries);
        let sources = entries.iter().map(|(url, _)| url.to_string()).collect();
        (AddressResolver::with_probe(sources, Box::new(probe)), calls)
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let (resolver, calls) = resolver_with(&[
            ("https://fail-a", Err("timeout")),
            ("https://fail-b", Err("refused")),
            ("https://ok-c", Ok("203.0.113.5")),
            ("https://never", Ok("198.51.100.1")),
        ]);

        let ip = resolver
            .probe_in_order(&["https://fail-a", "https://fail-b", "https://ok-c", "https://never"])
            .await;

        assert_eq!(ip, Some("203.0.113.5".parse().unwrap()));
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["https://fail-a", "https://fail-b", "https://ok-c"]
        );
    }

    #[tokio::test]
    async fn trims_whitespace_before_validation() {
        let (resolver, _calls) = resolver_with(&[("https://ok", Ok(" 203.0.113.5 \n"))]);
        let ip = resolver.resolve().await;
        assert_eq!(ip, Some("203.0.113.5".parse().unwrap()));
    }

    #[tokio::test]
    async fn unparsable_body_is_a_source_failure_not_a_result() {
        let (resolver, _calls) = resolver_with(&[
            ("https://garbage", Ok("<html>hello</html>")),
            ("https://ok", Ok("2001:db8::1")),
        ]);
        let ip = resolver
            .probe_in_order(&["https://garbage", "https://ok"])
            .await;
        assert_eq!(ip, Some("2001:db8::1".parse().unwrap()));
    }

    #[tokio::test]
    async fn all_sources_failing_is_none_not_error() {
        let (resolver, calls) = resolver_with(&[
            ("https://fail-a", Err("timeout")),
            ("https://fail-b", Err("dns")),
        ]);
        assert_eq!(resolver.resolve().await, None);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_source_list_makes_no_network_call() {
        let (resolver, calls) = resolver_with(&[]);
        assert_eq!(resolver.resolve().await, None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_sources_are_probed_again() {
        let (resolver, calls) = resolver_with(&[("https://fail", Err("down"))]);
        let ip = resolver
            .probe_in_order(&["https://fail", "https://fail"])
            .await;
        assert_eq!(ip, None);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }
}
