//! Concurrent execution of independent upstream requests.
//!
//! Every request in a set is dispatched before any is awaited, and the caller
//! resumes once all of them have settled. A failing request never cancels its
//! siblings; its failure is recorded as a `Rejected` outcome in its slot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agrocast_core::{ReqwestErrorExt, SourceError};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::types::WeatherError;

/// Settled result of one upstream request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T, E = SourceError> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> FetchOutcome<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The fulfilled value, discarding the rejection reason
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Fulfilled(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(reason) => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for FetchOutcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(reason) => Self::Rejected(reason),
        }
    }
}

/// Await every future and collect one outcome per input, in input order.
pub async fn join_settled<I, F, T, E>(futures: I) -> Vec<FetchOutcome<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    futures::future::join_all(futures)
        .await
        .into_iter()
        .map(FetchOutcome::from)
        .collect()
}

/// Failure detected before anything was dispatched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Malformed request descriptor '{name}': {reason}")]
    MalformedDescriptor { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One upstream request: endpoint, query and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Source name used in logs and rejection reasons
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(name: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// POST whose body is `body` serialized to JSON.
    ///
    /// A body that cannot be serialized is a malformed descriptor.
    pub fn post_json<B: Serialize>(
        name: impl Into<String>,
        url: impl Into<String>,
        body: &B,
    ) -> Result<Self, FetchError> {
        let name = name.into();
        match serde_json::to_value(body) {
            Ok(body) => Ok(Self::post(name, url, body)),
            Err(e) => Err(FetchError::MalformedDescriptor {
                name,
                reason: format!("body does not serialize: {}", e),
            }),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    fn validate(&self) -> Result<Url, FetchError> {
        let malformed = |reason: String| FetchError::MalformedDescriptor {
            name: self.name.clone(),
            reason,
        };

        let url = Url::parse(&self.url).map_err(|e| malformed(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(malformed(format!("unsupported scheme {}", url.scheme())));
        }
        if self.method == HttpMethod::Get && self.body.is_some() {
            return Err(malformed("GET request cannot carry a body".to_string()));
        }
        Ok(url)
    }
}

/// Runs a set of request descriptors concurrently and settles every one.
#[derive(Debug, Clone)]
pub struct ParallelFetchCoordinator {
    client: Arc<Client>,
}

impl ParallelFetchCoordinator {
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Execute all descriptors and return one outcome per descriptor, in order.
    ///
    /// Returns an error only when a descriptor is malformed, in which case
    /// nothing is sent.
    pub async fn execute(
        &self,
        descriptors: &[RequestDescriptor],
    ) -> Result<Vec<FetchOutcome<Value>>, FetchError> {
        let prepared = descriptors
            .iter()
            .map(|descriptor| descriptor.validate().map(|url| (descriptor, url)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Dispatching {} upstream requests", prepared.len());

        let outcomes =
            join_settled(prepared.into_iter().map(|(descriptor, url)| self.send(descriptor, url)))
                .await;

        for (descriptor, outcome) in descriptors.iter().zip(&outcomes) {
            if let FetchOutcome::Rejected(reason) = outcome {
                tracing::warn!("Source '{}' rejected: {}", descriptor.name, reason);
            }
        }

        Ok(outcomes)
    }

    async fn send(&self, descriptor: &RequestDescriptor, url: Url) -> Result<Value, SourceError> {
        let request = match descriptor.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        let request = request.query(&descriptor.query);
        let request = match &descriptor.body {
            Some(body) => request.json(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::unavailable(&descriptor.name, e.into_network_error()))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::malformed(&descriptor.name, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[tokio::test]
    async fn test_join_settled_keeps_input_order() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, String>("slow")
        };
        let failing = async { Err::<&str, _>("boom".to_string()) };
        let fast = async { Ok::<_, String>("fast") };

        let futures: Vec<std::pin::Pin<Box<dyn Future<Output = Result<&str, String>>>>> =
            vec![Box::pin(slow), Box::pin(failing), Box::pin(fast)];
        let outcomes = join_settled(futures).await;

        assert_eq!(
            outcomes,
            vec![
                FetchOutcome::Fulfilled("slow"),
                FetchOutcome::Rejected("boom".to_string()),
                FetchOutcome::Fulfilled("fast"),
            ]
        );
    }

    #[tokio::test]
    async fn test_join_settled_does_not_short_circuit() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let completed = AtomicUsize::new(0);
        let task = |fail: bool| {
            let completed = &completed;
            async move {
                tokio::task::yield_now().await;
                completed.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(())
                } else {
                    Ok(())
                }
            }
        };

        let outcomes = join_settled(vec![task(true), task(false), task(true)]).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert!(outcomes[1].is_fulfilled());
    }

    #[test]
    fn test_outcome_conversions() {
        let ok: FetchOutcome<i32, &str> = Ok(1).into();
        assert_eq!(ok.clone().ok(), Some(1));
        assert_eq!(ok.into_result(), Ok(1));

        let err: FetchOutcome<i32, &str> = Err("nope").into();
        assert!(err.is_rejected());
        assert_eq!(err.ok(), None);
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(RequestDescriptor::get("weather", "https://example.com/x")
            .validate()
            .is_ok());
        assert!(RequestDescriptor::get("weather", "not a url").validate().is_err());
        assert!(RequestDescriptor::get("weather", "file:///etc/passwd")
            .validate()
            .is_err());

        let mut bad = RequestDescriptor::get("weather", "https://example.com");
        bad.body = Some(serde_json::json!({}));
        assert!(matches!(
            bad.validate(),
            Err(FetchError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn test_unserializable_body_is_malformed() {
        let mut body = std::collections::BTreeMap::new();
        body.insert((1, 2), "tuple keys have no JSON form");

        let err =
            RequestDescriptor::post_json("agent", "https://example.com/run", &body).unwrap_err();
        assert!(matches!(err, FetchError::MalformedDescriptor { ref name, .. } if name == "agent"));

        let ok =
            RequestDescriptor::post_json("agent", "https://example.com/run", &[1, 2]).unwrap();
        assert_eq!(ok.body, Some(serde_json::json!([1, 2])));
    }

    #[test]
    fn test_descriptor_query_builder() {
        let d = RequestDescriptor::get("geocode", "https://example.com/reverse")
            .query("lat", 12.5)
            .query("limit", 1);
        assert_eq!(
            d.query,
            vec![
                ("lat".to_string(), "12.5".to_string()),
                ("limit".to_string(), "1".to_string())
            ]
        );
    }
}
