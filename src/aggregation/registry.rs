//! Call registry: the ordered set of named fetch operations for one aggregation.

use std::borrow::Borrow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::aggregation::outcome::FetchResult;

/// Identifier of a downstream service, unique within one registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A unit of work that resolves a subject into a payload.
///
/// Implementations own their transport, timeout and retry behaviour.
/// The aggregator only invokes them and races them against the deadline.
#[async_trait]
pub trait FetchOperation: Send + Sync {
    async fn fetch(&self, subject: &str) -> FetchResult;
}

/// Adapter turning an async closure into a [`FetchOperation`].
pub struct FnFetcher<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> FetchOperation for FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    async fn fetch(&self, subject: &str) -> FetchResult {
        (self.f)(subject.to_string()).await
    }
}

/// Wrap a closure `Fn(String) -> impl Future<Output = FetchResult>`.
pub fn fetcher_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    FnFetcher { f }
}

/// Registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    EmptyName,

    #[error("service '{0}' is already registered")]
    Duplicate(ServiceName),
}

/// Ordered mapping from service name to fetch operation.
///
/// Cloning is cheap: operations are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct CallRegistry {
    entries: Vec<(ServiceName, Arc<dyn FetchOperation>)>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named operation. Names must be non-empty and unique.
    pub fn register(
        &mut self,
        name: impl Into<ServiceName>,
        operation: Arc<dyn FetchOperation>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.as_str().trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(name.as_str()) {
            return Err(RegistryError::Duplicate(name));
        }
        self.entries.push((name, operation));
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(
        mut self,
        name: impl Into<ServiceName>,
        operation: impl FetchOperation + 'static,
    ) -> Result<Self, RegistryError> {
        self.register(name, Arc::new(operation))?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<ServiceName> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub(crate) fn into_entries(self) -> Vec<(ServiceName, Arc<dyn FetchOperation>)> {
        self.entries
    }
}

impl fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(n, _)| n))
            .finish()
    }
}
