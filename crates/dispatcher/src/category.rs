//! Category - a named group of redundant replicas

use contracts::{CategoryConfig, ReplicaConfig, SearchBackend};
use producer::Producer;

/// Replicas considered interchangeable for one sub-query
pub struct Category<B> {
    name: String,
    replicas: Vec<Producer<B>>,
}

impl<B> Clone for Category<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            replicas: self.replicas.clone(),
        }
    }
}

impl<B: SearchBackend + Sync + 'static> Category<B> {
    /// Group `replicas` under `name`.
    ///
    /// An empty list is accepted here and rejected when the category is raced.
    pub fn new(name: impl Into<String>, replicas: Vec<Producer<B>>) -> Self {
        Self {
            name: name.into(),
            replicas,
        }
    }

    /// Wrap plain backends as producers
    pub fn from_backends(name: impl Into<String>, backends: impl IntoIterator<Item = B>) -> Self {
        Self::new(name, backends.into_iter().map(Producer::new).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replicas(&self) -> &[Producer<B>] {
        &self.replicas
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}

/// Build categories from configuration.
///
/// `make_backend` receives the category name and the replica entry and
/// returns the backend that answers for it.
pub fn build_categories<B, F>(configs: &[CategoryConfig], mut make_backend: F) -> Vec<Category<B>>
where
    B: SearchBackend + Sync + 'static,
    F: FnMut(&str, &ReplicaConfig) -> B,
{
    configs
        .iter()
        .map(|config| {
            let backends = config
                .replicas
                .iter()
                .map(|replica| make_backend(&config.name, replica));
            Category::from_backends(config.name.clone(), backends.collect::<Vec<_>>())
        })
        .collect()
}
