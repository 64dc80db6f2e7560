use std::collections::BTreeMap;

use super::{ClusteringStrategy, KMeans, Ward};
use crate::pipeline::error::{PipelineError, Result};

/// Builds a fresh strategy instance.
pub type StrategyFactory = fn() -> Box<dyn ClusteringStrategy>;

/// Maps strategy names to their factories.
#[derive(Clone)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    /// Creates a registry without any strategy.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the built-in strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(KMeans::NAME, || Box::new(KMeans::default()));
        registry.register(Ward::NAME, || Box::new(Ward::default()));
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, factory: StrategyFactory) -> &mut Self {
        self.factories.insert(normalize(name), factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiates the strategy registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn ClusteringStrategy>> {
        self.factories
            .get(&normalize(name))
            .map(|factory| factory())
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "unknown clustering algorithm '{}' (available: {})",
                    name.trim(),
                    self.names().join(", ")
                ))
            })
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cluster::DEFAULT_CLUSTERS;

    #[test]
    fn defaults_contain_builtin_strategies() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["kmeans", "ward"]);

        let kmeans = registry.create("kmeans").unwrap();
        assert_eq!(kmeans.name(), "kmeans");
        assert_eq!(kmeans.n_clusters(), DEFAULT_CLUSTERS);
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let registry = StrategyRegistry::with_defaults();
        assert!(registry.contains(" KMeans "));
        assert_eq!(registry.create("WARD").unwrap().name(), "ward");
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let registry = StrategyRegistry::with_defaults();
        match registry.create("another") {
            Err(PipelineError::Configuration(msg)) => {
                assert!(msg.contains("another"));
                assert!(msg.contains("kmeans, ward"));
            }
            other => panic!("expected configuration error, got {:?}", other.map(|s| s.name())),
        }
    }

    #[test]
    fn custom_strategy_can_be_registered() {
        let mut registry = StrategyRegistry::empty();
        registry.register("pair", || Box::new(KMeans::new(2)));

        let strategy = registry.create("pair").unwrap();
        assert_eq!(strategy.n_clusters(), 2);
        assert!(registry.create("kmeans").is_err());
    }
}
