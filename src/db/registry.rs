// Driver Registry
// Maps backend names and aliases to their capability descriptors

use crate::db::descriptor::DriverDescriptor;
use crate::db::traits::DatabaseError;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

static REGISTRY: OnceCell<DriverRegistry> = OnceCell::new();

/// Registry of database backends
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<DriverDescriptor>>,
    /// Canonical names in registration order
    names: Vec<String>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a complete descriptor list
    pub fn build(descriptors: impl IntoIterator<Item = DriverDescriptor>) -> Result<Self, DatabaseError> {
        let mut registry = Self::new();
        for desc in descriptors {
            let name = desc.name.clone();
            let aliases = desc.aliases.clone();
            let aliases: Vec<&str> = aliases.iter().map(|a| a.as_str()).collect();
            registry.register(&name, desc, &aliases)?;
        }
        Ok(registry)
    }

    /// Register a descriptor under `name` and every alias.
    ///
    /// Fails without modifying the registry if any of the names is taken.
    pub fn register(&mut self, name: &str, descriptor: DriverDescriptor, aliases: &[&str]) -> Result<(), DatabaseError> {
        let keys: Vec<String> = std::iter::once(name)
            .chain(aliases.iter().copied())
            .map(|n| n.to_ascii_lowercase())
            .collect();
        for (i, key) in keys.iter().enumerate() {
            if self.drivers.contains_key(key) || keys[..i].contains(key) {
                return Err(DatabaseError::DuplicateBackend(key.clone()));
            }
        }

        let descriptor = Arc::new(descriptor);
        for key in keys {
            self.drivers.insert(key, Arc::clone(&descriptor));
        }
        self.names.push(name.to_ascii_lowercase());
        debug!(driver = name, ?aliases, "registered driver");
        Ok(())
    }

    /// Get a descriptor by backend name or alias (case-insensitive)
    pub fn lookup(&self, name: &str) -> Result<Arc<DriverDescriptor>, DatabaseError> {
        self.drivers
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| DatabaseError::UnregisteredBackend(name.to_string()))
    }

    /// Check if a driver is registered under the name or alias
    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.contains_key(&name.to_ascii_lowercase())
    }

    /// Canonical backend names, in registration order
    pub fn supported_names(&self) -> &[String] {
        &self.names
    }
}

/// Build the process-wide registry. Later calls return the first registry.
pub fn init(descriptors: impl IntoIterator<Item = DriverDescriptor>) -> Result<&'static DriverRegistry, DatabaseError> {
    REGISTRY.get_or_try_init(|| {
        let registry = DriverRegistry::build(descriptors)?;
        info!(drivers = registry.names.len(), "driver registry initialized");
        Ok(registry)
    })
}

/// The process-wide registry, if initialized
pub fn global() -> Result<&'static DriverRegistry, DatabaseError> {
    REGISTRY
        .get()
        .ok_or_else(|| DatabaseError::UnregisteredBackend("driver registry is not initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_driver() {
        let mut registry = DriverRegistry::new();
        registry
            .register("sqlite", DriverDescriptor::new("sqlite"), &["sqlite3", "file"])
            .unwrap();

        assert!(registry.has_driver("sqlite"));
        assert!(registry.has_driver("SQLite3"));
        assert!(registry.has_driver("file"));
        assert_eq!(registry.supported_names(), ["sqlite".to_string()]);
    }

    #[test]
    fn test_lookup() {
        let mut registry = DriverRegistry::new();
        registry.register("hive", DriverDescriptor::new("hive"), &[]).unwrap();

        let desc = registry.lookup("hive").unwrap();
        assert_eq!(desc.name, "hive");
        let err = registry.lookup("oracle").unwrap_err();
        assert!(matches!(err, DatabaseError::UnregisteredBackend(n) if n == "oracle"));
    }

    #[test]
    fn test_aliases_share_descriptor() {
        let mut registry = DriverRegistry::new();
        registry
            .register("cosmos", DriverDescriptor::new("cosmos"), &["gocosmos"])
            .unwrap();
        let a = registry.lookup("cosmos").unwrap();
        let b = registry.lookup("gocosmos").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = DriverRegistry::new();
        registry.register("chai", DriverDescriptor::new("chai"), &[]).unwrap();

        let err = registry
            .register("other", DriverDescriptor::new("other"), &["CHAI"])
            .unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateBackend(n) if n == "chai"));
        // the failed registration left nothing behind
        assert!(!registry.has_driver("other"));
        assert_eq!(registry.supported_names().len(), 1);
    }

    #[test]
    fn test_build_from_list() {
        let registry = DriverRegistry::build([
            DriverDescriptor::new("ramsql"),
            DriverDescriptor::new("godynamo"),
        ])
        .unwrap();
        assert_eq!(registry.supported_names(), ["ramsql".to_string(), "godynamo".to_string()]);

        let err = DriverRegistry::build([DriverDescriptor::new("a"), DriverDescriptor::new("A")]).unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateBackend(_)));
    }
}
