use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A concrete record type the client knows how to materialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    /// Canonical server-side name, e.g. `Opportunity`
    pub name: String,
}

impl RecordType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Collection URL for this type under the versioned service root
    pub fn collection_url(&self, base_url: &str) -> String {
        format!("{}/sobjects/{}/", base_url, self.name)
    }

    pub fn record_url(&self, base_url: &str, id: &str) -> String {
        format!("{}/sobjects/{}/{}", base_url, self.name, id)
    }

    pub fn describe_url(&self, base_url: &str) -> String {
        format!("{}/sobjects/{}/describe", base_url, self.name)
    }
}

/// Maps type names found in payloads and schemas to registered record types.
///
/// Unknown names are an error; nothing is ever materialized under a guessed type.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, RecordType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = Self::new();
        for name in names {
            registry.register(name.as_ref());
        }
        registry
    }

    pub fn register(&self, name: &str) {
        self.types
            .write()
            .insert(name.to_lowercase(), RecordType::new(name));
    }

    pub fn resolve(&self, name: &str) -> Result<RecordType> {
        self.types
            .read()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnmappedType(name.to_string()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.read().contains_key(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive_and_keeps_canonical_name() {
        let registry = TypeRegistry::with_types(["Account", "Opportunity"]);
        assert_eq!(registry.resolve("account").unwrap().name, "Account");
        assert_eq!(registry.resolve("OPPORTUNITY").unwrap().name, "Opportunity");
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let registry = TypeRegistry::with_types(["Account"]);
        match registry.resolve("Contact") {
            Err(Error::UnmappedType(name)) => assert_eq!(name, "Contact"),
            other => panic!("expected unmapped type, got {:?}", other),
        }
    }

    #[test]
    fn test_urls() {
        let account = RecordType::new("Account");
        let base = "https://host/services/data/v58.0";
        assert_eq!(
            account.collection_url(base),
            "https://host/services/data/v58.0/sobjects/Account/"
        );
        assert_eq!(
            account.record_url(base, "001A"),
            "https://host/services/data/v58.0/sobjects/Account/001A"
        );
        assert_eq!(
            account.describe_url(base),
            "https://host/services/data/v58.0/sobjects/Account/describe"
        );
    }
}
