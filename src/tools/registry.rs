//! The set of capabilities bound to one actor.

use std::collections::HashMap;

use super::capability::Capability;
use crate::utilities::errors::SchemaError;

/// Capabilities indexed by unique name, kept in binding order.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
    index: HashMap<String, usize>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, failing on the first duplicate name.
    pub fn try_from_iter(
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Result<Self, SchemaError> {
        let mut set = Self::new();
        for capability in capabilities {
            set.bind(capability)?;
        }
        Ok(set)
    }

    /// Bind a capability. Names must be unique within the set.
    pub fn bind(&mut self, capability: Capability) -> Result<(), SchemaError> {
        if self.index.contains_key(capability.name()) {
            return Err(SchemaError::DuplicateCapability(capability.name().to_string()));
        }
        self.index
            .insert(capability.name().to_string(), self.capabilities.len());
        self.capabilities.push(capability);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&idx| &self.capabilities[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Comma-separated capability names.
    pub fn names(&self) -> String {
        self.capabilities
            .iter()
            .map(Capability::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// One JSON signature per line, embedded verbatim in system prompts.
    pub fn signatures_block(&self) -> String {
        self.capabilities
            .iter()
            .map(|c| c.signature().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
