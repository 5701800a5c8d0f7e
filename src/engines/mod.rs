//! Built-in engine descriptors and the registry that resolves engine names.

mod bing;
mod brave;
mod google;

pub use bing::bing;
pub use brave::brave;
pub use google::google;

use crate::engine::EngineDescriptor;
use crate::{Result, SearchError};

/// Named collection of engine descriptors.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    descriptors: Vec<EngineDescriptor>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with Google, Bing and Brave.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(google());
        registry.register(bing());
        registry.register(brave());
        registry
    }

    /// Adds a descriptor, replacing any existing one with the same name.
    pub fn register(&mut self, descriptor: EngineDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|d| d.name.eq_ignore_ascii_case(&descriptor.name))
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    /// Looks up a descriptor by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&EngineDescriptor> {
        let name = name.trim();
        self.descriptors
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Registered engine names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Resolves a list of engine names; an empty list means every engine.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<&EngineDescriptor>> {
        if names.is_empty() {
            return Ok(self.descriptors.iter().collect());
        }

        let mut resolved: Vec<&EngineDescriptor> = Vec::with_capacity(names.len());
        for name in names {
            let descriptor = self
                .get(name)
                .ok_or_else(|| SearchError::UnknownEngine(name.clone()))?;
            if !resolved.iter().any(|d| d.name == descriptor.name) {
                resolved.push(descriptor);
            }
        }
        Ok(resolved)
    }
}
