//! Registered sources, in registration order

use super::Source;

pub struct SourceSet<M> {
    sources: Vec<Box<dyn Source<M>>>,
}

impl<M> Default for SourceSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> SourceSet<M> {
    pub fn new() -> Self {
        SourceSet {
            sources: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Source<M>> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
    }

    /// Register `source`; hands it back when the name is taken
    pub fn insert(&mut self, source: Box<dyn Source<M>>) -> Result<(), Box<dyn Source<M>>> {
        if self.contains(source.name()) {
            return Err(source);
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Source<M>>> {
        let position = self.sources.iter().position(|s| s.name() == name)?;
        Some(self.sources.remove(position))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Source<M>>> {
        self.sources.iter_mut()
    }
}
