//! Dependency Resolver
//!
//! Computes the single deterministic order in which modules are configured
//! and initialized: every module strictly after all of its transitive
//! dependencies, ties among independent modules broken by priority
//! (descending) and then by their position in the input.

use super::{LifecycleError, Result};
use crate::module::{ModuleDescriptor, ModuleKey};
use std::collections::{HashMap, HashSet};

/// Stateless resolver over a set of module descriptors
///
/// When several descriptors share a key, the first one wins and the rest
/// are ignored.
pub struct DependencyResolver<'a> {
    descriptors: &'a [ModuleDescriptor],
    index: HashMap<ModuleKey, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(descriptors: &'a [ModuleDescriptor]) -> Self {
        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            index.entry(descriptor.key()).or_insert(position);
        }
        Self { descriptors, index }
    }

    /// Check that every declared dependency identifies a loaded module
    pub fn validate(&self) -> Result<()> {
        for descriptor in self.descriptors {
            for dependency in descriptor.dependencies() {
                if self.index.contains_key(dependency) {
                    continue;
                }
                let module = descriptor.name().to_string();
                let dependency_name = dependency.type_name().to_string();

                return Err(if dependency.is_module() {
                    LifecycleError::MissingDependency {
                        module,
                        dependency: dependency_name,
                    }
                } else {
                    LifecycleError::InvalidModuleDeclaration {
                        module,
                        dependency: dependency_name,
                    }
                });
            }
        }
        Ok(())
    }

    /// Validate, then order all descriptors dependencies-first
    pub fn resolve_order(&self) -> Result<Vec<ModuleKey>> {
        self.validate()?;

        // Seed by priority, highest first; the sort is stable so equal
        // priorities keep input order.
        let mut seeds: Vec<usize> = (0..self.descriptors.len())
            .filter(|&i| self.index.get(&self.descriptors[i].key()) == Some(&i))
            .collect();
        seeds.sort_by_key(|&i| std::cmp::Reverse(self.descriptors[i].priority()));

        let mut marks = vec![Mark::Unvisited; self.descriptors.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.descriptors.len());

        for seed in seeds {
            self.visit(seed, &mut marks, &mut path, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        position: usize,
        marks: &mut [Mark],
        path: &mut Vec<ModuleKey>,
        order: &mut Vec<ModuleKey>,
    ) -> Result<()> {
        let key = self.descriptors[position].key();

        match marks[position] {
            Mark::Visited => return Ok(()),
            Mark::Visiting => {
                let start = path.iter().position(|k| *k == key).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&key))
                    .map(|k| k.short_name().to_string())
                    .collect();
                return Err(LifecycleError::CircularDependency { path: cycle });
            }
            Mark::Unvisited => {}
        }

        marks[position] = Mark::Visiting;
        path.push(key);

        for dependency in self.descriptors[position].dependencies() {
            // validate() guarantees the lookup succeeds
            if let Some(&next) = self.index.get(dependency) {
                self.visit(next, marks, path, order)?;
            }
        }

        path.pop();
        marks[position] = Mark::Visited;
        order.push(key);
        Ok(())
    }

    /// Every module `key` depends on, directly or transitively.
    ///
    /// Dependencies without a descriptor are included but not expanded.
    pub fn transitive_dependencies(&self, key: ModuleKey) -> HashSet<ModuleKey> {
        let mut collected = HashSet::new();
        let mut stack: Vec<ModuleKey> = self
            .index
            .get(&key)
            .map(|&i| self.descriptors[i].dependencies().to_vec())
            .unwrap_or_default();

        while let Some(next) = stack.pop() {
            if !collected.insert(next) {
                continue;
            }
            if let Some(&i) = self.index.get(&next) {
                stack.extend(self.descriptors[i].dependencies().iter().copied());
            }
        }

        collected
    }
}

/// Order `descriptors` dependencies-first
pub fn resolve_order(descriptors: &[ModuleDescriptor]) -> Result<Vec<ModuleKey>> {
    DependencyResolver::new(descriptors).resolve_order()
}

/// Every module `key` depends on within `descriptors`
pub fn transitive_dependencies(
    descriptors: &[ModuleDescriptor],
    key: ModuleKey,
) -> HashSet<ModuleKey> {
    DependencyResolver::new(descriptors).transitive_dependencies(key)
}
