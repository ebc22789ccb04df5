//! Master/slave links between the placeholders of one template evaluation.
use std::collections::BTreeSet;

use crate::error::DependencyError;

/// Handle to a placeholder in a `DependencyGraph` (and the variable arena
/// that owns it, which mints ids in the same order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub(crate) usize);

/// Links of one placeholder.
#[derive(Debug, Clone, Default)]
struct Link {
    master: Option<VariableId>,
    name: String,
    slaves: BTreeSet<VariableId>,
}

/// Forest of placeholders: every slave has at most one master and the
/// master chains never loop.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    links: Vec<Link>,
}

impl DependencyGraph {
    /// Register a placeholder with no links.
    pub fn add_variable(&mut self, name: &str) -> VariableId {
        let id = VariableId(self.links.len());
        self.links.push(Link { master: None, name: name.to_string(), slaves: BTreeSet::new() });
        return id;
    }

    /// Record that `slave` derives its value from `master`.
    ///
    /// # Errors
    ///
    /// Returns `DependencyError::DuplicateMaster` if `slave` already has a
    /// master, or `DependencyError::CycleDetected` if `slave` is `master` or
    /// one of its transitive masters.
    pub fn add_dependency(&mut self, master: VariableId, slave: VariableId) -> Result<(), DependencyError> {
        if let Some(existing) = self.master_of(slave) {
            return Err(DependencyError::DuplicateMaster {
                existing: self.name(existing).to_string(),
                master: self.name(master).to_string(),
                slave: self.name(slave).to_string(),
            });
        }
        let mut current = Some(master);
        while let Some(step) = current {
            if step == slave {
                return Err(DependencyError::CycleDetected {
                    master: self.name(master).to_string(),
                    slave: self.name(slave).to_string(),
                });
            }
            current = self.master_of(step);
        }
        if let Some(link) = self.links.get_mut(slave.0) {
            link.master = Some(master);
        }
        if let Some(link) = self.links.get_mut(master.0) {
            link.slaves.insert(slave);
        }
        return Ok(());
    }

    /// The master `slave` derives from, if any.
    pub fn master_of(&self, slave: VariableId) -> Option<VariableId> {
        return self.links.get(slave.0).and_then(|link| return link.master);
    }

    /// Placeholders that must be re-resolved when `master` changes.
    pub fn slaves_of(&self, master: VariableId) -> impl Iterator<Item = VariableId> + '_ {
        return self.links.get(master.0).into_iter().flat_map(|link| return link.slaves.iter().copied());
    }

    fn name(&self, id: VariableId) -> &str {
        return self.links.get(id.0).map_or("", |link| return link.name.as_str());
    }
}
