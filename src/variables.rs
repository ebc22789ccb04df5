//! Placeholder instances of one template evaluation.
//!
//! Every placeholder starts `Unresolved` and moves to `Resolved` exactly
//! once. All of them live in one arena together with their dependency
//! links and are dropped together when the evaluation ends.
use crate::dependency::{DependencyGraph, VariableId};
use crate::error::DependencyError;
use crate::template::VariableSpec;

/// The value chosen for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Qualified type of the value, for placeholders other placeholders project from.
    pub type_name: Option<String>,
    /// Whether the value is the only sensible choice.
    pub unambiguous: bool,
    /// Text substituted for every occurrence.
    pub value: String,
}

/// Lifecycle of a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableState {
    /// A value has been chosen; it never changes afterwards.
    Resolved(Resolution),
    /// No value yet.
    Unresolved,
}

/// One placeholder instance.
#[derive(Debug, Clone)]
pub struct TemplateVariable {
    /// Absolute document offsets written by additional edits.
    pub document_offsets: Vec<usize>,
    /// Resolver kind.
    pub kind: String,
    /// Placeholder name.
    pub name: String,
    /// Parameters from the pattern.
    pub params: Vec<String>,
    /// Current state.
    pub state: VariableState,
}

/// Arena of the placeholders of one evaluation.
#[derive(Debug, Clone, Default)]
pub struct VariableArena {
    graph: DependencyGraph,
    variables: Vec<TemplateVariable>,
}

impl VariableArena {
    /// One unresolved placeholder per `VariableSpec`, ids in declaration order.
    pub fn new(specs: &[VariableSpec]) -> Self {
        let mut arena = Self::default();
        for spec in specs {
            arena.graph.add_variable(&spec.name);
            arena.variables.push(TemplateVariable {
                document_offsets: Vec::new(),
                kind: spec.kind.clone(),
                name: spec.name.clone(),
                params: spec.params.clone(),
                state: VariableState::Unresolved,
            });
        }
        return arena;
    }

    /// Every id in pattern order.
    pub fn ids(&self) -> impl Iterator<Item = VariableId> + use<> {
        return (0..self.variables.len()).map(VariableId);
    }

    /// The placeholder behind `id`.
    pub fn get(&self, id: VariableId) -> Option<&TemplateVariable> {
        return self.variables.get(id.0);
    }

    /// Id of the placeholder named `name`.
    pub fn find(&self, name: &str) -> Option<VariableId> {
        return self.variables.iter().position(|v| return v.name == name).map(VariableId);
    }

    /// The chosen value, only once the placeholder is resolved.
    pub fn resolution(&self, id: VariableId) -> Option<&Resolution> {
        return match &self.get(id)?.state {
            VariableState::Resolved(resolution) => Some(resolution),
            VariableState::Unresolved => None,
        };
    }

    /// Whether a value has been chosen.
    pub fn is_resolved(&self, id: VariableId) -> bool {
        return self.resolution(id).is_some();
    }

    /// Move an unresolved placeholder to `Resolved`. Returns `false` and keeps
    /// the first value if it was already resolved.
    pub fn resolve(&mut self, id: VariableId, resolution: Resolution) -> bool {
        let Some(variable) = self.variables.get_mut(id.0) else {
            return false;
        };
        if matches!(variable.state, VariableState::Resolved(_)) {
            return false;
        }
        variable.state = VariableState::Resolved(resolution);
        return true;
    }

    /// Link `slave` to the `master` it derives from.
    ///
    /// # Errors
    ///
    /// Propagates `DependencyError` from the graph.
    pub fn add_dependency(&mut self, master: VariableId, slave: VariableId) -> Result<(), DependencyError> {
        return self.graph.add_dependency(master, slave);
    }

    /// Dependency links between the placeholders.
    pub const fn graph(&self) -> &DependencyGraph {
        return &self.graph;
    }

    /// Remember an occurrence written outside the template text. It is only
    /// reported once the text has been rendered.
    pub fn register_document_offset(&mut self, id: VariableId, offset: usize) {
        if let Some(variable) = self.variables.get_mut(id.0) {
            variable.document_offsets.push(offset);
        }
    }

    /// Values for rendering, by id. Unresolved placeholders render as their name.
    pub fn values(&self) -> Vec<String> {
        return self
            .variables
            .iter()
            .map(|v| {
                return match &v.state {
                    VariableState::Resolved(resolution) => resolution.value.clone(),
                    VariableState::Unresolved => v.name.clone(),
                };
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_pattern;

    fn arena(pattern: &str) -> VariableArena {
        return VariableArena::new(&parse_pattern(pattern).unwrap().variables);
    }

    fn value(text: &str) -> Resolution {
        return Resolution { type_name: None, unambiguous: true, value: text.to_string() };
    }

    #[test]
    fn resolution_is_hidden_until_resolved() {
        let mut vars = arena("${i:inner_expression(boolean)}");
        let id = vars.find("i").unwrap();
        assert!(vars.resolution(id).is_none());
        assert!(vars.resolve(id, value("ok")));
        assert_eq!(vars.resolution(id).unwrap().value, "ok");
    }

    #[test]
    fn second_resolution_is_ignored() {
        let mut vars = arena("${i:inner_expression(boolean)}");
        let id = vars.find("i").unwrap();
        vars.resolve(id, value("first"));
        assert!(!vars.resolve(id, value("second")));
        assert_eq!(vars.values(), vec!["first".to_string()]);
    }

    #[test]
    fn unresolved_values_render_as_names() {
        let vars = arena("${a} ${b:other}");
        assert_eq!(vars.values(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(vars.ids().count(), 2);
    }

    #[test]
    fn dependencies_use_placeholder_names_in_errors() {
        let mut vars = arena("${t:newType(i)} ${i:inner_expression(java.lang.Object)}");
        let t = vars.find("t").unwrap();
        let i = vars.find("i").unwrap();
        vars.add_dependency(i, t).unwrap();
        assert_eq!(vars.graph().master_of(t), Some(i));
        let err = vars.add_dependency(t, i).unwrap_err();
        assert_eq!(err, DependencyError::CycleDetected { master: "t".to_string(), slave: "i".to_string() });
    }

    #[test]
    fn document_offsets_accumulate() {
        let mut vars = arena("${n:newField(i)}");
        let n = vars.find("n").unwrap();
        vars.register_document_offset(n, 40);
        vars.register_document_offset(n, 90);
        assert_eq!(vars.get(n).unwrap().document_offsets, vec![40, 90]);
    }
}
