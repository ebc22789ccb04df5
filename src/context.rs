//! Everything one postfix completion request knows about the cursor.
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::binding::BindingResolver;
use crate::catalog::TypeCatalog;
use crate::error::TemplateError;
use crate::frontend::{Analysis, Trigger};
use crate::hierarchy;
use crate::selector::{self, Selection};
use crate::syntax::{Modifiers, NodeId, NodeKind, SyntaxTree, UnitFacts};
use crate::template::{POSTFIX_CONTEXT, Template};
use crate::types::Symbol;

/// Inner-expression placeholders that declare type constraints.
static INNER_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\$\{([a-zA-Z]*):inner_expression\(([^\$|\{|\}]*)\)\}").expect("valid regex"));

/// Constraint parameter that never filters a template.
pub const NO_VALUE: &str = "novalue";

/// Where a new field declaration goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInsertion {
    /// Whitespace placed before the declaration on its own line.
    pub indent: String,
    /// Whether the code at the cursor runs in a static context.
    pub is_static: bool,
    /// Offset just past the last earlier field declared with the same
    /// modifiers, or just past the opening brace of the type body.
    pub offset: usize,
}

/// A completion request at one trigger in one analyzed file.
pub struct PostfixContext<'a> {
    analysis: &'a Analysis,
    resolver: BindingResolver<'a>,
    selection: Option<Selection>,
    trigger: &'a Trigger,
}

impl<'a> PostfixContext<'a> {
    /// Select the target node for `trigger` in `analysis`.
    pub fn new(analysis: &'a Analysis, trigger: &'a Trigger) -> Self {
        let selection = selector::select(&analysis.tree, trigger.dot);
        return Self { analysis, resolver: BindingResolver::new(&analysis.catalog, &analysis.tree), selection, trigger };
    }

    /// The node search result, if the trigger is inside a member.
    pub const fn selection(&self) -> Option<Selection> {
        return self.selection;
    }

    /// The node templates operate on.
    pub fn selected(&self) -> Option<NodeId> {
        return self.selection.map(|s| return s.selected);
    }

    /// The analyzed file.
    pub const fn tree(&self) -> &SyntaxTree {
        return &self.analysis.tree;
    }

    /// Types known while resolving this request.
    pub const fn catalog(&self) -> &TypeCatalog {
        return &self.analysis.catalog;
    }

    /// Package and import facts of the file.
    pub const fn unit(&self) -> &UnitFacts {
        return &self.analysis.tree.unit;
    }

    /// Whether `template` can be offered for the selected node.
    pub fn can_evaluate(&self, template: &Template) -> bool {
        if template.context != POSTFIX_CONTEXT {
            return false;
        }
        let Some(selected) = self.selected() else {
            return false;
        };
        let node = &self.tree()[selected];
        if matches!(node.kind, NodeKind::Javadoc | NodeKind::Comment) {
            return false;
        }
        if !template.name.to_lowercase().starts_with(&self.trigger.prefix.to_lowercase()) {
            return false;
        }
        if node.kind == NodeKind::SimpleName
            && !node.recovered
            && matches!(node.symbol, Some(Symbol::Method { .. } | Symbol::Type(_)))
        {
            return false;
        }

        let binding = self.resolver.resolve(selected);
        let mut satisfied = true;
        for captures in INNER_EXPRESSION.captures_iter(&template.pattern) {
            let params = captures.get(2).map_or("", |m| return m.as_str());
            for param in params.split(',').filter(|p| return *p != NO_VALUE) {
                satisfied = false;
                if hierarchy::resolves_to(self.catalog(), binding.as_ref(), param.trim()) {
                    return true;
                }
            }
        }
        return satisfied;
    }

    /// Span of the selected expression, up to the dot.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::BadLocation` when nothing is selected or the
    /// span does not lie inside the document.
    pub fn affected_region(&self) -> Result<Range<usize>, TemplateError> {
        let len = self.tree().source.len();
        let start = self.selected().map_or(usize::MAX, |s| return selector::node_begin(self.tree(), s));
        let end = self.trigger.dot;
        if start > end || end > len {
            return Err(TemplateError::BadLocation { end, len, offset: start });
        }
        return Ok(start..end);
    }

    /// Source text of the affected region.
    ///
    /// # Errors
    ///
    /// Propagates `TemplateError::BadLocation` from `affected_region`.
    pub fn affected_text(&self) -> Result<&str, TemplateError> {
        let region = self.affected_region()?;
        let len = self.tree().source.len();
        return self
            .tree()
            .source
            .get(region.clone())
            .ok_or(TemplateError::BadLocation { end: region.end, len, offset: region.start });
    }

    /// Text replaced by the snippet: the expression, the dot, and the prefix.
    ///
    /// # Errors
    ///
    /// Propagates `TemplateError::BadLocation` from `affected_region`.
    pub fn replace_range(&self) -> Result<Range<usize>, TemplateError> {
        let region = self.affected_region()?;
        return Ok(region.start..self.trigger.cursor);
    }

    /// Qualified type of the selected node; unknown types are the root type.
    pub fn inner_type(&self) -> String {
        return self.selected().map_or_else(
            || return crate::signature::ROOT_TYPE.to_string(),
            |s| return self.resolver.type_string(s),
        );
    }

    /// Every variable name visible at the dot.
    pub fn visible_names(&self) -> BTreeSet<String> {
        return self.tree().declarations.visible_names(self.trigger.dot);
    }

    /// Where a field for the selected expression would be declared.
    ///
    /// The field is `private`, plus `static` in a static context, and is
    /// grouped after the last field above the cursor with exactly those
    /// modifiers.
    pub fn field_insertion(&self) -> Option<FieldInsertion> {
        let tree = self.tree();
        let selected = self.selected()?;
        let owner = tree.enclosing(selected, |k| return matches!(k, NodeKind::TypeDeclaration { .. }))?;
        let NodeKind::TypeDeclaration { body_start } = tree[owner].kind else {
            return None;
        };
        let is_static = tree
            .enclosing(selected, |k| return matches!(k, NodeKind::FieldDeclaration { .. } | NodeKind::MethodDeclaration { .. }))
            .is_some_and(|member| {
                return match tree[member].kind {
                    NodeKind::FieldDeclaration { modifiers } => modifiers.contains(Modifiers::STATIC),
                    NodeKind::MethodDeclaration { is_static } => is_static,
                    _ => false,
                };
            });
        let modifiers = if is_static { Modifiers::PRIVATE.with(Modifiers::STATIC) } else { Modifiers::PRIVATE };
        let offset = last_field_with(tree, owner, modifiers, self.trigger.dot).map_or(body_start, |field| return tree[field].end());
        let line_start = tree.source.get(..tree[owner].start).and_then(|s| return s.rfind('\n')).map_or(0, |i| return i.saturating_add(1));
        let leading: String = tree
            .source
            .get(line_start..)
            .unwrap_or("")
            .chars()
            .take_while(|c| return *c == ' ' || *c == '\t')
            .collect();
        return Some(FieldInsertion { indent: format!("{leading}\t"), is_static, offset });
    }
}

/// The last field of `owner` (not of nested types) ending before `before`
/// whose modifiers are exactly `modifiers`.
fn last_field_with(tree: &SyntaxTree, owner: NodeId, modifiers: Modifiers, before: usize) -> Option<NodeId> {
    let mut found: Option<NodeId> = None;
    let mut pending = tree[owner].children.clone();
    while let Some(id) = pending.pop() {
        let node = &tree[id];
        match node.kind {
            NodeKind::FieldDeclaration { modifiers: declared } => {
                let later = found.is_none_or(|f| return tree[f].start < node.start);
                if declared == modifiers && node.end() < before && later {
                    found = Some(id);
                }
            },
            NodeKind::MethodDeclaration { .. } | NodeKind::TypeDeclaration { .. } => {},
            _ => pending.extend(node.children.iter().copied()),
        }
    }
    return found;
}
