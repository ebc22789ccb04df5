//! Picks the expression a postfix template operates on.
//!
//! The search runs in three steps: find the completion node inside the
//! innermost member, find its best enclosing node, then keep whichever of the
//! two reaches furthest without passing the invocation offset.
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Upper bound on parenthesized wrappers climbed above an infix expression.
const MAX_PAREN_DEPTH: usize = 64;

/// The candidate nodes around the invocation offset and the one chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Node found by the member search.
    pub completion: NodeId,
    /// Best enclosing node of `completion`.
    pub parent: Option<NodeId>,
    /// The node templates operate on.
    pub selected: NodeId,
}

/// Run the whole selection at invocation offset `inv` (the offset of the dot).
/// `None` when the offset is not inside any member declaration.
pub fn select(tree: &SyntaxTree, inv: usize) -> Option<Selection> {
    let completion = completion_node(tree, inv)?;
    let parent = best_enclosing_node(tree, completion);
    let selected = select_best_node(tree, completion, parent, inv);
    return Some(Selection { completion, parent, selected });
}

/// Last candidate node, in document order, that starts before `inv` inside the
/// innermost member covering `inv`.
pub fn completion_node(tree: &SyntaxTree, inv: usize) -> Option<NodeId> {
    let member = tree.enclosing(tree.covering(inv), NodeKind::is_member)?;
    let mut best = member;
    visit(tree, member, inv, &mut best);
    return Some(best);
}

fn visit(tree: &SyntaxTree, id: NodeId, inv: usize, best: &mut NodeId) {
    let node = &tree[id];
    let starts_before = inv > node.start && node.start >= tree[*best].start;
    match node.kind {
        NodeKind::BooleanLiteral
        | NodeKind::ExpressionStatement
        | NodeKind::QualifiedName
        | NodeKind::SimpleName
        | NodeKind::StringLiteral => {
            if starts_before {
                *best = id;
            }
        },
        NodeKind::Javadoc => {
            if starts_before {
                *best = id;
            }
            return;
        },
        NodeKind::ClassInstanceCreation | NodeKind::MethodInvocation | NodeKind::SuperMethodInvocation => {
            if !node.recovered && inv > node.start && inv == node.end() {
                *best = id;
                return;
            }
        },
        _ => {},
    }
    for child in &node.children {
        visit(tree, *child, inv, best);
    }
}

/// The node a template should replace when `node` is the completion node.
///
/// Climbs from an infix operand through every parenthesized wrapper of the
/// infix expression, and from the name of a constructed type to the whole
/// instance creation.
pub fn best_enclosing_node(tree: &SyntaxTree, node: NodeId) -> Option<NodeId> {
    let mut result = tree.parent(node)?;
    if tree[result].kind == NodeKind::Infix {
        let mut depth = 0;
        while let Some(grand) = tree.parent(result)
            && tree[grand].kind == NodeKind::Parenthesized
            && depth < MAX_PAREN_DEPTH
        {
            result = grand;
            depth += 1;
        }
    }
    if tree[node].kind == NodeKind::SimpleName
        && tree[result].kind == NodeKind::SimpleType
        && let Some(grand) = tree.parent(result)
        && tree[grand].kind == NodeKind::ClassInstanceCreation
    {
        result = grand;
    }
    return Some(result);
}

/// Start offset used when measuring how far a candidate reaches.
///
/// A receiver of a call or field access begins where the whole access
/// begins, and a name begins where its outermost qualified name begins.
pub fn node_begin(tree: &SyntaxTree, node: NodeId) -> usize {
    if let Some(parent) = tree.parent(node)
        && matches!(tree[parent].kind, NodeKind::FieldAccess | NodeKind::MethodInvocation | NodeKind::SuperFieldAccess)
    {
        return tree[parent].start;
    }
    if tree[node].kind.is_name() {
        let mut outer = node;
        while let Some(parent) = tree.parent(outer)
            && tree[parent].kind == NodeKind::QualifiedName
        {
            outer = parent;
        }
        return tree[outer].start;
    }
    return tree[node].start;
}

/// Whichever candidate reaches furthest without passing `inv`; `current` when
/// neither does better.
pub fn select_best_node(tree: &SyntaxTree, current: NodeId, parent: Option<NodeId>, inv: usize) -> NodeId {
    let reach = |id: NodeId| return node_begin(tree, id).saturating_add(tree[id].len);
    let mut result = current;
    let mut max = reach(current);
    for candidate in [Some(current), parent].into_iter().flatten() {
        let end = reach(candidate);
        if end > max && end <= inv {
            max = end;
            result = candidate;
        }
    }
    return result;
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::catalog::TypeCatalog;
    use crate::frontend::{analyze, find_trigger};

    /// Analyze `source` with the cursor right after the first `marker`.
    fn selection(source: &str, marker: &str) -> (SyntaxTree, Option<Selection>, usize) {
        let cursor = source.find(marker).unwrap() + marker.len();
        let trigger = find_trigger(source, cursor).unwrap();
        let catalog = TypeCatalog::builtin().unwrap();
        let analysis = analyze(Path::new("Test.java"), source, Some(&trigger), &catalog).unwrap();
        let found = select(&analysis.tree, trigger.dot);
        return (analysis.tree, found, trigger.dot);
    }

    fn selected_text(source: &str, marker: &str) -> String {
        let (tree, found, _) = selection(source, marker);
        return tree.text(found.unwrap().selected).to_string();
    }

    fn method(body: &str) -> String {
        return format!("package p;\npublic class Test {{\n\tvoid m(String a, boolean b) {{\n\t\t{body}\n\t}}\n}}\n");
    }

    #[test]
    fn simple_name_is_selected() {
        assert_eq!(selected_text(&method("a.var"), "a.var"), "a");
    }

    #[test]
    fn method_invocation_chain_is_selected_whole() {
        assert_eq!(selected_text(&method("a.trim().toString().var"), ".var"), "a.trim().toString()");
    }

    #[test]
    fn qualified_name_is_selected_whole() {
        assert_eq!(selected_text(&method("System.out.nn"), ".nn"), "System.out");
    }

    #[test]
    fn parenthesized_infix_is_selected() {
        assert_eq!(selected_text(&method("(\"x\" + 1).var"), ".var"), "(\"x\" + 1)");
    }

    #[test]
    fn instance_creation_is_selected() {
        assert_eq!(selected_text(&method("new StringBuilder().var"), ".var"), "new StringBuilder()");
    }

    #[test]
    fn selection_is_idempotent() {
        let source = method("a.length().var");
        let (tree, first, dot) = selection(&source, ".var");
        assert_eq!(select(&tree, dot), first);
        assert_eq!(select(&tree, dot), first);
    }

    #[test]
    fn import_declarations_have_no_member() {
        let source = "package p;\nimport static java.util.Collections.;\npublic class Test {}\n";
        let (_, found, _) = selection(source, "Collections.");
        assert!(found.is_none());
    }

    #[test]
    fn javadoc_is_selected_but_not_entered() {
        let source = "package p;\npublic enum Test {\n\t/**\n\t * Match the first letter.\n\t */\n\tFIRST;\n}\n";
        let (tree, found, _) = selection(source, "letter.");
        assert_eq!(tree[found.unwrap().selected].kind, NodeKind::Javadoc);
    }

    #[test]
    fn receivers_begin_at_their_access() {
        let source = method("a.trim().var");
        let (tree, found, _) = selection(&source, ".var");
        let call = found.unwrap().selected;
        let receiver = tree[call].children[0];
        assert_eq!(node_begin(&tree, receiver), tree[call].start);
    }
}
