//! Identifier suggestions for new locals, loop indices, and fields.
use std::collections::BTreeSet;

use crate::signature::simple_name;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::types::Symbol;

/// Reserved words that can never be suggested as they are.
const KEYWORDS: [&str; 53] = [
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "false",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "true",
    "try",
    "void",
    "volatile",
    "while",
];

/// Accessor prefixes dropped from method names.
const ACCESSOR_PREFIXES: [&str; 3] = ["get", "is", "to"];

/// Loop index names, tried in order.
const INDEX_NAMES: [&str; 6] = ["i", "j", "k", "l", "m", "n"];

/// Used when nothing else yields a usable identifier.
const FALLBACK_NAME: &str = "name";

/// Base name for a variable holding the value of `node`.
///
/// `type_name` is the qualified type of the node, used when the expression
/// itself carries no name.
pub fn base_name(tree: &SyntaxTree, node: NodeId, type_name: &str) -> String {
    let derived = expression_name(tree, node).unwrap_or_else(|| return type_base_name(type_name));
    return sanitize(&derived);
}

/// Base name for a value of type `type_name` when no expression is at hand.
pub fn base_name_of_type(type_name: &str) -> String {
    return sanitize(&type_base_name(type_name));
}

/// `base` made unique against `taken` by appending 2, 3, ….
pub fn unique_name(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    return (2_usize..)
        .map(|n| return format!("{base}{n}"))
        .find(|candidate| return !taken.contains(candidate))
        .unwrap_or_else(|| return base.to_string());
}

/// Loop index name: the derived name when there is one, otherwise the first
/// free of `i` to `n`, then `i2`, `i3`, ….
pub fn index_name(derived: Option<&str>, taken: &BTreeSet<String>) -> String {
    if let Some(name) = derived.filter(|n| return !n.is_empty()) {
        return unique_name(name, taken);
    }
    if let Some(free) = INDEX_NAMES.iter().find(|n| return !taken.contains(**n)) {
        return (*free).to_string();
    }
    return unique_name("i", taken);
}

fn expression_name(tree: &SyntaxTree, node: NodeId) -> Option<String> {
    let current = &tree[node];
    return match current.kind {
        NodeKind::SimpleName => Some(tree.text(node).to_string()),
        NodeKind::QualifiedName | NodeKind::FieldAccess | NodeKind::SuperFieldAccess => {
            let last = current.children.iter().rev().find(|c| return tree[**c].kind == NodeKind::SimpleName)?;
            Some(tree.text(*last).to_string())
        },
        NodeKind::MethodInvocation | NodeKind::SuperMethodInvocation => {
            let name = current.children.iter().find(|c| {
                return tree[**c].kind == NodeKind::SimpleName && matches!(tree[**c].symbol, Some(Symbol::Method { .. }));
            })?;
            Some(strip_accessor(tree.text(*name)))
        },
        NodeKind::ExpressionStatement | NodeKind::Parenthesized => {
            current.children.iter().find(|c| return tree[**c].kind != NodeKind::Comment).and_then(|c| return expression_name(tree, *c))
        },
        _ => None,
    };
}

fn strip_accessor(method: &str) -> String {
    for prefix in ACCESSOR_PREFIXES {
        if let Some(rest) = method.strip_prefix(prefix)
            && rest.starts_with(|c: char| return c.is_uppercase())
        {
            return decapitalize(rest);
        }
    }
    return method.to_string();
}

/// Decapitalized simple type name without type arguments or array markers.
fn type_base_name(type_name: &str) -> String {
    let erased = type_name.split('<').next().unwrap_or(type_name).trim_end_matches("[]");
    return decapitalize(simple_name(erased));
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    return match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| return c.is_alphanumeric() || *c == '_' || *c == '$').collect();
    let cleaned = cleaned.trim_start_matches(|c: char| return c.is_ascii_digit());
    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    if KEYWORDS.contains(&cleaned) {
        return cleaned.chars().take(1).collect();
    }
    return cleaned.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> BTreeSet<String> {
        return names.iter().map(ToString::to_string).collect();
    }

    #[test]
    fn names_gain_a_counter_when_taken() {
        assert_eq!(unique_name("a", &taken(&["a"])), "a2");
        assert_eq!(unique_name("a", &taken(&["a", "a2", "a3"])), "a4");
        assert_eq!(unique_name("list", &taken(&["a"])), "list");
    }

    #[test]
    fn index_prefers_the_derived_name() {
        assert_eq!(index_name(Some("a"), &taken(&["a"])), "a2");
        assert_eq!(index_name(None, &taken(&["i", "j"])), "k");
        assert_eq!(index_name(Some(""), &taken(&["i", "j", "k", "l", "m", "n", "i2"])), "i3");
    }

    #[test]
    fn accessors_lose_their_prefix() {
        assert_eq!(strip_accessor("getName"), "name");
        assert_eq!(strip_accessor("isEmpty"), "empty");
        assert_eq!(strip_accessor("toArray"), "array");
        assert_eq!(strip_accessor("isolate"), "isolate");
        assert_eq!(strip_accessor("emptyList"), "emptyList");
    }

    #[test]
    fn type_names_are_decapitalized() {
        assert_eq!(type_base_name("java.util.ArrayList<java.lang.String>"), "arrayList");
        assert_eq!(type_base_name("java.lang.String[]"), "string");
    }

    #[test]
    fn keywords_fall_back_to_their_first_letter() {
        assert_eq!(sanitize("int"), "i");
        assert_eq!(sanitize("class"), "c");
        assert_eq!(sanitize(""), FALLBACK_NAME);
    }

    #[test]
    fn expression_shapes_yield_names() {
        let mut tree = SyntaxTree::new("System.out");
        let root = tree.root();
        let qualified = tree.push(NodeKind::QualifiedName, 0..10, root);
        let _system = tree.push(NodeKind::SimpleName, 0..6, qualified);
        let _out = tree.push(NodeKind::SimpleName, 7..10, qualified);
        assert_eq!(base_name(&tree, qualified, "java.io.PrintStream"), "out");

        let mut tree = SyntaxTree::new("c.getSize()");
        let root = tree.root();
        let call = tree.push(NodeKind::MethodInvocation, 0..11, root);
        let _receiver = tree.push(NodeKind::SimpleName, 0..1, call);
        let name = tree.push(NodeKind::SimpleName, 2..9, call);
        tree[name].symbol = Some(Symbol::Method { return_type: None });
        assert_eq!(base_name(&tree, call, "int"), "size");

        let mut tree = SyntaxTree::new("1 + 2");
        let root = tree.root();
        let infix = tree.push(NodeKind::Infix, 0..5, root);
        assert_eq!(base_name(&tree, infix, "int"), "i");
    }
}
