//! Maps a syntax node to the type it evaluates to.
use crate::catalog::TypeCatalog;
use crate::signature::{ROOT_TYPE, TypeSignature};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::types::{Symbol, SymbolBinding};

/// Read-only binding lookups over one analyzed file.
pub struct BindingResolver<'a> {
    catalog: &'a TypeCatalog,
    tree: &'a SyntaxTree,
}

impl<'a> BindingResolver<'a> {
    /// Resolver over `tree`, building bindings from `catalog`.
    pub const fn new(catalog: &'a TypeCatalog, tree: &'a SyntaxTree) -> Self {
        return Self { catalog, tree };
    }

    /// Binding of the type `node` evaluates to, or `None` when nothing is known.
    /// Callers treat `None` as the root type.
    pub fn resolve(&self, node: NodeId) -> Option<SymbolBinding> {
        return self.signature(node).map(|sig| return self.catalog.binding_for(&sig));
    }

    /// Signature of the type `node` evaluates to.
    ///
    /// Walks the subtree depth-first; every node kind with a dedicated rule
    /// overwrites the result and stops the descent below it, so the last rule
    /// applied in document order wins.
    pub fn signature(&self, node: NodeId) -> Option<TypeSignature> {
        if self.tree[node].kind == NodeKind::StringLiteral {
            return Some(TypeSignature::class("java.lang.String"));
        }
        let mut result = None;
        self.visit(node, &mut result);
        return result;
    }

    /// Qualified name of the node's type. Unknown types and nameless
    /// captures without a named bound fall back to the root type.
    pub fn type_string(&self, node: NodeId) -> String {
        let Some(binding) = self.resolve(node) else {
            return ROOT_TYPE.to_string();
        };
        if !binding.qualified_name.is_empty() {
            return binding.qualified_name;
        }
        return binding
            .bounds
            .iter()
            .map(ToString::to_string)
            .find(|name| return !name.is_empty())
            .unwrap_or_else(|| return ROOT_TYPE.to_string());
    }

    fn visit(&self, node: NodeId, result: &mut Option<TypeSignature>) {
        let current = &self.tree[node];
        match current.kind {
            NodeKind::MethodInvocation | NodeKind::SuperMethodInvocation => {
                result.clone_from(&current.expression_type);
            },
            NodeKind::SimpleName => match &current.symbol {
                Some(Symbol::Variable(sig)) => *result = Some(sig.clone()),
                Some(Symbol::Method { return_type }) => result.clone_from(return_type),
                Some(Symbol::Type(_)) | None => {},
            },
            NodeKind::QualifiedName => {
                if let Some(Symbol::Variable(sig)) = &current.symbol {
                    *result = Some(sig.clone());
                }
            },
            NodeKind::FieldAccess | NodeKind::SuperFieldAccess => {
                *result = current.expression_type.clone().or_else(|| {
                    let receiver = current.children.first()?;
                    return self.tree[*receiver].expression_type.clone().or_else(|| return self.signature(*receiver));
                });
            },
            NodeKind::Assignment => {
                let left = current.children.first().and_then(|lhs| return self.signature(*lhs));
                if left.is_some() {
                    *result = left;
                } else {
                    self.visit_children(node, result);
                }
            },
            NodeKind::ArrayAccess
            | NodeKind::ArrayCreation
            | NodeKind::BooleanLiteral
            | NodeKind::Cast
            | NodeKind::CharacterLiteral
            | NodeKind::ClassInstanceCreation
            | NodeKind::Infix
            | NodeKind::NumberLiteral
            | NodeKind::StringLiteral
            | NodeKind::TypeLiteral => result.clone_from(&current.expression_type),
            NodeKind::Block
            | NodeKind::Comment
            | NodeKind::CompilationUnit
            | NodeKind::ExpressionStatement
            | NodeKind::FieldDeclaration { .. }
            | NodeKind::ImportDeclaration
            | NodeKind::Javadoc
            | NodeKind::MethodDeclaration { .. }
            | NodeKind::NullLiteral
            | NodeKind::Other
            | NodeKind::PackageDeclaration
            | NodeKind::Parenthesized
            | NodeKind::SimpleType
            | NodeKind::TypeDeclaration { .. }
            | NodeKind::VariableDeclaration => self.visit_children(node, result),
        }
    }

    fn visit_children(&self, node: NodeId, result: &mut Option<TypeSignature>) {
        for child in &self.tree[node].children {
            self.visit(*child, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BindingKind;

    fn catalog() -> TypeCatalog {
        return TypeCatalog::builtin().unwrap();
    }

    fn typed(tree: &mut SyntaxTree, kind: NodeKind, range: std::ops::Range<usize>, parent: NodeId, ty: &str) -> NodeId {
        let id = tree.push(kind, range, parent);
        tree[id].expression_type = Some(TypeSignature::parse(ty).unwrap());
        return id;
    }

    #[test]
    fn string_literal_resolves_to_string() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("\"x\"");
        let root = tree.root();
        let lit = tree.push(NodeKind::StringLiteral, 0..3, root);
        let resolver = BindingResolver::new(&catalog, &tree);
        assert_eq!(resolver.type_string(lit), "java.lang.String");
    }

    #[test]
    fn simple_name_uses_variable_type() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("xs");
        let root = tree.root();
        let name = tree.push(NodeKind::SimpleName, 0..2, root);
        tree[name].symbol = Some(Symbol::Variable(TypeSignature::parse("java.util.List<java.lang.Integer>").unwrap()));
        let resolver = BindingResolver::new(&catalog, &tree);
        let binding = resolver.resolve(name).unwrap();
        assert_eq!(binding.kind, BindingKind::Interface);
        assert_eq!(binding.qualified_name, "java.util.List<java.lang.Integer>");
    }

    #[test]
    fn type_names_do_not_resolve() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("System");
        let root = tree.root();
        let name = tree.push(NodeKind::SimpleName, 0..6, root);
        tree[name].symbol = Some(Symbol::Type(TypeSignature::class("java.lang.System")));
        let resolver = BindingResolver::new(&catalog, &tree);
        assert!(resolver.resolve(name).is_none());
        assert_eq!(resolver.type_string(name), ROOT_TYPE);
    }

    #[test]
    fn field_access_falls_back_to_receiver() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("call().f");
        let root = tree.root();
        let access = tree.push(NodeKind::FieldAccess, 0..8, root);
        let _receiver = typed(&mut tree, NodeKind::MethodInvocation, 0..6, access, "java.lang.StringBuilder");
        let resolver = BindingResolver::new(&catalog, &tree);
        assert_eq!(resolver.type_string(access), "java.lang.StringBuilder");
    }

    #[test]
    fn assignment_prefers_left_side() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("n = 1");
        let root = tree.root();
        let assign = tree.push(NodeKind::Assignment, 0..5, root);
        let left = tree.push(NodeKind::SimpleName, 0..1, assign);
        tree[left].symbol = Some(Symbol::Variable(TypeSignature::class("java.lang.Number")));
        let _right = typed(&mut tree, NodeKind::NumberLiteral, 4..5, assign, "int");
        let resolver = BindingResolver::new(&catalog, &tree);
        assert_eq!(resolver.type_string(assign), "java.lang.Number");
    }

    #[test]
    fn statements_take_the_last_typed_child() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("(a + 1);");
        let root = tree.root();
        let stmt = tree.push(NodeKind::ExpressionStatement, 0..8, root);
        let parens = tree.push(NodeKind::Parenthesized, 0..7, stmt);
        let _infix = typed(&mut tree, NodeKind::Infix, 1..6, parens, "int");
        let resolver = BindingResolver::new(&catalog, &tree);
        let binding = resolver.resolve(stmt).unwrap();
        assert!(binding.is_primitive());
        assert_eq!(binding.qualified_name, "int");
    }

    #[test]
    fn capture_names_fall_back_to_bound() {
        let catalog = catalog();
        let mut tree = SyntaxTree::new("c");
        let root = tree.root();
        let name = tree.push(NodeKind::SimpleName, 0..1, root);
        let capture = TypeSignature::parse("capture-of ? extends java.lang.Number").unwrap();
        tree[name].symbol = Some(Symbol::Variable(capture));
        let resolver = BindingResolver::new(&catalog, &tree);
        assert_eq!(resolver.type_string(name), "java.lang.Number");
    }
}
