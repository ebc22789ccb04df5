//! Arena-backed syntax tree handed to the completion engine.
//!
//! Nodes are addressed by `NodeId`, which only this arena mints. Every node
//! records its byte span, parent, children, and whatever the binder attached.
use std::ops::{Index, IndexMut, Range};

use crate::scope::Declarations;
use crate::signature::TypeSignature;
use crate::types::Symbol;

/// Handle to a node in a `SyntaxTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Closed set of node kinds the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `new T[n]` or `new T[] { .. }`.
    ArrayCreation,
    /// `a[i]`.
    ArrayAccess,
    /// `a = b` and compound assignments.
    Assignment,
    /// `{ .. }` statement block.
    Block,
    /// `true` or `false`.
    BooleanLiteral,
    /// `(T) e`.
    Cast,
    /// `'c'`.
    CharacterLiteral,
    /// `new T(..)`.
    ClassInstanceCreation,
    /// A non-documentation comment.
    Comment,
    /// The whole file.
    CompilationUnit,
    /// An expression followed by `;`.
    ExpressionStatement,
    /// `expr.name` where `expr` is not a plain name.
    FieldAccess,
    /// A field declaration.
    FieldDeclaration {
        /// Modifier keywords written on the declaration.
        modifiers: Modifiers,
    },
    /// `import a.b.C;`.
    ImportDeclaration,
    /// Binary operator expression.
    Infix,
    /// `/** .. */`.
    Javadoc,
    /// Method or constructor declaration.
    MethodDeclaration {
        /// Whether the method carries the `static` modifier.
        is_static: bool,
    },
    /// `recv.name(..)` or `name(..)`.
    MethodInvocation,
    /// `null`.
    NullLiteral,
    /// Numeric literal.
    NumberLiteral,
    /// Anything the engine does not distinguish.
    Other,
    /// `package a.b;`.
    PackageDeclaration,
    /// `( expr )`.
    Parenthesized,
    /// Dotted name made only of identifiers.
    QualifiedName,
    /// Single identifier.
    SimpleName,
    /// A type written as a single identifier.
    SimpleType,
    /// String literal or text block.
    StringLiteral,
    /// `super.name`.
    SuperFieldAccess,
    /// `super.name(..)`.
    SuperMethodInvocation,
    /// Class, interface, enum, or record declaration.
    TypeDeclaration {
        /// Offset just past the opening brace of the body.
        body_start: usize,
    },
    /// `T.class`.
    TypeLiteral,
    /// Local variable declaration statement.
    VariableDeclaration,
}

impl NodeKind {
    /// Whether the kind is a member declaration (type, method, or field).
    pub const fn is_member(self) -> bool {
        return matches!(self, Self::FieldDeclaration { .. } | Self::MethodDeclaration { .. } | Self::TypeDeclaration { .. });
    }

    /// Whether the kind is a name (simple or qualified).
    pub const fn is_name(self) -> bool {
        return matches!(self, Self::QualifiedName | Self::SimpleName);
    }
}

/// Set of Java modifier keywords written on a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const ABSTRACT: Self = Self(1);
    pub const FINAL: Self = Self(2);
    pub const NATIVE: Self = Self(4);
    pub const PRIVATE: Self = Self(8);
    pub const PROTECTED: Self = Self(16);
    pub const PUBLIC: Self = Self(32);
    pub const STATIC: Self = Self(64);
    pub const STRICTFP: Self = Self(128);
    pub const SYNCHRONIZED: Self = Self(256);
    pub const TRANSIENT: Self = Self(512);
    pub const VOLATILE: Self = Self(1024);

    /// The modifier a keyword denotes; annotations and unknown words have none.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        return match keyword {
            "abstract" => Some(Self::ABSTRACT),
            "final" => Some(Self::FINAL),
            "native" => Some(Self::NATIVE),
            "private" => Some(Self::PRIVATE),
            "protected" => Some(Self::PROTECTED),
            "public" => Some(Self::PUBLIC),
            "static" => Some(Self::STATIC),
            "strictfp" => Some(Self::STRICTFP),
            "synchronized" => Some(Self::SYNCHRONIZED),
            "transient" => Some(Self::TRANSIENT),
            "volatile" => Some(Self::VOLATILE),
            _ => None,
        };
    }

    /// Both sets combined.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        return Self(self.0 | other.0);
    }

    /// Whether every modifier of `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        return self.0 & other.0 == other.0;
    }
}

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    /// Children in source order.
    pub children: Vec<NodeId>,
    /// Static type of the node when it is an expression the binder could type.
    pub expression_type: Option<TypeSignature>,
    /// Node kind.
    pub kind: NodeKind,
    /// Length in bytes.
    pub len: usize,
    /// Enclosing node; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Whether the node was produced by error recovery.
    pub recovered: bool,
    /// Start byte offset.
    pub start: usize,
    /// What the node names, for name nodes.
    pub symbol: Option<Symbol>,
}

impl SyntaxNode {
    /// End byte offset (exclusive).
    pub const fn end(&self) -> usize {
        return self.start.saturating_add(self.len);
    }

    /// Byte range covered.
    pub const fn range(&self) -> Range<usize> {
        return self.start..self.end();
    }
}

/// File-level facts the import collaborator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFacts {
    /// Simple name to qualified name of every type declared in the file.
    pub declared_types: Vec<(String, String)>,
    /// Offset where a new import line is inserted.
    pub import_offset: usize,
    /// Text inserted before the first import when the file has none yet.
    pub import_separator: String,
    /// Packages imported on demand (`import a.b.*;`).
    pub on_demand_imports: Vec<String>,
    /// Declared package, if any.
    pub package: Option<String>,
    /// Single-type imports, qualified.
    pub single_imports: Vec<String>,
}

/// An analyzed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    /// Variables and fields visible per offset.
    pub declarations: Declarations,
    nodes: Vec<SyntaxNode>,
    /// Original document text.
    pub source: String,
    /// Package, imports, and declared types.
    pub unit: UnitFacts,
}

impl SyntaxTree {
    /// A tree holding only a root node spanning `source`.
    pub fn new(source: &str) -> Self {
        let root = SyntaxNode {
            children: Vec::new(),
            expression_type: None,
            kind: NodeKind::CompilationUnit,
            len: source.len(),
            parent: None,
            recovered: false,
            start: 0,
            symbol: None,
        };
        return Self {
            declarations: Declarations::default(),
            nodes: vec![root],
            source: source.to_string(),
            unit: UnitFacts::default(),
        };
    }

    /// The root node.
    pub const fn root(&self) -> NodeId {
        return NodeId(0);
    }

    /// Append a child of `parent` covering `range`.
    pub fn push(&mut self, kind: NodeKind, range: Range<usize>, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SyntaxNode {
            children: Vec::new(),
            expression_type: None,
            kind,
            len: range.end.saturating_sub(range.start),
            parent: Some(parent),
            recovered: false,
            start: range.start,
            symbol: None,
        });
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        return id;
    }

    /// Source text of a node, or `""` if its span is not on character boundaries.
    pub fn text(&self, id: NodeId) -> &str {
        return self.source.get(self[id].range()).unwrap_or("");
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        return self[id].parent;
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        return std::iter::successors(self.parent(id), |p| return self.parent(*p));
    }

    /// Nearest ancestor (or the node itself) whose kind satisfies `pred`.
    pub fn enclosing(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
        return std::iter::once(id).chain(self.ancestors(id)).find(|n| return pred(self[*n].kind));
    }

    /// Deepest node whose span contains `offset` (end inclusive), starting at the root.
    pub fn covering(&self, offset: usize) -> NodeId {
        let mut current = self.root();
        'descend: loop {
            for child in &self[current].children {
                let node = &self[*child];
                if node.start <= offset && offset <= node.end() {
                    current = *child;
                    continue 'descend;
                }
            }
            return current;
        }
    }
}

#[allow(clippy::indexing_slicing, reason = "NodeId values are only minted by this arena")]
impl Index<NodeId> for SyntaxTree {
    type Output = SyntaxNode;

    fn index(&self, id: NodeId) -> &SyntaxNode {
        return &self.nodes[id.0];
    }
}

#[allow(clippy::indexing_slicing, reason = "NodeId values are only minted by this arena")]
impl IndexMut<NodeId> for SyntaxTree {
    fn index_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        return &mut self.nodes[id.0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_links_parent_and_children() {
        let mut tree = SyntaxTree::new("a.b;");
        let root = tree.root();
        let stmt = tree.push(NodeKind::ExpressionStatement, 0..4, root);
        let name = tree.push(NodeKind::QualifiedName, 0..3, stmt);
        assert_eq!(tree.parent(name), Some(stmt));
        assert_eq!(tree[stmt].children, vec![name]);
        assert_eq!(tree.text(name), "a.b");
        assert_eq!(tree.ancestors(name).collect::<Vec<_>>(), vec![stmt, root]);
    }

    #[test]
    fn covering_finds_deepest_node() {
        let mut tree = SyntaxTree::new("foo(bar)");
        let root = tree.root();
        let call = tree.push(NodeKind::MethodInvocation, 0..8, root);
        let _name = tree.push(NodeKind::SimpleName, 0..3, call);
        let arg = tree.push(NodeKind::SimpleName, 4..7, call);
        assert_eq!(tree.covering(5), arg);
        assert_eq!(tree.enclosing(arg, |k| return k == NodeKind::MethodInvocation), Some(call));
    }
}
