//! Offset-scoped declaration table for variables and fields.
use std::collections::BTreeSet;
use std::ops::Range;

use crate::signature::TypeSignature;

/// How a name was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A field of an enclosing type.
    Field {
        /// Whether the field is static.
        is_static: bool,
    },
    /// A local variable, resource, or loop variable.
    Local,
    /// A method, constructor, lambda, or catch parameter.
    Parameter,
}

impl DeclarationKind {
    /// Short human-readable name.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Field { is_static: true } => "static field",
            Self::Field { is_static: false } => "field",
            Self::Local => "local",
            Self::Parameter => "parameter",
        };
    }
}

/// One declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Declaration kind.
    pub kind: DeclarationKind,
    /// Declared name.
    pub name: String,
    /// Byte range in which the name is visible.
    pub scope: Range<usize>,
    /// Declared (or inferred) type.
    pub signature: TypeSignature,
}

/// Every declaration in one file.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    entries: Vec<Declaration>,
}

impl Declarations {
    /// Record a declaration.
    pub fn declare(&mut self, declaration: Declaration) {
        self.entries.push(declaration);
    }

    /// The innermost declaration of `name` visible at `offset`. Inner scopes
    /// start later, so the latest-starting match shadows the others.
    pub fn lookup(&self, name: &str, offset: usize) -> Option<&Declaration> {
        return self
            .entries
            .iter()
            .filter(|d| return d.name == name && d.scope.contains(&offset))
            .max_by_key(|d| return d.scope.start);
    }

    /// Every declaration visible at `offset`, shadowed ones included.
    pub fn visible(&self, offset: usize) -> impl Iterator<Item = &Declaration> + '_ {
        return self.entries.iter().filter(move |d| return d.scope.contains(&offset));
    }

    /// Every name visible at `offset`.
    pub fn visible_names(&self, offset: usize) -> BTreeSet<String> {
        return self.visible(offset).map(|d| return d.name.clone()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declare(decls: &mut Declarations, name: &str, kind: DeclarationKind, scope: Range<usize>, ty: &str) {
        decls.declare(Declaration { kind, name: name.to_string(), scope, signature: TypeSignature::class(ty) });
    }

    #[test]
    fn locals_shadow_fields() {
        let mut decls = Declarations::default();
        declare(&mut decls, "a", DeclarationKind::Field { is_static: false }, 0..100, "java.lang.Integer");
        declare(&mut decls, "a", DeclarationKind::Local, 40..80, "java.lang.String");
        assert_eq!(decls.lookup("a", 50).unwrap().signature, TypeSignature::class("java.lang.String"));
        assert_eq!(decls.lookup("a", 90).unwrap().signature, TypeSignature::class("java.lang.Integer"));
        assert!(decls.lookup("a", 100).is_none());
    }

    #[test]
    fn visible_names_respect_scope() {
        let mut decls = Declarations::default();
        declare(&mut decls, "f", DeclarationKind::Field { is_static: true }, 0..100, "int");
        declare(&mut decls, "x", DeclarationKind::Local, 10..20, "int");
        declare(&mut decls, "y", DeclarationKind::Parameter, 30..60, "int");
        let names: Vec<String> = decls.visible_names(35).into_iter().collect();
        assert_eq!(names, vec!["f".to_string(), "y".to_string()]);
        let labels: Vec<&str> = decls.visible(15).map(|d| return d.kind.label()).collect();
        assert_eq!(labels, vec!["static field", "local"]);
    }
}
