//! Java front-end: parses a file with tree-sitter, binds names against the
//! declarations it finds and the type catalog, and lowers the result into the
//! engine's `SyntaxTree`.
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use tree_sitter::Node;

use crate::catalog::{DeclKind, TypeCatalog, TypeDecl};
use crate::error::Error;
use crate::grammar;
use crate::scope::{Declaration, DeclarationKind, Declarations};
use crate::signature::{self, ROOT_TYPE, TypeSignature};
use crate::syntax::{Modifiers, NodeId, NodeKind, SyntaxTree, UnitFacts};
use crate::types::Symbol;

/// Package whose types are visible without an import.
const IMPLICIT_PACKAGE: &str = "java.lang";

/// The `.<prefix>` typed just before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Cursor offset (end of the prefix).
    pub cursor: usize,
    /// Offset of the `.` before the prefix; the invocation offset.
    pub dot: usize,
    /// Identifier characters typed after the dot.
    pub prefix: String,
}

/// A parsed and bound file, plus the catalog extended with its types.
pub struct Analysis {
    /// Catalog including the file's own type declarations.
    pub catalog: TypeCatalog,
    /// Lowered tree.
    pub tree: SyntaxTree,
}

/// Locate the postfix trigger ending at `cursor`.
pub fn find_trigger(source: &str, cursor: usize) -> Option<Trigger> {
    let before = source.get(..cursor)?;
    let prefix_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| return is_identifier_char(*c))
        .last()
        .map_or(cursor, |(i, _)| return i);
    let prefix = before.get(prefix_start..)?;
    if prefix.starts_with(|c: char| return c.is_ascii_digit()) {
        return None;
    }
    let head = before.get(..prefix_start)?;
    if !head.ends_with('.') || head.trim_end_matches('.').trim_end().is_empty() {
        return None;
    }
    return Some(Trigger { cursor, dot: prefix_start.saturating_sub(1), prefix: prefix.to_string() });
}

/// Replace `.<prefix>` with `;` and spaces so the receiver parses as a
/// statement. Every byte offset is preserved.
pub fn blank_trigger(source: &str, trigger: &Trigger) -> String {
    let mut text = String::with_capacity(source.len());
    text.push_str(source.get(..trigger.dot).unwrap_or(""));
    text.push(';');
    text.push_str(&" ".repeat(trigger.cursor.saturating_sub(trigger.dot).saturating_sub(1)));
    text.push_str(source.get(trigger.cursor..).unwrap_or(""));
    return text;
}

/// Parse, bind, and lower `source`.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for non-Java paths, `Error::ParseFailed`
/// if tree-sitter fails, or `Error::InvalidSignature` if the file's own
/// declarations cannot be added to the catalog.
pub fn analyze(path: &Path, source: &str, trigger: Option<&Trigger>, catalog: &TypeCatalog) -> Result<Analysis, Error> {
    let text = trigger.map_or_else(|| return source.to_string(), |t| return blank_trigger(source, t));
    let language = grammar::language_for_path(path)?;
    let cst = grammar::parse_source(path, &text, &language)?;
    let program = cst.root_node();

    let mut binder = Binder {
        catalog: catalog.clone(),
        declarations: Declarations::default(),
        text: &text,
        types: Vec::new(),
        unit: UnitFacts::default(),
    };
    binder.collect_header(program);
    binder.collect_type_names(program, None);
    let mut decls = Vec::new();
    binder.collect_members(program, &mut decls);
    binder.catalog.extend(decls)?;
    binder.collect_locals(program);

    let mut tree = SyntaxTree::new(source);
    let root = tree.root();
    for child in named_children(program) {
        binder.lower(child, root, false, &mut tree);
    }
    tree.declarations = binder.declarations;
    tree.unit = binder.unit;
    return Ok(Analysis { catalog: binder.catalog, tree });
}

/// What a name or receiver expression denotes.
enum Reference {
    /// A package (or an unresolvable leading segment).
    Package(String),
    /// A type name.
    Type(TypeSignature),
    /// Nothing known.
    Unknown,
    /// A value of the given type.
    Value(TypeSignature),
}

/// A type declared in the file and the span it covers.
struct TypeScope {
    name: String,
    range: Range<usize>,
}

/// Name binding state for one file.
struct Binder<'s> {
    catalog: TypeCatalog,
    declarations: Declarations,
    text: &'s str,
    types: Vec<TypeScope>,
    unit: UnitFacts,
}

impl<'s> Binder<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        return self.text.get(node.byte_range()).unwrap_or("");
    }

    // ── Collection ─────────────────────────────────────────────────────

    /// Package, imports, and the import insertion point.
    fn collect_header(&mut self, program: Node<'_>) {
        let mut package_end = None;
        let mut import_end = None;
        for child in named_children(program) {
            let path = named_children(child)
                .into_iter()
                .find(|c| return matches!(c.kind(), "identifier" | "scoped_identifier"))
                .map(|c| return compact(self.text(c)));
            match child.kind() {
                "package_declaration" => {
                    self.unit.package = path;
                    package_end = Some(child.end_byte());
                },
                "import_declaration" => {
                    import_end = Some(child.end_byte());
                    let tokens = all_children(child);
                    if tokens.iter().any(|c| return c.kind() == "static") {
                        continue;
                    }
                    let Some(path) = path else {
                        continue;
                    };
                    if tokens.iter().any(|c| return c.kind() == "asterisk") {
                        self.unit.on_demand_imports.push(path);
                    } else {
                        self.unit.single_imports.push(path);
                    }
                },
                _ => {},
            }
        }

        let (anchor, separator) = match (import_end, package_end) {
            (Some(end), _) => (Some(end), ""),
            (None, Some(end)) => (Some(end), "\n"),
            (None, None) => (None, ""),
        };
        let Some(anchor) = anchor else {
            return;
        };
        match self.text.get(anchor..).and_then(|rest| return rest.find('\n')) {
            Some(newline) => {
                self.unit.import_offset = anchor.saturating_add(newline).saturating_add(1);
                self.unit.import_separator = separator.to_string();
            },
            None => {
                self.unit.import_offset = self.text.len();
                self.unit.import_separator = format!("\n{separator}");
            },
        }
    }

    /// Register every top-level and nested type name before anything is resolved.
    fn collect_type_names(&mut self, node: Node<'_>, outer: Option<&str>) {
        for child in body_members(node) {
            if !is_type_declaration(child.kind()) {
                continue;
            }
            let Some(name) = child.child_by_field_name("name") else {
                continue;
            };
            let simple = self.text(name).to_string();
            let qualified = match (outer, &self.unit.package) {
                (Some(o), _) => format!("{o}.{simple}"),
                (None, Some(package)) => format!("{package}.{simple}"),
                (None, None) => simple.clone(),
            };
            self.unit.declared_types.push((simple, qualified.clone()));
            self.types.push(TypeScope { name: qualified.clone(), range: child.byte_range() });
            if let Some(body) = child.child_by_field_name("body") {
                self.collect_type_names(body, Some(&qualified));
            }
        }
    }

    /// Build catalog declarations for the file's types and declare their fields.
    fn collect_members(&mut self, node: Node<'_>, decls: &mut Vec<TypeDecl>) {
        for child in body_members(node) {
            if is_type_declaration(child.kind()) {
                self.collect_type(child, decls);
            }
        }
    }

    fn collect_type(&mut self, node: Node<'_>, decls: &mut Vec<TypeDecl>) {
        let Some(name) = self.type_scope_name(node) else {
            return;
        };
        let kind = if matches!(node.kind(), "interface_declaration" | "annotation_type_declaration") {
            DeclKind::Interface
        } else {
            DeclKind::Class
        };
        let mut decl = TypeDecl {
            fields: BTreeMap::new(),
            interfaces: Vec::new(),
            kind,
            methods: BTreeMap::new(),
            name: name.clone(),
            static_methods: BTreeMap::new(),
            superclass: node
                .child_by_field_name("superclass")
                .and_then(first_named)
                .map(|t| return self.type_signature(t).to_string()),
            type_parameters: self.type_parameters(node),
        };
        for child in named_children(node) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                for list in named_children(child) {
                    for interface in named_children(list) {
                        decl.interfaces.push(self.type_signature(interface).to_string());
                    }
                }
            }
        }

        let Some(body) = node.child_by_field_name("body") else {
            decls.push(decl);
            return;
        };
        let scope = body.byte_range();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            // Record components are fields with same-named accessors.
            for component in named_children(parameters) {
                if let Some((field, sig)) = self.parameter(component) {
                    decl.methods.insert(field.clone(), sig.to_string());
                    decl.fields.insert(field.clone(), sig.to_string());
                    self.declare(DeclarationKind::Field { is_static: false }, field, scope.clone(), sig);
                }
            }
        }
        for member in body_members(body) {
            match member.kind() {
                "field_declaration" | "constant_declaration" => {
                    let is_static = kind == DeclKind::Interface || has_modifier(member, "static");
                    let Some(ty) = member.child_by_field_name("type") else {
                        continue;
                    };
                    let base = self.type_signature(ty);
                    for declarator in field_children(member, "declarator") {
                        let Some(field) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        let sig = with_dimensions(base.clone(), declarator.child_by_field_name("dimensions"), self.text);
                        decl.fields.insert(self.text(field).to_string(), sig.to_string());
                        self.declare(DeclarationKind::Field { is_static }, self.text(field).to_string(), scope.clone(), sig);
                    }
                },
                "enum_constant" => {
                    if let Some(constant) = member.child_by_field_name("name") {
                        decl.fields.insert(self.text(constant).to_string(), name.clone());
                        let sig = TypeSignature::class(&name);
                        self.declare(DeclarationKind::Field { is_static: true }, self.text(constant).to_string(), scope.clone(), sig);
                    }
                },
                "method_declaration" => {
                    let (Some(method), Some(ty)) = (member.child_by_field_name("name"), member.child_by_field_name("type")) else {
                        continue;
                    };
                    let return_type = with_dimensions(self.type_signature(ty), member.child_by_field_name("dimensions"), self.text);
                    let type_parameters = self.type_parameters(member);
                    let rendered = if type_parameters.is_empty() {
                        return_type.to_string()
                    } else {
                        format!("<{}> {return_type}", type_parameters.join(", "))
                    };
                    let table = if has_modifier(member, "static") { &mut decl.static_methods } else { &mut decl.methods };
                    table.insert(self.text(method).to_string(), rendered);
                },
                kind if is_type_declaration(kind) => self.collect_type(member, decls),
                _ => {},
            }
        }
        decls.push(decl);
    }

    /// Declare parameters, locals, loop variables, and resources in document order.
    fn collect_locals(&mut self, node: Node<'_>) {
        match node.kind() {
            "method_declaration" | "constructor_declaration" => {
                if let Some(parameters) = node.child_by_field_name("parameters") {
                    for parameter in named_children(parameters) {
                        if let Some((name, sig)) = self.parameter(parameter) {
                            self.declare(DeclarationKind::Parameter, name, node.byte_range(), sig);
                        }
                    }
                }
            },
            "lambda_expression" => self.declare_lambda_parameters(node),
            "catch_clause" => {
                for parameter in named_children(node).into_iter().filter(|c| return c.kind() == "catch_formal_parameter") {
                    let Some(name) = parameter.child_by_field_name("name") else {
                        continue;
                    };
                    let sig = named_children(parameter)
                        .into_iter()
                        .find(|c| return c.kind() == "catch_type")
                        .and_then(first_named)
                        .map_or_else(|| return TypeSignature::class("java.lang.Throwable"), |t| return self.type_signature(t));
                    self.declare(DeclarationKind::Parameter, self.text(name).to_string(), node.byte_range(), sig);
                }
            },
            "local_variable_declaration" => {
                let scope_end = node.parent().map_or(node.end_byte(), |p| return p.end_byte());
                let ty = node.child_by_field_name("type");
                for declarator in field_children(node, "declarator") {
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let sig = match ty {
                        Some(t) if self.text(t) == "var" => declarator
                            .child_by_field_name("value")
                            .and_then(|v| return self.expression_type(v))
                            .unwrap_or_else(TypeSignature::root),
                        Some(t) => with_dimensions(self.type_signature(t), declarator.child_by_field_name("dimensions"), self.text),
                        None => TypeSignature::root(),
                    };
                    self.declare(DeclarationKind::Local, self.text(name).to_string(), node.start_byte()..scope_end, sig);
                }
            },
            "enhanced_for_statement" => {
                if let (Some(ty), Some(name)) = (node.child_by_field_name("type"), node.child_by_field_name("name")) {
                    let sig = if self.text(ty) == "var" {
                        node.child_by_field_name("value")
                            .and_then(|v| return self.expression_type(v))
                            .map_or_else(TypeSignature::root, |iterable| return self.iteration_element(&iterable))
                    } else {
                        self.type_signature(ty)
                    };
                    self.declare(DeclarationKind::Local, self.text(name).to_string(), node.byte_range(), sig);
                }
            },
            "resource" => {
                let scope = node.parent().and_then(|spec| return spec.parent()).unwrap_or(node).byte_range();
                if let (Some(ty), Some(name)) = (node.child_by_field_name("type"), node.child_by_field_name("name")) {
                    let sig = if self.text(ty) == "var" {
                        node.child_by_field_name("value")
                            .and_then(|v| return self.expression_type(v))
                            .unwrap_or_else(TypeSignature::root)
                    } else {
                        self.type_signature(ty)
                    };
                    self.declare(DeclarationKind::Local, self.text(name).to_string(), scope, sig);
                }
            },
            _ => {},
        }
        for child in named_children(node) {
            self.collect_locals(child);
        }
    }

    fn declare_lambda_parameters(&mut self, lambda: Node<'_>) {
        let Some(parameters) = lambda.child_by_field_name("parameters") else {
            return;
        };
        let scope = lambda.byte_range();
        match parameters.kind() {
            "identifier" => {
                self.declare(DeclarationKind::Parameter, self.text(parameters).to_string(), scope, TypeSignature::root());
            },
            "inferred_parameters" => {
                for name in named_children(parameters) {
                    self.declare(DeclarationKind::Parameter, self.text(name).to_string(), scope.clone(), TypeSignature::root());
                }
            },
            _ => {
                for parameter in named_children(parameters) {
                    if let Some((name, sig)) = self.parameter(parameter) {
                        self.declare(DeclarationKind::Parameter, name, scope.clone(), sig);
                    }
                }
            },
        }
    }

    /// Name and type of a formal or spread parameter.
    fn parameter(&self, node: Node<'_>) -> Option<(String, TypeSignature)> {
        return match node.kind() {
            "formal_parameter" => {
                let name = node.child_by_field_name("name")?;
                let ty = node.child_by_field_name("type")?;
                let sig = with_dimensions(self.type_signature(ty), node.child_by_field_name("dimensions"), self.text);
                Some((self.text(name).to_string(), sig))
            },
            "spread_parameter" => {
                let children = named_children(node);
                let ty = children.iter().find(|c| return c.kind() != "modifiers")?;
                let declarator = children.iter().find(|c| return c.kind() == "variable_declarator")?;
                let name = declarator.child_by_field_name("name")?;
                Some((self.text(name).to_string(), TypeSignature::Array(Box::new(self.type_signature(*ty)))))
            },
            _ => None,
        };
    }

    fn declare(&mut self, kind: DeclarationKind, name: String, scope: Range<usize>, signature: TypeSignature) {
        self.declarations.declare(Declaration { kind, name, scope, signature });
    }

    fn type_parameters(&self, node: Node<'_>) -> Vec<String> {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        return named_children(list)
            .into_iter()
            .filter(|p| return p.kind() == "type_parameter")
            .filter_map(|p| {
                return named_children(p)
                    .into_iter()
                    .find(|c| return matches!(c.kind(), "type_identifier" | "identifier"))
                    .map(|c| return self.text(c).to_string());
            })
            .collect();
    }

    fn type_scope_name(&self, node: Node<'_>) -> Option<String> {
        return self.types.iter().find(|t| return t.range == node.byte_range()).map(|t| return t.name.clone());
    }

    // ── Name resolution ────────────────────────────────────────────────

    /// Qualified name of a type name as seen from this file, if it is known.
    fn known_type(&self, name: &str) -> Option<String> {
        if let Some((head, rest)) = name.split_once('.') {
            if self.catalog.contains(name) || self.is_declared(name) {
                return Some(name.to_string());
            }
            let outer = self.known_type(head)?;
            let nested = format!("{outer}.{rest}");
            return (self.catalog.contains(&nested) || self.is_declared(&nested)).then_some(nested);
        }
        if let Some((_, qualified)) = self.unit.declared_types.iter().find(|(simple, _)| return simple == name) {
            return Some(qualified.clone());
        }
        if let Some(import) = self.unit.single_imports.iter().find(|i| return signature::simple_name(i) == name) {
            return Some(import.clone());
        }
        let implicit = std::iter::once(IMPLICIT_PACKAGE)
            .chain(self.unit.package.as_deref())
            .chain(self.unit.on_demand_imports.iter().map(String::as_str));
        for package in implicit {
            let candidate = format!("{package}.{name}");
            if self.catalog.contains(&candidate) {
                return Some(candidate);
            }
        }
        let candidates = self.catalog.candidates(name);
        return match candidates.as_slice() {
            [only] => Some((*only).to_string()),
            _ => None,
        };
    }

    fn resolve_type_name(&self, name: &str) -> String {
        return self.known_type(name).unwrap_or_else(|| return name.to_string());
    }

    fn is_declared(&self, qualified: &str) -> bool {
        return self.unit.declared_types.iter().any(|(_, q)| return q == qualified);
    }

    /// Types declared in the file that enclose `offset`, innermost first.
    fn enclosing_types(&self, offset: usize) -> Vec<&str> {
        let mut found: Vec<&TypeScope> = self.types.iter().filter(|t| return t.range.contains(&offset)).collect();
        found.sort_by_key(|t| return std::cmp::Reverse(t.range.start));
        return found.into_iter().map(|t| return t.name.as_str()).collect();
    }

    fn this_type(&self, offset: usize) -> Option<TypeSignature> {
        return self.enclosing_types(offset).first().map(|name| return TypeSignature::class(name));
    }

    fn super_type(&self, offset: usize) -> Option<TypeSignature> {
        let this = self.this_type(offset)?;
        return self.catalog.supertypes(&this).0;
    }

    /// Resolve a bare identifier used as an expression or qualifier.
    fn name_reference(&self, name: &str, offset: usize) -> Reference {
        if let Some(declaration) = self.declarations.lookup(name, offset) {
            return Reference::Value(declaration.signature.clone());
        }
        for owner in self.enclosing_types(offset) {
            if let Some(field) = self.catalog.field_type(&TypeSignature::class(owner), name) {
                return Reference::Value(field);
            }
        }
        if let Some(qualified) = self.known_type(name) {
            return Reference::Type(TypeSignature::class(&qualified));
        }
        return Reference::Package(name.to_string());
    }

    /// Resolve a receiver expression.
    fn reference(&self, node: Node<'_>) -> Reference {
        return match node.kind() {
            "identifier" => self.name_reference(self.text(node), node.start_byte()),
            "field_access" => {
                let (Some(object), Some(field)) = (node.child_by_field_name("object"), node.child_by_field_name("field")) else {
                    return Reference::Unknown;
                };
                let field = self.text(field);
                match self.reference(object) {
                    Reference::Package(package) => {
                        let qualified = format!("{package}.{field}");
                        if self.catalog.contains(&qualified) || self.is_declared(&qualified) {
                            Reference::Type(TypeSignature::class(&qualified))
                        } else {
                            Reference::Package(qualified)
                        }
                    },
                    Reference::Type(owner) => {
                        let nested = format!("{}.{field}", owner.erasure());
                        if self.catalog.contains(&nested) {
                            Reference::Type(TypeSignature::class(&nested))
                        } else {
                            self.catalog.field_type(&owner, field).map_or(Reference::Unknown, Reference::Value)
                        }
                    },
                    Reference::Unknown => Reference::Unknown,
                    Reference::Value(owner) => self.catalog.field_type(&owner, field).map_or(Reference::Unknown, Reference::Value),
                }
            },
            "super" => self.super_type(node.start_byte()).map_or(Reference::Unknown, Reference::Value),
            _ => self.expression_type(node).map_or(Reference::Unknown, Reference::Value),
        };
    }

    // ── Typing ─────────────────────────────────────────────────────────

    /// Signature of a written type.
    fn type_signature(&self, node: Node<'_>) -> TypeSignature {
        return match node.kind() {
            "type_identifier" | "scoped_type_identifier" => {
                TypeSignature::class(&self.resolve_type_name(&compact(self.text(node))))
            },
            "generic_type" => {
                let children = named_children(node);
                let name = children
                    .iter()
                    .find(|c| return matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                    .map_or_else(|| return ROOT_TYPE.to_string(), |b| return self.resolve_type_name(&compact(self.text(*b))));
                let arguments = children
                    .iter()
                    .filter(|c| return c.kind() == "type_arguments")
                    .flat_map(|a| return named_children(*a))
                    .map(|a| return self.type_signature(a))
                    .collect();
                TypeSignature::Class { arguments, name }
            },
            "array_type" => {
                let element = node.child_by_field_name("element").map_or_else(TypeSignature::root, |e| return self.type_signature(e));
                with_dimensions(element, node.child_by_field_name("dimensions"), self.text)
            },
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => {
                TypeSignature::Primitive(compact(self.text(node)))
            },
            "wildcard" => {
                let upper = !all_children(node).iter().any(|c| return c.kind() == "super");
                let bound = named_children(node)
                    .into_iter()
                    .rfind(|c| return !matches!(c.kind(), "super" | "annotation" | "marker_annotation"))
                    .map(|b| return Box::new(self.type_signature(b)));
                TypeSignature::Wildcard { bound, upper }
            },
            "annotated_type" => named_children(node).last().map_or_else(TypeSignature::root, |t| return self.type_signature(*t)),
            _ => TypeSignature::root(),
        };
    }

    /// Static type of an expression, if the binder can tell.
    fn expression_type(&self, node: Node<'_>) -> Option<TypeSignature> {
        return match node.kind() {
            "identifier" | "field_access" => match self.reference(node) {
                Reference::Value(sig) => Some(sig),
                _ => None,
            },
            "method_invocation" => self.invocation_type(node),
            "object_creation_expression" | "cast_expression" => node.child_by_field_name("type").map(|t| return self.type_signature(t)),
            "array_creation_expression" => {
                let element = self.type_signature(node.child_by_field_name("type")?);
                let mut sig = element;
                for child in named_children(node) {
                    let depth = match child.kind() {
                        "dimensions_expr" => 1,
                        "dimensions" => self.text(child).matches('[').count(),
                        _ => 0,
                    };
                    for _ in 0..depth {
                        sig = TypeSignature::Array(Box::new(sig));
                    }
                }
                Some(sig)
            },
            "array_access" => self.expression_type(node.child_by_field_name("array")?)?.element().cloned(),
            "assignment_expression" => self.expression_type(node.child_by_field_name("left")?),
            "binary_expression" => self.infix_type(node),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| return o.kind());
                if operator == Some("!") {
                    return Some(primitive("boolean"));
                }
                let operand = self.expression_type(node.child_by_field_name("operand")?)?;
                Some(numeric_rank(&operand).map_or(operand, |rank| return primitive(promote(rank, 0))))
            },
            "update_expression" | "parenthesized_expression" => self.expression_type(first_named(node)?),
            "instanceof_expression" | "true" | "false" => Some(primitive("boolean")),
            "ternary_expression" => node
                .child_by_field_name("consequence")
                .and_then(|c| return self.expression_type(c))
                .or_else(|| return self.expression_type(node.child_by_field_name("alternative")?)),
            "string_literal" | "text_block" => Some(TypeSignature::class("java.lang.String")),
            "character_literal" => Some(primitive("char")),
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal" | "binary_integer_literal" => {
                Some(primitive(if self.text(node).ends_with(['l', 'L']) { "long" } else { "int" }))
            },
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                Some(primitive(if self.text(node).ends_with(['f', 'F']) { "float" } else { "double" }))
            },
            "class_literal" => {
                let target = first_named(node).map_or_else(TypeSignature::root, |t| return self.type_signature(t));
                Some(TypeSignature::Class { arguments: vec![boxed(target)], name: "java.lang.Class".to_string() })
            },
            "this" => self.this_type(node.start_byte()),
            _ => None,
        };
    }

    /// Return type of a method invocation.
    fn invocation_type(&self, node: Node<'_>) -> Option<TypeSignature> {
        let method = self.text(node.child_by_field_name("name")?);
        let Some(object) = node.child_by_field_name("object") else {
            return self.enclosing_types(node.start_byte()).into_iter().find_map(|owner| {
                return self
                    .catalog
                    .method_type(&TypeSignature::class(owner), method)
                    .or_else(|| return self.catalog.static_method_type(owner, method));
            });
        };
        return match self.reference(object) {
            Reference::Type(owner) => self
                .catalog
                .static_method_type(&owner.erasure(), method)
                .or_else(|| return self.catalog.method_type(&owner, method)),
            Reference::Value(receiver) => self.catalog.method_type(&receiver, method),
            Reference::Package(_) | Reference::Unknown => None,
        };
    }

    /// Result type of a binary expression.
    fn infix_type(&self, node: Node<'_>) -> Option<TypeSignature> {
        let operator = node.child_by_field_name("operator")?.kind();
        if matches!(operator, "<" | ">" | "<=" | ">=" | "==" | "!=" | "&&" | "||") {
            return Some(primitive("boolean"));
        }
        let left = node.child_by_field_name("left").and_then(|l| return self.expression_type(l));
        let right = node.child_by_field_name("right").and_then(|r| return self.expression_type(r));
        let is_string = |sig: &Option<TypeSignature>| return sig.as_ref().is_some_and(|s| return s.erasure() == "java.lang.String");
        if operator == "+" && (is_string(&left) || is_string(&right)) {
            return Some(TypeSignature::class("java.lang.String"));
        }
        let is_boolean = |sig: &Option<TypeSignature>| {
            return sig.as_ref().is_some_and(|s| return matches!(s.erasure().as_str(), "boolean" | "java.lang.Boolean"));
        };
        if matches!(operator, "&" | "|" | "^") && is_boolean(&left) && is_boolean(&right) {
            return Some(primitive("boolean"));
        }
        let left_rank = numeric_rank(left.as_ref()?)?;
        if matches!(operator, "<<" | ">>" | ">>>") {
            return Some(primitive(promote(left_rank, 0)));
        }
        let right_rank = numeric_rank(right.as_ref()?)?;
        return Some(primitive(promote(left_rank, right_rank)));
    }

    /// Element type produced by iterating over `iterable`.
    fn iteration_element(&self, iterable: &TypeSignature) -> TypeSignature {
        if let Some(element) = iterable.element() {
            return element.clone();
        }
        return match self.catalog.method_type(iterable, "iterator") {
            Some(TypeSignature::Class { arguments, .. }) => arguments.into_iter().next().unwrap_or_else(TypeSignature::root),
            _ => TypeSignature::root(),
        };
    }

    // ── Lowering ───────────────────────────────────────────────────────

    fn lower(&self, node: Node<'_>, parent: NodeId, inside_error: bool, tree: &mut SyntaxTree) {
        let kind = self.classify(node);
        let id = tree.push(kind, node.byte_range(), parent);
        tree[id].recovered =
            inside_error || node.is_error() || node.is_missing() || all_children(node).iter().any(|c| return c.is_missing());

        match node.kind() {
            "identifier" => {
                let symbol = self.identifier_symbol(node);
                if let Some(Symbol::Variable(sig)) = &symbol {
                    tree[id].expression_type = Some(sig.clone());
                }
                tree[id].symbol = symbol;
            },
            "field_access" => match self.reference(node) {
                Reference::Type(sig) => tree[id].symbol = Some(Symbol::Type(sig)),
                Reference::Value(sig) => {
                    tree[id].expression_type = Some(sig.clone());
                    tree[id].symbol = Some(Symbol::Variable(sig));
                },
                Reference::Package(_) | Reference::Unknown => {},
            },
            "type_identifier" => {
                let name = tree.push(NodeKind::SimpleName, node.byte_range(), id);
                tree[name].recovered = tree[id].recovered;
                tree[name].symbol = Some(Symbol::Type(self.type_signature(node)));
                return;
            },
            _ => tree[id].expression_type = self.expression_type(node),
        }

        let inside = inside_error || node.is_error();
        for child in named_children(node) {
            self.lower(child, id, inside, tree);
        }
    }

    fn classify(&self, node: Node<'_>) -> NodeKind {
        let receiver_is_super = || {
            return node.child_by_field_name("object").is_some_and(|o| return o.kind() == "super");
        };
        return match node.kind() {
            "array_creation_expression" => NodeKind::ArrayCreation,
            "array_access" => NodeKind::ArrayAccess,
            "assignment_expression" => NodeKind::Assignment,
            "binary_expression" => NodeKind::Infix,
            "block" | "constructor_body" => NodeKind::Block,
            "block_comment" if is_javadoc(self.text(node)) => NodeKind::Javadoc,
            "block_comment" | "line_comment" => NodeKind::Comment,
            "cast_expression" => NodeKind::Cast,
            "character_literal" => NodeKind::CharacterLiteral,
            "class_literal" => NodeKind::TypeLiteral,
            "expression_statement" => NodeKind::ExpressionStatement,
            "field_access" if receiver_is_super() => NodeKind::SuperFieldAccess,
            "field_access" if is_name_chain(node) => NodeKind::QualifiedName,
            "field_access" => NodeKind::FieldAccess,
            "field_declaration" | "constant_declaration" => NodeKind::FieldDeclaration { modifiers: modifiers(node) },
            "identifier" => NodeKind::SimpleName,
            "import_declaration" => NodeKind::ImportDeclaration,
            "local_variable_declaration" => NodeKind::VariableDeclaration,
            "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
                NodeKind::MethodDeclaration { is_static: has_modifier(node, "static") }
            },
            "method_invocation" if receiver_is_super() => NodeKind::SuperMethodInvocation,
            "method_invocation" => NodeKind::MethodInvocation,
            "null_literal" => NodeKind::NullLiteral,
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "hex_floating_point_literal" => NodeKind::NumberLiteral,
            "object_creation_expression" => NodeKind::ClassInstanceCreation,
            "package_declaration" => NodeKind::PackageDeclaration,
            "parenthesized_expression" => NodeKind::Parenthesized,
            "scoped_identifier" => NodeKind::QualifiedName,
            "string_literal" | "text_block" => NodeKind::StringLiteral,
            "true" | "false" => NodeKind::BooleanLiteral,
            "type_identifier" => NodeKind::SimpleType,
            kind if is_type_declaration(kind) => NodeKind::TypeDeclaration {
                body_start: node.child_by_field_name("body").map_or(node.end_byte(), |b| return b.start_byte().saturating_add(1)),
            },
            _ => NodeKind::Other,
        };
    }

    /// Symbol for an identifier, depending on the role it plays in its parent.
    fn identifier_symbol(&self, node: Node<'_>) -> Option<Symbol> {
        let parent = node.parent()?;
        let is_field = |field: &str| return parent.child_by_field_name(field) == Some(node);
        return match parent.kind() {
            "method_invocation" if is_field("name") => Some(Symbol::Method { return_type: self.invocation_type(parent) }),
            "method_declaration" if is_field("name") => Some(Symbol::Method {
                return_type: parent.child_by_field_name("type").map(|t| return self.type_signature(t)),
            }),
            "constructor_declaration" if is_field("name") => Some(Symbol::Type(TypeSignature::class(&self.resolve_type_name(self.text(node))))),
            kind if is_type_declaration(kind) && is_field("name") => {
                self.type_scope_name(parent).map(|name| return Symbol::Type(TypeSignature::class(&name)))
            },
            "field_access" if is_field("field") => match self.reference(parent) {
                Reference::Type(sig) => Some(Symbol::Type(sig)),
                Reference::Value(sig) => Some(Symbol::Variable(sig)),
                Reference::Package(_) | Reference::Unknown => None,
            },
            "scoped_identifier" | "package_declaration" | "import_declaration" | "labeled_statement" | "break_statement"
            | "continue_statement" => None,
            _ => match self.name_reference(self.text(node), node.start_byte()) {
                Reference::Type(sig) => Some(Symbol::Type(sig)),
                Reference::Value(sig) => Some(Symbol::Variable(sig)),
                Reference::Package(_) | Reference::Unknown => None,
            },
        };
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    return node.named_children(&mut cursor).collect();
}

fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    return node.children(&mut cursor).collect();
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    return node.children_by_field_name(field, &mut cursor).collect();
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    return named_children(node).into_iter().next();
}

/// Members of a type body, flattening enum body declarations.
fn body_members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    return members;
}

fn is_type_declaration(kind: &str) -> bool {
    return matches!(
        kind,
        "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration" | "annotation_type_declaration"
    );
}

fn has_modifier(node: Node<'_>, modifier: &str) -> bool {
    return named_children(node)
        .into_iter()
        .filter(|c| return c.kind() == "modifiers")
        .any(|m| return all_children(m).iter().any(|c| return c.kind() == modifier));
}

fn modifiers(node: Node<'_>) -> Modifiers {
    return named_children(node)
        .into_iter()
        .filter(|c| return c.kind() == "modifiers")
        .flat_map(all_children)
        .filter_map(|c| return Modifiers::from_keyword(c.kind()))
        .fold(Modifiers::default(), Modifiers::with);
}

/// A field access whose receiver chain consists only of identifiers.
fn is_name_chain(node: Node<'_>) -> bool {
    return match node.kind() {
        "identifier" => true,
        "field_access" => node.child_by_field_name("object").is_some_and(is_name_chain),
        _ => false,
    };
}

fn is_javadoc(text: &str) -> bool {
    return text.starts_with("/**") && text != "/**/";
}

fn is_identifier_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_' || c == '$';
}

/// Drop all whitespace from a name or type written across tokens.
fn compact(text: &str) -> String {
    return text.chars().filter(|c| return !c.is_whitespace()).collect();
}

fn with_dimensions(sig: TypeSignature, dimensions: Option<Node<'_>>, text: &str) -> TypeSignature {
    let depth = dimensions.and_then(|d| return text.get(d.byte_range())).map_or(0, |d| return d.matches('[').count());
    let mut sig = sig;
    for _ in 0..depth {
        sig = TypeSignature::Array(Box::new(sig));
    }
    return sig;
}

fn primitive(name: &str) -> TypeSignature {
    return TypeSignature::Primitive(name.to_string());
}

/// Box a primitive for use as a type argument.
fn boxed(sig: TypeSignature) -> TypeSignature {
    let TypeSignature::Primitive(name) = &sig else {
        return sig;
    };
    let wrapper = match name.as_str() {
        "boolean" => "java.lang.Boolean",
        "byte" => "java.lang.Byte",
        "char" => "java.lang.Character",
        "double" => "java.lang.Double",
        "float" => "java.lang.Float",
        "int" => "java.lang.Integer",
        "long" => "java.lang.Long",
        "short" => "java.lang.Short",
        _ => "java.lang.Void",
    };
    return TypeSignature::class(wrapper);
}

/// Rank in the numeric promotion order, unboxing wrappers.
fn numeric_rank(sig: &TypeSignature) -> Option<u8> {
    return match sig.erasure().as_str() {
        "byte" | "java.lang.Byte" | "short" | "java.lang.Short" | "char" | "java.lang.Character" | "int"
        | "java.lang.Integer" => Some(0),
        "long" | "java.lang.Long" => Some(1),
        "float" | "java.lang.Float" => Some(2),
        "double" | "java.lang.Double" => Some(3),
        _ => None,
    };
}

/// Binary numeric promotion.
const fn promote(left: u8, right: u8) -> &'static str {
    let rank = if left > right { left } else { right };
    return match rank {
        0 => "int",
        1 => "long",
        2 => "float",
        _ => "double",
    };
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn analyze_source(source: &str) -> Analysis {
        let catalog = TypeCatalog::builtin().unwrap();
        return analyze(&PathBuf::from("A.java"), source, None, &catalog).unwrap();
    }

    /// The deepest node starting at the first occurrence of `needle`.
    fn node_at(tree: &SyntaxTree, source: &str, needle: &str) -> NodeId {
        return tree.covering(source.find(needle).unwrap());
    }

    #[test]
    fn finds_trigger_with_prefix() {
        let source = "a.fo";
        let trigger = find_trigger(source, 4).unwrap();
        assert_eq!(trigger, Trigger { cursor: 4, dot: 1, prefix: "fo".to_string() });
    }

    #[test]
    fn finds_trigger_without_prefix() {
        let trigger = find_trigger("xs.", 3).unwrap();
        assert_eq!(trigger.dot, 2);
        assert!(trigger.prefix.is_empty());
    }

    #[test]
    fn no_trigger_without_dot() {
        assert!(find_trigger("int a", 5).is_none());
        assert!(find_trigger("a.b", 99).is_none());
    }

    #[test]
    fn blanking_preserves_offsets() {
        let source = "x.var + y";
        let trigger = find_trigger(source, 5).unwrap();
        let blanked = blank_trigger(source, &trigger);
        assert_eq!(blanked, "x;    + y");
        assert_eq!(blanked.len(), source.len());
    }

    #[test]
    fn collects_package_and_imports() {
        let source = "package p;\nimport java.util.List;\nimport java.io.*;\nimport static java.lang.Math.max;\nclass A {}\n";
        let analysis = analyze_source(source);
        let unit = &analysis.tree.unit;
        assert_eq!(unit.package.as_deref(), Some("p"));
        assert_eq!(unit.single_imports, vec!["java.util.List".to_string()]);
        assert_eq!(unit.on_demand_imports, vec!["java.io".to_string()]);
        assert_eq!(unit.import_offset, source.find("class").unwrap());
        assert_eq!(unit.declared_types, vec![("A".to_string(), "p.A".to_string())]);
    }

    #[test]
    fn import_point_follows_package_without_imports() {
        let source = "package p;\n\nclass A {}\n";
        let unit = analyze_source(source).tree.unit;
        assert_eq!(unit.import_offset, 11);
        assert_eq!(unit.import_separator, "\n");
    }

    #[test]
    fn binds_generic_locals() {
        let source = "import java.util.List;\nclass A {\n  void m() {\n    List<Integer> xs = null;\n    xs.size();\n  }\n}\n";
        let analysis = analyze_source(source);
        let decl = analysis.tree.declarations.lookup("xs", source.find("xs.size").unwrap()).unwrap();
        assert_eq!(decl.signature.to_string(), "java.util.List<java.lang.Integer>");

        let tree = &analysis.tree;
        let name = node_at(tree, source, "xs.size");
        assert_eq!(tree[name].kind, NodeKind::SimpleName);
        let call = tree.parent(name).unwrap();
        assert_eq!(tree[call].kind, NodeKind::MethodInvocation);
        assert_eq!(tree[call].expression_type, Some(TypeSignature::Primitive("int".to_string())));
    }

    #[test]
    fn types_static_calls_through_catalog() {
        let source = "import java.util.Collections;\nclass A {\n  void m() {\n    Collections.emptyList();\n  }\n}\n";
        let analysis = analyze_source(source);
        let tree = &analysis.tree;
        let receiver = node_at(tree, source, "Collections.emptyList");
        assert!(matches!(tree[receiver].symbol, Some(Symbol::Type(_))));
        let call = tree.parent(receiver).unwrap();
        assert_eq!(tree[call].expression_type.as_ref().unwrap().to_string(), "java.util.List<java.lang.Object>");
    }

    #[test]
    fn infers_var_and_infix_types() {
        let source = "class A {\n  void m() {\n    var s = \"x\";\n    boolean b = 1 < 2;\n    long l = 1 + 2L;\n    String t = 1 + s;\n  }\n}\n";
        let analysis = analyze_source(source);
        let decls = &analysis.tree.declarations;
        let end = source.find("  }\n}").unwrap();
        assert_eq!(decls.lookup("s", end).unwrap().signature.to_string(), "java.lang.String");

        let tree = &analysis.tree;
        let less = tree.parent(node_at(tree, source, "1 < 2")).unwrap();
        assert_eq!(tree[less].kind, NodeKind::Infix);
        assert_eq!(tree[less].expression_type, Some(primitive("boolean")));
        let sum = tree.parent(node_at(tree, source, "1 + 2L")).unwrap();
        assert_eq!(tree[sum].expression_type, Some(primitive("long")));
        let concat = tree.parent(node_at(tree, source, "1 + s")).unwrap();
        assert_eq!(tree[concat].expression_type.as_ref().unwrap().to_string(), "java.lang.String");
    }

    #[test]
    fn lowers_names_and_field_access() {
        let source = "class A {\n  int[] values;\n  void m() {\n    this.values.clone();\n    System.out.flush();\n  }\n}\n";
        let analysis = analyze_source(source);
        let tree = &analysis.tree;
        let this = node_at(tree, source, "this.values");
        let access = tree.parent(this).unwrap();
        assert_eq!(tree[access].kind, NodeKind::FieldAccess);
        assert_eq!(tree[access].expression_type.as_ref().unwrap().to_string(), "int[]");

        let system = node_at(tree, source, "System.out");
        let out = tree.parent(system).unwrap();
        assert_eq!(tree[out].kind, NodeKind::QualifiedName);
        assert_eq!(tree[out].symbol, Some(Symbol::Variable(TypeSignature::class("java.io.PrintStream"))));
    }

    #[test]
    fn type_identifiers_wrap_simple_names() {
        let source = "class A {\n  void m() {\n    new Object();\n  }\n}\n";
        let analysis = analyze_source(source);
        let tree = &analysis.tree;
        let name = node_at(tree, source, "Object()");
        assert_eq!(tree[name].kind, NodeKind::SimpleName);
        let ty = tree.parent(name).unwrap();
        assert_eq!(tree[ty].kind, NodeKind::SimpleType);
        assert_eq!(tree[tree.parent(ty).unwrap()].kind, NodeKind::ClassInstanceCreation);
    }

    #[test]
    fn file_types_join_the_catalog() {
        let source = "package p;\nclass Boom extends RuntimeException {}\n";
        let analysis = analyze_source(source);
        let (superclass, _) = analysis.catalog.supertypes(&TypeSignature::class("p.Boom"));
        assert_eq!(superclass, Some(TypeSignature::class("java.lang.RuntimeException")));
    }

    #[test]
    fn javadoc_is_distinguished_from_comments() {
        let source = "/** Doc. */\nclass A {\n  // note\n}\n";
        let analysis = analyze_source(source);
        let tree = &analysis.tree;
        assert_eq!(tree[tree.covering(1)].kind, NodeKind::Javadoc);
        assert_eq!(tree[node_at(tree, source, "// note")].kind, NodeKind::Comment);
    }
}
