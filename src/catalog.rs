//! Known type declarations: the embedded JDK subset plus whatever the
//! project configuration or the analyzed file contributes.
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use crate::error::Error;
use crate::signature::{self, ROOT_TYPE, TypeSignature};
use crate::types::{BindingKind, SymbolBinding};

/// Embedded catalog covering the commonly used JDK types.
const BUILTIN_CATALOG: &str = include_str!("jdk.toml");

/// Upper bound on supertype hops during member lookup.
const MAX_MEMBER_DEPTH: usize = 32;

/// Class or interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// A class (default).
    #[default]
    Class,
    /// An interface; has no implicit superclass.
    Interface,
}

/// One type declaration as written in TOML. Member signatures may mention the
/// declaration's type parameters; method signatures may open with their own
/// type parameter list, e.g. `<T> java.util.List<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    /// Field name to field type.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Implemented (or, for interfaces, extended) interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Class or interface.
    #[serde(default)]
    pub kind: DeclKind,
    /// Instance method name to return type.
    #[serde(default)]
    pub methods: BTreeMap<String, String>,
    /// Fully-qualified name.
    pub name: String,
    /// Static method name to return type.
    #[serde(default)]
    pub static_methods: BTreeMap<String, String>,
    /// Declared superclass.
    #[serde(default)]
    pub superclass: Option<String>,
    /// Type parameter names in declaration order.
    #[serde(default)]
    pub type_parameters: Vec<String>,
}

/// Top-level shape of a catalog TOML document.
#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    types: Vec<TypeDecl>,
}

/// A method's return type with the method's own type parameters.
#[derive(Debug, Clone)]
struct MethodInfo {
    return_type: TypeSignature,
    type_parameters: Vec<String>,
}

/// A declaration with every signature parsed.
#[derive(Debug, Clone)]
struct TypeInfo {
    fields: HashMap<String, TypeSignature>,
    interfaces: Vec<TypeSignature>,
    kind: DeclKind,
    methods: HashMap<String, MethodInfo>,
    static_methods: HashMap<String, MethodInfo>,
    superclass: Option<TypeSignature>,
    type_parameters: Vec<String>,
}

/// Registry of known types, keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, TypeInfo>,
}

impl TypeCatalog {
    /// The embedded JDK catalog.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` or `Error::InvalidSignature` if the embedded
    /// catalog is malformed.
    pub fn builtin() -> Result<Self, Error> {
        let mut catalog = Self::default();
        catalog.extend(parse_catalog(BUILTIN_CATALOG)?)?;
        return Ok(catalog);
    }

    /// Add (or replace) declarations.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSignature` if any signature in `decls` is malformed.
    pub fn extend(&mut self, decls: Vec<TypeDecl>) -> Result<(), Error> {
        for decl in decls {
            let info = TypeInfo {
                fields: parse_members(&decl.fields, TypeSignature::parse)?,
                interfaces: decl.interfaces.iter().map(|i| return TypeSignature::parse(i)).collect::<Result<_, _>>()?,
                kind: decl.kind,
                methods: parse_members(&decl.methods, parse_method)?,
                static_methods: parse_members(&decl.static_methods, parse_method)?,
                superclass: decl.superclass.as_deref().map(TypeSignature::parse).transpose()?,
                type_parameters: decl.type_parameters,
            };
            self.types.insert(decl.name, info);
        }
        return Ok(());
    }

    /// Whether `name` is a known qualified type name.
    pub fn contains(&self, name: &str) -> bool {
        return self.types.contains_key(name);
    }

    /// Qualified names of every known type whose simple name is `simple`, sorted.
    pub fn candidates(&self, simple: &str) -> Vec<&str> {
        let mut found: Vec<&str> = self
            .types
            .keys()
            .filter(|name| return signature::simple_name(name) == simple)
            .map(String::as_str)
            .collect();
        found.sort_unstable();
        return found;
    }

    /// Whether the named type is an interface.
    pub fn is_interface(&self, name: &str) -> bool {
        return self.types.get(name).is_some_and(|info| return info.kind == DeclKind::Interface);
    }

    /// Build an immutable binding snapshot for a signature.
    pub fn binding_for(&self, sig: &TypeSignature) -> SymbolBinding {
        let (kind, bounds) = match sig {
            TypeSignature::Array(_) => (BindingKind::Array, Vec::new()),
            TypeSignature::Capture(inner) => (BindingKind::Capture, upper_bounds(inner)),
            TypeSignature::Class { name, .. } if self.is_interface(name) => (BindingKind::Interface, Vec::new()),
            TypeSignature::Class { .. } => (BindingKind::Class, Vec::new()),
            TypeSignature::Primitive(_) => (BindingKind::Primitive, Vec::new()),
            TypeSignature::Wildcard { .. } => (BindingKind::Wildcard, upper_bounds(sig)),
        };
        let qualified_name = if kind == BindingKind::Capture { String::new() } else { sig.to_string() };
        let (superclass, interfaces) = self.supertypes(sig);
        return SymbolBinding { bounds, interfaces, kind, qualified_name, signature: sig.clone(), superclass };
    }

    /// Direct superclass and interfaces of a type, instantiated with its type arguments.
    pub fn supertypes(&self, sig: &TypeSignature) -> (Option<TypeSignature>, Vec<TypeSignature>) {
        return match sig {
            TypeSignature::Array(_) => (
                Some(TypeSignature::root()),
                vec![TypeSignature::class("java.lang.Cloneable"), TypeSignature::class("java.io.Serializable")],
            ),
            TypeSignature::Capture(inner) => {
                let bound = upper_bounds(inner).into_iter().next().unwrap_or_else(TypeSignature::root);
                (Some(bound), Vec::new())
            },
            TypeSignature::Class { arguments, name } => {
                let Some(info) = self.types.get(name) else {
                    let superclass = (name != ROOT_TYPE).then(TypeSignature::root);
                    return (superclass, Vec::new());
                };
                let bindings = instantiate(&info.type_parameters, arguments);
                let mut interfaces: Vec<TypeSignature> = Vec::new();
                for interface in &info.interfaces {
                    let bound = interface.substitute(&bindings);
                    if !interfaces.contains(&bound) {
                        interfaces.push(bound);
                    }
                }
                let superclass = match (&info.superclass, info.kind) {
                    (Some(declared), _) => Some(declared.substitute(&bindings)),
                    (None, DeclKind::Class) if name != ROOT_TYPE => Some(TypeSignature::root()),
                    (None, _) => None,
                };
                (superclass, interfaces)
            },
            TypeSignature::Primitive(_) => (None, Vec::new()),
            TypeSignature::Wildcard { bound: Some(bound), upper: true } => (Some((**bound).clone()), Vec::new()),
            TypeSignature::Wildcard { .. } => (Some(TypeSignature::root()), Vec::new()),
        };
    }

    /// Return type of instance method `method` on `receiver`, walking supertypes.
    pub fn method_type(&self, receiver: &TypeSignature, method: &str) -> Option<TypeSignature> {
        return self.lookup_member(receiver, 0, &mut HashSet::new(), &|info, bindings| {
            return info.methods.get(method).map(|m| return instantiate_method(m, bindings));
        });
    }

    /// Return type of static method `method` declared on (or inherited by) `type_name`.
    pub fn static_method_type(&self, type_name: &str, method: &str) -> Option<TypeSignature> {
        return self.lookup_member(&TypeSignature::class(type_name), 0, &mut HashSet::new(), &|info, bindings| {
            return info.static_methods.get(method).map(|m| return instantiate_method(m, bindings));
        });
    }

    /// Type of field `field` on `receiver`. Arrays expose `length`.
    pub fn field_type(&self, receiver: &TypeSignature, field: &str) -> Option<TypeSignature> {
        if receiver.element().is_some() {
            return (field == "length").then(|| return TypeSignature::Primitive("int".to_string()));
        }
        return self.lookup_member(receiver, 0, &mut HashSet::new(), &|info, bindings| {
            return info.fields.get(field).map(|f| return erase_unbound(&f.substitute(bindings), &info.type_parameters));
        });
    }

    /// Find a member on `receiver` or the first supertype declaring it.
    /// Each erased type is searched once.
    fn lookup_member(
        &self,
        receiver: &TypeSignature,
        depth: usize,
        visited: &mut HashSet<String>,
        find: &dyn Fn(&TypeInfo, &HashMap<String, TypeSignature>) -> Option<TypeSignature>,
    ) -> Option<TypeSignature> {
        if depth > MAX_MEMBER_DEPTH || !visited.insert(receiver.erasure()) {
            return None;
        }
        let (superclass, interfaces) = self.supertypes(receiver);
        if let TypeSignature::Class { arguments, name } = receiver
            && let Some(info) = self.types.get(name)
        {
            let bindings = instantiate(&info.type_parameters, arguments);
            if let Some(found) = find(info, &bindings) {
                return Some(found);
            }
        }
        let next = depth.saturating_add(1);
        for parent in superclass.iter().chain(interfaces.iter()) {
            if let Some(found) = self.lookup_member(parent, next, visited, find) {
                return Some(found);
            }
        }
        // Interfaces still expose the root type's members.
        if depth == 0 && superclass.is_none() {
            return self.lookup_member(&TypeSignature::root(), next, visited, find);
        }
        return None;
    }
}

/// Parse catalog TOML text into declarations.
///
/// # Errors
///
/// Returns `Error::TomlDe` if the text is not a valid catalog document.
pub fn parse_catalog(text: &str) -> Result<Vec<TypeDecl>, Error> {
    let file: CatalogFile = toml::from_str(text)?;
    return Ok(file.types);
}

/// Parse every value of a member table.
fn parse_members<T>(
    members: &BTreeMap<String, String>,
    parse: fn(&str) -> Result<T, Error>,
) -> Result<HashMap<String, T>, Error> {
    return members.iter().map(|(name, sig)| return Ok((name.clone(), parse(sig)?))).collect();
}

/// Parse a method signature with an optional leading `<T, U>` list.
fn parse_method(text: &str) -> Result<MethodInfo, Error> {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix('<') else {
        return Ok(MethodInfo { return_type: TypeSignature::parse(trimmed)?, type_parameters: Vec::new() });
    };
    let Some((params, return_type)) = rest.split_once('>') else {
        return Err(Error::InvalidSignature {
            input: text.to_string(),
            reason: "unterminated method type parameter list".to_string(),
        });
    };
    return Ok(MethodInfo {
        return_type: TypeSignature::parse(return_type)?,
        type_parameters: params.split(',').map(|p| return p.trim().to_string()).filter(|p| return !p.is_empty()).collect(),
    });
}

/// Map type parameters to arguments; raw uses bind every parameter to the root type.
fn instantiate(parameters: &[String], arguments: &[TypeSignature]) -> HashMap<String, TypeSignature> {
    if parameters.len() == arguments.len() {
        return parameters.iter().cloned().zip(arguments.iter().cloned()).collect();
    }
    return parameters.iter().map(|p| return (p.clone(), TypeSignature::root())).collect();
}

/// Instantiate a method's return type; its own type parameters become the root type.
fn instantiate_method(method: &MethodInfo, bindings: &HashMap<String, TypeSignature>) -> TypeSignature {
    let substituted = method.return_type.substitute(bindings);
    return erase_unbound(&substituted, &method.type_parameters);
}

/// Replace the named type variables with the root type.
fn erase_unbound(sig: &TypeSignature, variables: &[String]) -> TypeSignature {
    if variables.is_empty() {
        return sig.clone();
    }
    let roots = variables.iter().map(|v| return (v.clone(), TypeSignature::root())).collect();
    return sig.substitute(&roots);
}

/// Upper bounds carried by a wildcard.
fn upper_bounds(sig: &TypeSignature) -> Vec<TypeSignature> {
    return match sig {
        TypeSignature::Wildcard { bound: Some(bound), upper: true } => vec![(**bound).clone()],
        _ => Vec::new(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TypeCatalog {
        return TypeCatalog::builtin().unwrap();
    }

    fn sig(text: &str) -> TypeSignature {
        return TypeSignature::parse(text).unwrap();
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = catalog();
        assert!(catalog.contains("java.util.ArrayList"));
        assert!(catalog.is_interface("java.util.List"));
        assert_eq!(catalog.candidates("List"), vec!["java.util.List"]);
    }

    #[test]
    fn supertypes_are_instantiated() {
        let (superclass, interfaces) = catalog().supertypes(&sig("java.util.ArrayList<java.lang.String>"));
        assert_eq!(superclass.unwrap().to_string(), "java.util.AbstractList<java.lang.String>");
        assert_eq!(interfaces.first().unwrap().to_string(), "java.util.List<java.lang.String>");
    }

    #[test]
    fn classes_default_to_root_superclass() {
        let catalog = catalog();
        assert_eq!(catalog.supertypes(&sig("java.lang.Number")).0, Some(TypeSignature::root()));
        assert_eq!(catalog.supertypes(&sig("com.acme.Unknown")).0, Some(TypeSignature::root()));
        assert_eq!(catalog.supertypes(&sig("java.lang.Object")).0, None);
        assert_eq!(catalog.supertypes(&sig("java.util.List<E>")).0, None);
    }

    #[test]
    fn methods_substitute_receiver_arguments() {
        let catalog = catalog();
        let list = sig("java.util.List<java.lang.Integer>");
        assert_eq!(catalog.method_type(&list, "get").unwrap().to_string(), "java.lang.Integer");
        // Inherited through Collection<E>.
        assert_eq!(
            catalog.method_type(&list, "stream").unwrap().to_string(),
            "java.util.stream.Stream<java.lang.Integer>"
        );
        // Inherited from Object.
        assert_eq!(catalog.method_type(&list, "toString").unwrap().to_string(), "java.lang.String");
    }

    #[test]
    fn raw_receivers_and_method_variables_become_root() {
        let catalog = catalog();
        assert_eq!(catalog.method_type(&sig("java.util.List"), "get").unwrap().to_string(), ROOT_TYPE);
        assert_eq!(
            catalog.static_method_type("java.util.Collections", "emptyList").unwrap().to_string(),
            "java.util.List<java.lang.Object>"
        );
    }

    #[test]
    fn array_bindings_carry_fixed_supertypes() {
        let catalog = catalog();
        let binding = catalog.binding_for(&sig("java.lang.String[]"));
        assert!(binding.is_array());
        assert_eq!(binding.superclass, Some(TypeSignature::root()));
        assert_eq!(binding.interfaces.len(), 2);
        assert_eq!(catalog.field_type(&sig("int[]"), "length"), Some(TypeSignature::Primitive("int".to_string())));
    }

    #[test]
    fn capture_bindings_have_no_name() {
        let binding = catalog().binding_for(&sig("capture-of ? extends java.lang.Number"));
        assert_eq!(binding.kind, BindingKind::Capture);
        assert!(binding.qualified_name.is_empty());
        assert_eq!(binding.bounds, vec![sig("java.lang.Number")]);
    }

    #[test]
    fn static_fields_resolve() {
        assert_eq!(
            catalog().field_type(&sig("java.lang.System"), "out").unwrap().to_string(),
            "java.io.PrintStream"
        );
    }

    #[test]
    fn cyclic_supertypes_end_member_lookup() {
        let mut catalog = TypeCatalog::builtin().unwrap();
        let decls = parse_catalog(
            "[[types]]\nname = \"p.A\"\nkind = \"interface\"\ninterfaces = [\"p.B\", \"p.C\"]\n\n\
             [[types]]\nname = \"p.B\"\nkind = \"interface\"\ninterfaces = [\"p.A\", \"p.C\"]\n\n\
             [[types]]\nname = \"p.C\"\nkind = \"interface\"\ninterfaces = [\"p.A\", \"p.B\"]\nmethods = { name = \"java.lang.String\" }\n",
        )
        .unwrap();
        catalog.extend(decls).unwrap();
        let a = sig("p.A");
        assert_eq!(catalog.method_type(&a, "missing"), None);
        assert_eq!(catalog.field_type(&a, "missing"), None);
        assert_eq!(catalog.method_type(&a, "name").unwrap().to_string(), "java.lang.String");
        assert_eq!(catalog.method_type(&a, "hashCode").unwrap().to_string(), "int");
    }

    #[test]
    fn rejects_bad_member_signature() {
        let decls = parse_catalog("[[types]]\nname = \"a.B\"\nmethods = { m = \"List<\" }\n").unwrap();
        assert!(TypeCatalog::default().extend(decls).is_err());
    }
}
