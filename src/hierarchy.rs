//! Supertype reachability used by template applicability checks.
use std::collections::HashSet;

use crate::catalog::TypeCatalog;
use crate::signature::{ROOT_TYPE, TypeSignature};
use crate::types::SymbolBinding;

/// Constraint token matched by any array binding.
pub const ARRAY_TOKEN: &str = "array";

/// Upper bound on supertype hops.
const MAX_DEPTH: usize = 64;

/// Whether `binding`, one of its supertypes, or one of its interfaces
/// satisfies `target`. A blank target is always satisfied.
pub fn reachable(catalog: &TypeCatalog, binding: &SymbolBinding, target: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return true;
    }
    return search(catalog, binding, target, 0, &mut HashSet::new());
}

/// Whether a node's binding satisfies `target`. No binding means the root
/// type; primitive bindings only satisfy their exact name.
pub fn resolves_to(catalog: &TypeCatalog, binding: Option<&SymbolBinding>, target: &str) -> bool {
    if target.trim().is_empty() {
        return true;
    }
    return match binding {
        Some(b) if b.is_primitive() => b.qualified_name == target.trim(),
        Some(b) => reachable(catalog, b, target),
        None => reachable(catalog, &catalog.binding_for(&TypeSignature::root()), target),
    };
}

/// Depth-first walk over supertypes. Each erased type is visited once, so
/// cyclic declarations terminate.
fn search(catalog: &TypeCatalog, binding: &SymbolBinding, target: &str, depth: usize, visited: &mut HashSet<String>) -> bool {
    if depth > MAX_DEPTH || !visited.insert(binding.signature.erasure()) {
        return false;
    }
    if binding.qualified_name.starts_with(target) || (binding.is_array() && target == ARRAY_TOKEN) || target == ROOT_TYPE {
        return true;
    }
    let next = depth.saturating_add(1);
    for parent in binding.interfaces.iter().chain(binding.superclass.iter()) {
        if search(catalog, &catalog.binding_for(parent), target, next, visited) {
            return true;
        }
    }
    return false;
}
