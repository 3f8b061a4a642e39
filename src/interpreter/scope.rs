//! Variable scopes
//!
//! A scope owns its variable bindings and routine definitions and holds a weak
//! reference to its parent. Reads and writes of a name resolve to the nearest
//! scope in the chain that declared it; a write never creates a binding.
//!
//! INOUT parameters are the one place a child scope deliberately has no binding
//! of its own: `alias` records that a parameter name stands for a variable of
//! the parent, and every access to it is forwarded there.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::errors::ExecError;
use super::types::{Routine, TypeTag, Val};

/// A declared variable. `value` is `None` until the first assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub ty: TypeTag,
    pub value: Option<Val>,
}

/// An INOUT parameter: the parent variable it stands for and the parameter's
/// own declared type, which every write through it must satisfy
#[derive(Debug, Clone, PartialEq)]
struct Alias {
    target: String,
    ty: TypeTag,
}

#[derive(Debug)]
pub struct Scope {
    vars: RwLock<HashMap<String, Binding>>,
    /// Parameter name -> parent variable (INOUT)
    aliases: RwLock<HashMap<String, Alias>>,
    routines: RwLock<HashMap<String, Arc<Routine>>>,
    parent: Option<Weak<Scope>>,
    /// Number of invocations between this scope and the root
    depth: usize,
}

impl Scope {
    /// Create a scope with no parent (program entry)
    pub fn root() -> Arc<Scope> {
        Arc::new(Self::empty(None, 0))
    }

    /// Create the scope of an invocation made from `parent`
    pub fn child(parent: &Arc<Scope>) -> Arc<Scope> {
        Arc::new(Self::empty(Some(Arc::downgrade(parent)), parent.depth + 1))
    }

    fn empty(parent: Option<Weak<Scope>>, depth: usize) -> Self {
        Self {
            vars: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            routines: RwLock::new(HashMap::new()),
            parent,
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<Arc<Scope>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /* ===================== Variables ===================== */

    /// Declare a variable in this scope, initially unset
    pub fn declare(&self, name: &str, ty: TypeTag) -> Result<(), ExecError> {
        if self.is_local(name) {
            return Err(ExecError::AlreadyDeclared {
                name: name.to_string(),
            });
        }
        self.write_vars().insert(
            name.to_string(),
            Binding {
                ty,
                value: None,
            },
        );
        Ok(())
    }

    /// Make `name` in this scope stand for `target` in the parent scope
    ///
    /// No binding is created here; reads and writes of `name` go to the
    /// parent's `target`. Writes must also satisfy `ty`.
    pub fn alias(&self, name: &str, target: &str, ty: TypeTag) -> Result<(), ExecError> {
        if self.is_local(name) {
            return Err(ExecError::AlreadyDeclared {
                name: name.to_string(),
            });
        }
        self.aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                Alias {
                    target: target.to_string(),
                    ty,
                },
            );
        Ok(())
    }

    /// Assign to the nearest declaration of `name`
    pub fn set(&self, name: &str, value: Val) -> Result<(), ExecError> {
        {
            let mut vars = self.write_vars();
            if let Some(binding) = vars.get_mut(name) {
                if !binding.ty.accepts(&value) {
                    return Err(assign_mismatch(name, binding.ty, &value));
                }
                tracing::trace!(name, depth = self.depth, "set variable");
                binding.value = Some(value);
                return Ok(());
            }
        }

        if let Some(ty) = self.alias_type(name) {
            if !ty.accepts(&value) {
                return Err(assign_mismatch(name, ty, &value));
            }
        }

        let (parent, target) = self.forward(name)?;
        parent.set(&target, value)
    }

    /// Read the nearest declaration of `name`
    ///
    /// Returns `Ok(None)` for a declared variable that was never assigned.
    pub fn get(&self, name: &str) -> Result<Option<Val>, ExecError> {
        if let Some(binding) = self.read_vars().get(name) {
            return Ok(binding.value.clone());
        }

        let (parent, target) = self.forward(name)?;
        parent.get(&target)
    }

    /// Declared type of the nearest declaration of `name`
    ///
    /// An INOUT parameter reports its own type, not the caller variable's.
    pub fn declared_type(&self, name: &str) -> Option<TypeTag> {
        if let Some(binding) = self.read_vars().get(name) {
            return Some(binding.ty);
        }
        let (parent, target) = self.forward(name).ok()?;
        let parent_ty = parent.declared_type(&target)?;
        Some(self.alias_type(name).unwrap_or(parent_ty))
    }

    fn alias_type(&self, name: &str) -> Option<TypeTag> {
        self.aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|alias| alias.ty)
    }

    /// Whether `name` resolves anywhere in the chain
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared_type(name).is_some()
    }

    /// Whether `name` is declared or aliased in this scope itself
    pub fn is_local(&self, name: &str) -> bool {
        self.read_vars().contains_key(name)
            || self
                .aliases
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(name)
    }

    /// Copy of this scope's own bindings
    pub fn bindings(&self) -> HashMap<String, Binding> {
        self.read_vars().clone()
    }

    /// Parent scope and the name to look up there
    fn forward(&self, name: &str) -> Result<(Arc<Scope>, String), ExecError> {
        let target = self
            .aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|alias| alias.target.clone())
            .unwrap_or_else(|| name.to_string());

        match self.parent() {
            Some(parent) => Ok((parent, target)),
            None => Err(ExecError::Undeclared {
                name: name.to_string(),
            }),
        }
    }

    fn read_vars(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Binding>> {
        self.vars.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_vars(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Binding>> {
        self.vars.write().unwrap_or_else(PoisonError::into_inner)
    }

    /* ===================== Routines ===================== */

    /// Register a function or procedure in this scope
    pub fn define_routine(&self, routine: Routine) -> Result<(), ExecError> {
        let mut routines = self
            .routines
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if routines.contains_key(&routine.name) {
            return Err(ExecError::AlreadyDefined {
                name: routine.name.clone(),
            });
        }
        routines.insert(routine.name.clone(), Arc::new(routine));
        Ok(())
    }

    /// Look up a routine here, then in the parent chain
    pub fn get_routine(&self, name: &str) -> Option<Arc<Routine>> {
        let local = self
            .routines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        local.or_else(|| self.parent().and_then(|p| p.get_routine(name)))
    }
}

fn assign_mismatch(name: &str, ty: TypeTag, value: &Val) -> ExecError {
    ExecError::type_error(format!(
        "Cannot assign {} to variable '{}' of type {}",
        value.type_name(),
        name,
        ty
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::{RoutineKind, Stmt};

    fn routine(name: &str) -> Routine {
        Routine {
            kind: RoutineKind::Procedure,
            name: name.to_string(),
            params: vec![],
            returns: None,
            body: vec![Stmt::Break],
        }
    }

    #[test]
    fn test_declare_then_get_is_unset() {
        let scope = Scope::root();
        scope.declare("x", TypeTag::Number).unwrap();

        assert_eq!(scope.get("x"), Ok(None));
        scope.set("x", Val::Num(5.0)).unwrap();
        assert_eq!(scope.get("x"), Ok(Some(Val::Num(5.0))));
    }

    #[test]
    fn test_redeclare_same_scope_fails() {
        let scope = Scope::root();
        scope.declare("x", TypeTag::Number).unwrap();

        let err = scope.declare("x", TypeTag::String).unwrap_err();
        assert_eq!(
            err,
            ExecError::AlreadyDeclared {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_child_may_shadow_parent_name() {
        let root = Scope::root();
        root.declare("x", TypeTag::Number).unwrap();
        root.set("x", Val::Num(1.0)).unwrap();

        let child = Scope::child(&root);
        child.declare("x", TypeTag::Number).unwrap();
        child.set("x", Val::Num(2.0)).unwrap();

        assert_eq!(root.get("x"), Ok(Some(Val::Num(1.0))));
        assert_eq!(child.get("x"), Ok(Some(Val::Num(2.0))));
    }

    #[test]
    fn test_set_writes_to_declaring_scope() {
        let root = Scope::root();
        root.declare("total", TypeTag::Number).unwrap();

        let child = Scope::child(&root);
        child.set("total", Val::Num(7.0)).unwrap();

        assert_eq!(root.get("total"), Ok(Some(Val::Num(7.0))));
        assert!(!child.is_local("total"));
    }

    #[test]
    fn test_undeclared_get_and_set_fail() {
        let root = Scope::root();
        let child = Scope::child(&root);

        assert_eq!(
            child.get("nope"),
            Err(ExecError::Undeclared {
                name: "nope".to_string()
            })
        );
        assert!(child.set("nope", Val::Null).is_err());
    }

    #[test]
    fn test_set_checks_declared_type() {
        let scope = Scope::root();
        scope.declare("n", TypeTag::Number).unwrap();

        let err = scope.set("n", Val::str("x")).unwrap_err();
        assert_eq!(err.code(), crate::interpreter::errors::TYPE_ERROR);
        scope.set("n", Val::Null).unwrap();
    }

    #[test]
    fn test_alias_forwards_to_parent_variable() {
        let root = Scope::root();
        root.declare("counter", TypeTag::Number).unwrap();
        root.set("counter", Val::Num(1.0)).unwrap();

        let child = Scope::child(&root);
        child.alias("c", "counter", TypeTag::Number).unwrap();

        assert_eq!(child.get("c"), Ok(Some(Val::Num(1.0))));
        child.set("c", Val::Num(2.0)).unwrap();

        assert_eq!(root.get("counter"), Ok(Some(Val::Num(2.0))));
        assert!(child.bindings().is_empty());
        assert_eq!(child.declared_type("c"), Some(TypeTag::Number));
    }

    #[test]
    fn test_alias_writes_check_parameter_type() {
        let root = Scope::root();
        root.declare("slot", TypeTag::Any).unwrap();
        root.set("slot", Val::Num(1.0)).unwrap();

        let child = Scope::child(&root);
        child.alias("n", "slot", TypeTag::Number).unwrap();

        let err = child.set("n", Val::str("x")).unwrap_err();
        assert_eq!(err.code(), crate::interpreter::errors::TYPE_ERROR);
        assert_eq!(root.get("slot"), Ok(Some(Val::Num(1.0))));
        assert_eq!(child.declared_type("n"), Some(TypeTag::Number));
        assert_eq!(root.declared_type("slot"), Some(TypeTag::Any));
    }

    #[test]
    fn test_alias_conflicts_with_local_declaration() {
        let root = Scope::root();
        let child = Scope::child(&root);
        child.declare("a", TypeTag::Any).unwrap();

        assert!(child.alias("a", "b", TypeTag::Any).is_err());
    }

    #[test]
    fn test_parent_dropped_means_no_fallback() {
        let root = Scope::root();
        root.declare("x", TypeTag::Number).unwrap();
        let child = Scope::child(&root);
        drop(root);

        assert!(child.parent().is_none());
        assert!(child.get("x").is_err());
    }

    #[test]
    fn test_routines_are_local_with_parent_fallback() {
        let root = Scope::root();
        root.define_routine(routine("p")).unwrap();

        let child = Scope::child(&root);
        assert!(child.get_routine("p").is_some());
        assert!(child.get_routine("q").is_none());

        child.define_routine(routine("p")).unwrap();
        let err = root.define_routine(routine("p")).unwrap_err();
        assert_eq!(
            err,
            ExecError::AlreadyDefined {
                name: "p".to_string()
            }
        );
    }

    #[test]
    fn test_child_depth() {
        let root = Scope::root();
        let child = Scope::child(&root);
        let grandchild = Scope::child(&child);

        assert_eq!(root.depth(), 0);
        assert_eq!(grandchild.depth(), 2);
    }
}
