use crate::value::{read, write, Value};
use linked_hash_map::LinkedHashMap;
use std::{
    fmt::{self, Debug, Formatter},
    sync::{Arc, RwLock},
};
use strum::{Display, EnumIs};

#[derive(Clone, Copy, Debug, Display, EnumIs, Eq, Hash, PartialEq)]
pub enum EnvironmentKind {
    Global,
    Function,
    Block,
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// A lexical environment: the bindings of one scope plus a link to the
/// enclosing one.
///
/// Environments are shared between the execution thread and paused debugger
/// snapshots, so bindings live behind a lock.
pub struct Environment {
    kind: EnvironmentKind,
    bindings: RwLock<LinkedHashMap<String, Binding>>,
    parent: Option<Arc<Environment>>,
}
impl Environment {
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::new(Self {
            kind: EnvironmentKind::Global,
            bindings: RwLock::default(),
            parent: None,
        })
    }
    #[must_use]
    pub fn new(kind: EnvironmentKind, parent: Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            bindings: RwLock::default(),
            parent: Some(parent),
        })
    }

    #[must_use]
    pub const fn kind(&self) -> EnvironmentKind {
        self.kind
    }
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Declares (or redeclares) a binding in this environment.
    pub fn declare(&self, name: impl Into<String>, value: Value, mutable: bool) {
        write(&self.bindings).insert(name.into(), Binding { value, mutable });
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = read(&self.bindings).get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref()?.lookup(name)
    }

    /// Assigns to the nearest binding called `name`.
    pub fn assign(&self, name: &str, value: Value) -> AssignResult {
        {
            let mut bindings = write(&self.bindings);
            if let Some(binding) = bindings.get_mut(name) {
                if !binding.mutable {
                    return AssignResult::Immutable;
                }
                binding.value = value;
                return AssignResult::Assigned;
            }
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => AssignResult::NotFound,
        }
    }

    #[must_use]
    pub fn binding_names(&self) -> Vec<String> {
        read(&self.bindings).keys().cloned().collect()
    }
    #[must_use]
    pub fn own_binding(&self, name: &str) -> Option<Value> {
        read(&self.bindings)
            .get(name)
            .map(|binding| binding.value.clone())
    }

    /// The environment `var` declarations of this scope end up in.
    #[must_use]
    pub fn variable_environment(self: &Arc<Self>) -> Arc<Self> {
        let mut environment = self;
        while environment.kind.is_block() {
            match &environment.parent {
                Some(parent) => environment = parent,
                None => break,
            }
        }
        environment.clone()
    }
    #[must_use]
    pub fn root(self: &Arc<Self>) -> Arc<Self> {
        let mut environment = self;
        while let Some(parent) = &environment.parent {
            environment = parent;
        }
        environment.clone()
    }
}
impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Environment")
            .field("kind", &self.kind)
            .field("bindings", &self.binding_names())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, EnumIs, Eq, PartialEq)]
pub enum AssignResult {
    Assigned,
    Immutable,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outwards() {
        let global = Environment::global();
        global.declare("x", Value::from(1.0), true);
        let function = Environment::new(EnvironmentKind::Function, global.clone());
        let block = Environment::new(EnvironmentKind::Block, function.clone());
        block.declare("y", Value::from(2.0), true);

        assert_eq!(block.lookup("x").unwrap().to_number(), 1.0);
        assert_eq!(block.lookup("y").unwrap().to_number(), 2.0);
        assert!(function.lookup("y").is_none());
        assert!(Arc::ptr_eq(&block.variable_environment(), &function));
        assert!(Arc::ptr_eq(&block.root(), &global));
    }

    #[test]
    fn assignment_respects_const() {
        let global = Environment::global();
        global.declare("limit", Value::from(3.0), false);
        global.declare("count", Value::from(0.0), true);
        let block = Environment::new(EnvironmentKind::Block, global.clone());

        assert_eq!(block.assign("count", Value::from(1.0)), AssignResult::Assigned);
        assert_eq!(global.own_binding("count").unwrap().to_number(), 1.0);
        assert_eq!(block.assign("limit", Value::from(4.0)), AssignResult::Immutable);
        assert_eq!(block.assign("missing", Value::Null), AssignResult::NotFound);
        assert_eq!(global.binding_names(), vec!["limit", "count"]);
    }
}
