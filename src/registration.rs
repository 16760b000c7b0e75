//! Service registration types and the registry data model.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::alias::AliasTable;
use crate::descriptors::{CoerceFn, Injectable, ScopeBindings, TypeDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::provider::ActivationScope;

/// Type-erased shared instance, the container's storage currency.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

type NullaryFn = Arc<dyn Fn() -> DiResult<Option<AnyArc>> + Send + Sync>;
type UnaryFn = Arc<dyn Fn(&ActivationScope) -> DiResult<Option<AnyArc>> + Send + Sync>;
type BinaryFn =
    Arc<dyn Fn(&ActivationScope, Option<&TypeKey>) -> DiResult<Option<AnyArc>> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum FactoryKind {
    Nullary(NullaryFn),
    Unary(UnaryFn),
    Binary(BinaryFn),
}

/// A user-supplied factory in one of the three accepted shapes:
/// `Fn() -> T`, `Fn(&ActivationScope) -> T`, or
/// `Fn(&ActivationScope, Option<&TypeKey>) -> T` (the second argument is
/// the activating type — the key of the node being wired with this
/// value — or `None` at the root of a resolution).
///
/// The typed constructors record the return key; a factory built through
/// [`Factory::untyped`] has none and must be registered with an explicit
/// key.
#[derive(Clone)]
pub struct Factory {
    pub(crate) kind: FactoryKind,
    pub(crate) return_key: Option<TypeKey>,
    pub(crate) locals: ScopeBindings,
}

impl Factory {
    /// Factory taking no arguments.
    pub fn nullary<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Nullary(Arc::new(move || Ok(Some(Arc::new(factory()) as AnyArc)))),
            return_key: Some(TypeKey::of::<T>()),
            locals: ScopeBindings::new(),
        }
    }

    /// Factory receiving the activation scope (the common shape).
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> T + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Unary(Arc::new(move |scope| {
                Ok(Some(Arc::new(factory(scope)) as AnyArc))
            })),
            return_key: Some(TypeKey::of::<T>()),
            locals: ScopeBindings::new(),
        }
    }

    /// Factory receiving the activation scope and the activating type.
    pub fn contextual<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope, Option<&TypeKey>) -> T + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Binary(Arc::new(move |scope, activating| {
                Ok(Some(Arc::new(factory(scope, activating)) as AnyArc))
            })),
            return_key: Some(TypeKey::of::<T>()),
            locals: ScopeBindings::new(),
        }
    }

    /// Factory that may produce nothing; its return key is the optional
    /// form of `T`.
    pub fn optional<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Unary(Arc::new(move |scope| {
                Ok(factory(scope).map(|value| Arc::new(value) as AnyArc))
            })),
            return_key: Some(TypeKey::optional(TypeKey::of::<T>())),
            locals: ScopeBindings::new(),
        }
    }

    /// Factory producing a trait object, stored so that trait-level
    /// lookups can downcast it.
    pub fn for_trait<I, F>(factory: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ActivationScope) -> Arc<I> + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Unary(Arc::new(move |scope| {
                Ok(Some(Arc::new(factory(scope)) as AnyArc))
            })),
            return_key: Some(TypeKey::of::<I>()),
            locals: ScopeBindings::new(),
        }
    }

    /// Fully type-erased factory with no recorded return key; registering
    /// it without an explicit key fails with a missing-type error.
    pub fn untyped<F>(factory: F) -> Self
    where
        F: Fn(&ActivationScope) -> DiResult<Option<AnyArc>> + Send + Sync + 'static,
    {
        Self {
            kind: FactoryKind::Unary(Arc::new(factory)),
            return_key: None,
            locals: ScopeBindings::new(),
        }
    }

    /// Overrides the key this factory is registered under.
    pub fn keyed(mut self, key: TypeKey) -> Self {
        self.return_key = Some(key);
        self
    }

    /// Attaches captured local bindings for deferred references.
    pub fn with_locals(mut self, locals: ScopeBindings) -> Self {
        self.locals = locals;
        self
    }

    pub(crate) fn invoke(
        &self,
        scope: &ActivationScope,
        activating: Option<&TypeKey>,
    ) -> DiResult<Option<AnyArc>> {
        match &self.kind {
            FactoryKind::Nullary(f) => f(),
            FactoryKind::Unary(f) => f(scope),
            FactoryKind::Binary(f) => f(scope, activating),
        }
    }
}

/// How a registration produces instances.
#[derive(Clone)]
pub enum Builder {
    /// Construct the described concrete type by wiring its descriptor.
    ConcreteType(Arc<TypeDescriptor>),
    /// Invoke a user factory.
    Factory(Factory),
    /// Return a pre-existing instance.
    Instance(AnyArc),
}

/// Summary of a builder for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    /// Built by wiring a type descriptor.
    Concrete,
    /// Built by a user factory.
    Factory,
    /// A pre-existing instance.
    Instance,
}

/// The binding of a key to a builder and a lifetime.
#[derive(Clone)]
pub struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) builder: Builder,
    pub(crate) coerce: Option<CoerceFn>,
    pub(crate) locals: Option<Arc<ScopeBindings>>,
}

impl Registration {
    /// Registration that constructs `C` through its descriptor.
    pub fn concrete<C: Injectable>(lifetime: Lifetime) -> Self {
        Self::from_descriptor(lifetime, C::descriptor())
    }

    /// Registration that constructs through an explicit descriptor.
    pub fn from_descriptor(lifetime: Lifetime, descriptor: TypeDescriptor) -> Self {
        Self {
            lifetime,
            builder: Builder::ConcreteType(Arc::new(descriptor)),
            coerce: None,
            locals: None,
        }
    }

    /// Registration backed by a user factory.
    pub fn factory(lifetime: Lifetime, factory: Factory) -> Self {
        let locals = Some(Arc::new(factory.locals.clone()));
        Self {
            lifetime,
            builder: Builder::Factory(factory),
            coerce: None,
            locals,
        }
    }

    /// Singleton registration holding a pre-existing instance.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            builder: Builder::Instance(Arc::new(value)),
            coerce: None,
            locals: None,
        }
    }

    /// Attaches captured local bindings for deferred references.
    pub fn with_locals(mut self, locals: ScopeBindings) -> Self {
        self.locals = Some(Arc::new(locals));
        self
    }

    /// The registration's lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub(crate) fn builder_kind(&self) -> BuilderKind {
        match self.builder {
            Builder::ConcreteType(_) => BuilderKind::Concrete,
            Builder::Factory(_) => BuilderKind::Factory,
            Builder::Instance(_) => BuilderKind::Instance,
        }
    }
}

/// Mutable registry: insertion-ordered registrations, the alias table,
/// and a generation counter advanced by every successful mutation.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Vec<(TypeKey, Registration)>,
    index: HashMap<TypeKey, usize>,
    aliases: AliasTable,
    generation: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        key: TypeKey,
        registration: Registration,
        allow_override: bool,
    ) -> DiResult<()> {
        if let Some(&position) = self.index.get(&key) {
            if !allow_override {
                return Err(DiError::OverridingService(key.to_string()));
            }
            self.entries[position] = (key, registration);
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, registration));
        }
        self.generation += 1;
        Ok(())
    }

    pub(crate) fn contains(&self, key: &TypeKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn add_alias(&mut self, name: impl Into<String>, key: TypeKey) {
        self.aliases.add(name, key);
        self.generation += 1;
    }

    pub(crate) fn add_derived_aliases(&mut self, type_name: &'static str, key: &TypeKey) {
        self.aliases.add_derived(type_name, key);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TypeKey, &Registration)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Snapshots the registry into a frozen view with fresh singleton
    /// slots.
    pub(crate) fn freeze(&self) -> FrozenRegistry {
        FrozenRegistry {
            entries: self
                .entries
                .iter()
                .map(|(key, registration)| (key.clone(), FrozenRegistration::new(registration.clone())))
                .collect(),
            index: self.index.clone(),
            aliases: self.aliases.clone(),
        }
    }
}

/// One registration in a frozen view, with its singleton slot.
pub(crate) struct FrozenRegistration {
    pub(crate) registration: Registration,
    /// Lock-free once-initialized slot; present only for singletons.
    pub(crate) singleton: Option<OnceCell<Option<AnyArc>>>,
}

impl FrozenRegistration {
    fn new(registration: Registration) -> Self {
        let singleton = match registration.lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self {
            registration,
            singleton,
        }
    }
}

/// Immutable registry snapshot owned by a provider.
pub(crate) struct FrozenRegistry {
    entries: Vec<(TypeKey, FrozenRegistration)>,
    index: HashMap<TypeKey, usize>,
    pub(crate) aliases: AliasTable,
}

impl FrozenRegistry {
    pub(crate) fn get(&self, key: &TypeKey) -> Option<&FrozenRegistration> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub(crate) fn contains(&self, key: &TypeKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TypeKey, &FrozenRegistration)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }
}
