//! The mutable container: registration surface and cached resolution
//! view.

use std::sync::{Arc, Mutex};

use crate::descriptors::Injectable;
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers};
use crate::provider::{ActivationScope, Provider};
use crate::registration::{Builder, BuilderKind, Factory, Registration, Registry};

/// How activation scopes behave for a container's providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Every scope owns an isolated scoped cache (the default).
    #[default]
    Isolated,
    /// Experimental: scopes publish their cache to a thread-local
    /// ambient slot so nested resolutions share it transparently.
    Tracking,
}

/// Container configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerOptions {
    /// Disables automatic alias derivation; only explicit
    /// [`add_alias`](Container::add_alias) entries participate.
    pub strict: bool,
    /// The activation-scope behavior for providers built from this
    /// container.
    pub scope_mode: ScopeMode,
}

/// Introspection summary of one registration.
#[derive(Debug, Clone)]
pub struct RegistrationInfo {
    /// The registered key.
    pub key: TypeKey,
    /// The registration's lifetime.
    pub lifetime: Lifetime,
    /// How instances are produced.
    pub kind: BuilderKind,
}

/// Mutable registry of services and the entry point of the crate.
///
/// Registrations accumulate here; [`build_provider`](Container::build_provider)
/// freezes a snapshot into a [`Provider`]. The container can also
/// resolve directly — it keeps an internal provider view that is
/// discarded and rebuilt (plans and singletons included) whenever a
/// mutation advances the registry generation.
pub struct Container {
    registry: Registry,
    observers: Observers,
    options: ContainerOptions,
    view: Mutex<Option<(u64, Provider)>>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").finish_non_exhaustive()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates an empty container with the given options.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            registry: Registry::new(),
            observers: Observers::new(),
            options,
            view: Mutex::new(None),
        }
    }

    // ----- Core registration -----

    /// Registers under an explicit key. Fails with an overriding-service
    /// error when the key is already registered.
    pub fn register(&mut self, key: TypeKey, registration: Registration) -> DiResult<&mut Self> {
        self.register_full(key, registration, false)
    }

    /// Registers under an explicit key, replacing any existing
    /// registration.
    pub fn register_override(
        &mut self,
        key: TypeKey,
        registration: Registration,
    ) -> DiResult<&mut Self> {
        self.register_full(key, registration, true)
    }

    fn register_full(
        &mut self,
        key: TypeKey,
        mut registration: Registration,
        allow_override: bool,
    ) -> DiResult<&mut Self> {
        if let Builder::ConcreteType(descriptor) = &registration.builder {
            match &key {
                // Collections are satisfied as a whole by factories or
                // instances; a constructed type cannot stand in for one.
                TypeKey::Collection(..) => {
                    return Err(DiError::TypeMismatch(key.to_string()));
                }
                TypeKey::Concrete(id, name) if *id != descriptor.type_id => {
                    match descriptor.coercion_for(*id) {
                        Some(coerce) => registration.coerce = Some(coerce),
                        None => {
                            return Err(DiError::TypeMismatch(format!(
                                "{} does not provide {}",
                                descriptor.type_name, name
                            )))
                        }
                    }
                }
                TypeKey::Parameterized(id, name, _) if *id != descriptor.type_id => {
                    match descriptor.coercion_for(*id) {
                        Some(coerce) => registration.coerce = Some(coerce),
                        None => {
                            return Err(DiError::TypeMismatch(format!(
                                "{} does not provide {}",
                                descriptor.type_name, name
                            )))
                        }
                    }
                }
                _ => {}
            }
        }

        // Derived aliases carry the concrete type's own name and point at
        // the registered key, so an implementation registered under an
        // interface key still answers to its own name.
        let derived = if self.options.strict {
            None
        } else {
            match &registration.builder {
                Builder::ConcreteType(descriptor) => Some((descriptor.type_name, key.clone())),
                _ => match &key {
                    TypeKey::Concrete(_, name) => Some((*name, key.clone())),
                    _ => None,
                },
            }
        };
        self.registry.insert(key, registration, allow_override)?;
        if let Some((name, key)) = derived {
            self.registry.add_derived_aliases(name, &key);
        }
        Ok(self)
    }

    // ----- Concrete-type sugar -----

    /// Registers `C` under its own key with transient lifetime.
    pub fn add_transient<C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<C>(), Registration::concrete::<C>(Lifetime::Transient))
    }

    /// Registers `C` under its own key with scoped lifetime.
    pub fn add_scoped<C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<C>(), Registration::concrete::<C>(Lifetime::Scoped))
    }

    /// Registers `C` under its own key with singleton lifetime.
    pub fn add_singleton<C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<C>(), Registration::concrete::<C>(Lifetime::Singleton))
    }

    /// Registers concrete `C` under the key of interface `I` (transient).
    /// C's descriptor must provide `I`, else the call fails with a
    /// type-mismatch error.
    pub fn add_transient_as<I: ?Sized + 'static, C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<I>(), Registration::concrete::<C>(Lifetime::Transient))
    }

    /// Scoped form of [`add_transient_as`](Container::add_transient_as).
    pub fn add_scoped_as<I: ?Sized + 'static, C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<I>(), Registration::concrete::<C>(Lifetime::Scoped))
    }

    /// Singleton form of [`add_transient_as`](Container::add_transient_as).
    pub fn add_singleton_as<I: ?Sized + 'static, C: Injectable>(&mut self) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<I>(), Registration::concrete::<C>(Lifetime::Singleton))
    }

    // ----- Factory sugar -----

    /// Registers a transient factory under its return key.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, Factory::new(factory))
    }

    /// Registers a scoped factory under its return key.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, Factory::new(factory))
    }

    /// Registers a singleton factory under its return key.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> DiResult<&mut Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&ActivationScope) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, Factory::new(factory))
    }

    /// Registers a factory under its recorded return key. Fails with a
    /// missing-type error when the factory carries none.
    pub fn add_factory(&mut self, lifetime: Lifetime, factory: Factory) -> DiResult<&mut Self> {
        let key = factory.return_key.clone().ok_or_else(|| {
            DiError::MissingType("factory registered without an explicit key or return key".into())
        })?;
        self.register(key, Registration::factory(lifetime, factory))
    }

    /// Registers a factory under an explicit key (unions, parameterized
    /// and collection keys, or overriding the return key).
    pub fn add_factory_for(
        &mut self,
        key: TypeKey,
        lifetime: Lifetime,
        factory: Factory,
    ) -> DiResult<&mut Self> {
        self.register(key, Registration::factory(lifetime, factory))
    }

    // ----- Instances and aliases -----

    /// Registers a pre-existing instance as a singleton under the
    /// concrete key of its runtime type.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, value: T) -> DiResult<&mut Self> {
        self.register(TypeKey::of::<T>(), Registration::instance(value))
    }

    /// Adds an explicit alias entry: a name pointing at a key, consulted
    /// only for dependency sites without a type declaration.
    pub fn add_alias(&mut self, name: impl Into<String>, key: TypeKey) -> &mut Self {
        self.registry.add_alias(name, key);
        self
    }

    /// Whether a registration exists for `key`. Aliases are not
    /// consulted.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.registry.contains(key)
    }

    /// Registers a resolution observer on providers built from this
    /// container.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Introspection summaries of all registrations, in registration
    /// order.
    pub fn descriptors(&self) -> Vec<RegistrationInfo> {
        self.registry
            .iter()
            .map(|(key, registration)| RegistrationInfo {
                key: key.clone(),
                lifetime: registration.lifetime,
                kind: registration.builder_kind(),
            })
            .collect()
    }

    // ----- Building and resolving -----

    /// Freezes the current registrations into an independent provider.
    pub fn build_provider(&self) -> Provider {
        Provider::new(self.registry.freeze(), self.observers.clone(), self.options)
    }

    /// The container's internal provider view, rebuilt — discarding
    /// compiled plans and cached singletons — whenever the registry
    /// generation has advanced since the last resolution.
    fn view(&self) -> Provider {
        let generation = self.registry.generation();
        let mut guard = self.view.lock().unwrap();
        match &*guard {
            Some((cached_generation, provider)) if *cached_generation == generation => {
                provider.clone()
            }
            _ => {
                let provider = self.build_provider();
                *guard = Some((generation, provider.clone()));
                provider
            }
        }
    }

    /// Resolves a concrete type through the internal view.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.view().get::<T>()
    }

    /// Resolves a trait object through the internal view.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.view().get_trait::<T>()
    }

    /// Resolves the optional form of a concrete type through the
    /// internal view.
    pub fn get_optional<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.view().get_optional::<T>()
    }

    /// Resolves an arbitrary key through the internal view.
    pub fn resolve(&self, key: &TypeKey) -> DiResult<crate::registration::AnyArc> {
        self.view().resolve(key)
    }

    /// Creates an activation scope over the internal view.
    pub fn create_scope(&self) -> ActivationScope {
        self.view().create_scope()
    }
}
