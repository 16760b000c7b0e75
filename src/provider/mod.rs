//! The frozen provider: the read-mostly resolution façade.
//!
//! A [`Provider`] owns a frozen registry snapshot, the plan cache, and
//! the singleton cache. It is cheap to clone (`Arc` inside) and safe to
//! share across threads; per-resolution state lives in
//! [`ActivationScope`]s instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::container::{ContainerOptions, ScopeMode};
use crate::error::{DiError, DiResult};
use crate::internal::ambient_scope;
use crate::key::TypeKey;
use crate::observer::Observers;
use crate::planner::{ActivationPlan, Planner};
use crate::registration::{AnyArc, FrozenRegistry};

mod activate;
mod scope;

pub use scope::ActivationScope;
pub(crate) use scope::SharedScopedCache;

use once_cell::sync::OnceCell;

/// Read-only façade over a frozen registry plus the singleton cache.
///
/// Obtained from [`Container::build_provider`](crate::Container::build_provider).
/// Cloning is cheap and clones share all caches. The only mutation a
/// provider accepts is the purely additive [`set`](Provider::set), which
/// registers further singleton instances under new keys without
/// invalidating compiled plans or existing singletons.
pub struct Provider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) frozen: FrozenRegistry,
    pub(crate) plans: Mutex<HashMap<TypeKey, Arc<ActivationPlan>>>,
    pub(crate) extras: Mutex<HashMap<TypeKey, AnyArc>>,
    pub(crate) observers: Observers,
    pub(crate) options: ContainerOptions,
}

impl Clone for Provider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Provider {
    pub(crate) fn new(
        frozen: FrozenRegistry,
        observers: Observers,
        options: ContainerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                frozen,
                plans: Mutex::new(HashMap::new()),
                extras: Mutex::new(HashMap::new()),
                observers,
                options,
            }),
        }
    }

    /// Resolves a concrete type registered under its own key.
    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve(&TypeKey::of::<T>())?)
    }

    /// Resolves a trait object registered through an interface coercion
    /// or a trait-returning factory.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast_trait::<T>(self.resolve(&TypeKey::of::<T>())?)
    }

    /// Resolves the optional form of a concrete type; `Ok(None)` when the
    /// target is absent.
    pub fn get_optional<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        let key = TypeKey::optional(TypeKey::of::<T>());
        match self.resolve_optional(&key)? {
            Some(value) => downcast::<T>(value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves an arbitrary key and downcasts the result.
    pub fn get_keyed<T: Send + Sync + 'static>(&self, key: &TypeKey) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve(key)?)
    }

    /// Resolves an arbitrary key to its type-erased instance.
    pub fn get_by_key(&self, key: &TypeKey) -> DiResult<AnyArc> {
        self.resolve(key)
    }

    /// Resolves a key, failing when it activates to nothing.
    pub fn resolve(&self, key: &TypeKey) -> DiResult<AnyArc> {
        self.resolve_optional(key)?
            .ok_or_else(|| DiError::CannotResolveType(key.to_string()))
    }

    /// Resolves a key; optional keys with an unregistered target yield
    /// `Ok(None)`.
    pub fn resolve_optional(&self, key: &TypeKey) -> DiResult<Option<AnyArc>> {
        let scope = self.ephemeral_scope();
        self.resolve_in_scope(key, &scope)
    }

    /// Whether a registration (or an added singleton) exists for `key`.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.inner.frozen.contains(key) || self.inner.extras.lock().unwrap().contains_key(key)
    }

    /// Creates a new activation scope. Scoped instances live until the
    /// scope is dropped.
    pub fn create_scope(&self) -> ActivationScope {
        match self.inner.options.scope_mode {
            ScopeMode::Isolated => ActivationScope::isolated(self.clone()),
            ScopeMode::Tracking => ActivationScope::tracking(self.clone()),
        }
    }

    /// Adds a singleton instance under the concrete key of `T`.
    ///
    /// Purely additive: the key must be new — a key already present in
    /// the frozen registry or previously added here is rejected with an
    /// overriding-service error. Compiled plans and existing singletons
    /// are never invalidated by this call.
    pub fn set<T: Send + Sync + 'static>(&self, value: T) -> DiResult<()> {
        self.set_by_key(TypeKey::of::<T>(), Arc::new(value))
    }

    /// Adds a singleton instance under an explicit key. Same additivity
    /// rules as [`set`](Provider::set).
    pub fn set_by_key(&self, key: TypeKey, instance: AnyArc) -> DiResult<()> {
        if self.inner.frozen.contains(&key) {
            return Err(DiError::OverridingService(key.to_string()));
        }
        let mut extras = self.inner.extras.lock().unwrap();
        if extras.contains_key(&key) {
            return Err(DiError::OverridingService(key.to_string()));
        }
        extras.insert(key, instance);
        Ok(())
    }

    /// Per-call scope for root resolutions; joins the ambient tracked
    /// scope when one is installed on this thread.
    fn ephemeral_scope(&self) -> ActivationScope {
        if self.inner.options.scope_mode == ScopeMode::Tracking {
            if let Some(cache) = ambient_scope() {
                return ActivationScope::joined(self.clone(), cache);
            }
        }
        ActivationScope::isolated(self.clone())
    }

    pub(crate) fn resolve_in_scope(
        &self,
        key: &TypeKey,
        scope: &ActivationScope,
    ) -> DiResult<Option<AnyArc>> {
        let observers = &self.inner.observers;
        if !observers.has_observers() {
            let plan = self.plan_for(key)?;
            return activate::execute(&plan, scope);
        }

        observers.resolving(key);
        let start = Instant::now();
        let result = self
            .plan_for(key)
            .and_then(|plan| activate::execute(&plan, scope));
        match &result {
            Ok(_) => observers.resolved(key, start.elapsed()),
            Err(error) => observers.resolve_failed(key, error),
        }
        result
    }

    /// Looks up or compiles the activation plan for a key. Failed
    /// compilations are not cached, so a later additive `set` can make
    /// the key resolvable.
    pub(crate) fn plan_for(&self, key: &TypeKey) -> DiResult<Arc<ActivationPlan>> {
        if let Some(plan) = self.inner.plans.lock().unwrap().get(key) {
            return Ok(plan.clone());
        }
        let extras = self.inner.extras.lock().unwrap().clone();
        let plan = Arc::new(Planner::compile(&self.inner.frozen, &extras, key)?);
        self.inner
            .plans
            .lock()
            .unwrap()
            .insert(key.clone(), plan.clone());
        Ok(plan)
    }

    pub(crate) fn singleton_cell(&self, key: &TypeKey) -> Option<&OnceCell<Option<AnyArc>>> {
        self.inner.frozen.get(key).and_then(|entry| entry.singleton.as_ref())
    }

    /// Human-readable dump of the frozen registrations and any
    /// singletons added through [`set`](Provider::set).
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Provider Debug ===\n");
        s.push_str("Registrations:\n");
        for (key, entry) in self.inner.frozen.iter() {
            s.push_str(&format!(
                "  {}: {:?} ({:?})\n",
                key,
                entry.registration.lifetime,
                entry.registration.builder_kind()
            ));
        }
        let extras = self.inner.extras.lock().unwrap();
        if !extras.is_empty() {
            s.push_str("Added singletons:\n");
            for key in extras.keys() {
                s.push_str(&format!("  {}: Singleton (Instance)\n", key));
            }
        }
        s
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<Arc<T>>()
        .map(|wrapped| (*wrapped).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}
