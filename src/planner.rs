//! Activation-plan compilation.
//!
//! The planner walks the declared dependencies of a requested key and
//! produces an [`ActivationPlan`]: an arena of nodes forming a DAG rooted
//! at the request. A key shared by several edges compiles to one node, so
//! the activator naturally materializes a single instance per activation
//! for scoped and singleton keys. All structural errors — missing
//! registrations, unresolvable parameters, cycles, dangling deferred
//! references — surface here, before anything is constructed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::{CoerceFn, DependencySpec, ScopeBindings, TypeDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Builder, Factory, FrozenRegistration, FrozenRegistry};

/// Compiled plan for one root key.
pub(crate) struct ActivationPlan {
    pub(crate) root: usize,
    pub(crate) nodes: Vec<PlanNode>,
}

pub(crate) struct PlanNode {
    pub(crate) key: TypeKey,
    pub(crate) lifetime: Lifetime,
    pub(crate) kind: NodeKind,
    pub(crate) coerce: Option<CoerceFn>,
}

pub(crate) enum NodeKind {
    /// A pre-existing instance; leaf.
    Instance(AnyArc),
    /// A user factory; leaf (factories resolve their own dependencies
    /// through the scope they receive).
    Factory(Factory),
    /// Construct the described type from its wired edges.
    Construct {
        descriptor: Arc<TypeDescriptor>,
        ctor_edges: Vec<Edge>,
        attr_edges: Vec<Edge>,
    },
    /// An optional key with no registered target; activates to nothing.
    Null,
}

pub(crate) struct Edge {
    pub(crate) name: &'static str,
    pub(crate) binding: Binding,
}

pub(crate) enum Binding {
    /// Resolve the child node.
    Node(usize),
    /// Optional dependency with no registered target.
    None,
    /// Omitted edge; the parameter's default supplies the value.
    Default,
}

pub(crate) struct Planner<'a> {
    frozen: &'a FrozenRegistry,
    extras: &'a HashMap<TypeKey, AnyArc>,
    nodes: Vec<PlanNode>,
    compiled: HashMap<TypeKey, usize>,
    visiting: Vec<TypeKey>,
}

impl<'a> Planner<'a> {
    pub(crate) fn compile(
        frozen: &'a FrozenRegistry,
        extras: &'a HashMap<TypeKey, AnyArc>,
        root: &TypeKey,
    ) -> DiResult<ActivationPlan> {
        let mut planner = Planner {
            frozen,
            extras,
            nodes: Vec::new(),
            compiled: HashMap::new(),
            visiting: Vec::new(),
        };
        let root = planner.plan_key(root)?;
        Ok(ActivationPlan {
            root,
            nodes: planner.nodes,
        })
    }

    fn is_registered(&self, key: &TypeKey) -> bool {
        self.frozen.contains(key) || self.extras.contains_key(key)
    }

    fn chain(&self) -> Vec<String> {
        self.visiting.iter().map(ToString::to_string).collect()
    }

    fn chain_through(&self, key: &TypeKey) -> Vec<String> {
        let mut chain = self.chain();
        chain.push(key.to_string());
        chain
    }

    fn install(&mut self, key: &TypeKey, lifetime: Lifetime, kind: NodeKind, coerce: Option<CoerceFn>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(PlanNode {
            key: key.clone(),
            lifetime,
            kind,
            coerce,
        });
        self.compiled.insert(key.clone(), idx);
        idx
    }

    fn plan_key(&mut self, key: &TypeKey) -> DiResult<usize> {
        if self.visiting.iter().any(|k| k == key) {
            return Err(DiError::Circular(self.chain_through(key)));
        }
        if let Some(&idx) = self.compiled.get(key) {
            return Ok(idx);
        }

        let frozen = self.frozen;
        if let Some(entry) = frozen.get(key) {
            return self.plan_registration(key, entry);
        }
        if let Some(value) = self.extras.get(key) {
            let value = value.clone();
            return Ok(self.install(key, Lifetime::Singleton, NodeKind::Instance(value), None));
        }

        // No registration: optional unwrap, then alias, then failure.
        if let Some(inner) = key.as_optional() {
            let inner = inner.clone();
            if self.is_registered(&inner) {
                return self.plan_key(&inner);
            }
            return Ok(self.install(key, Lifetime::Transient, NodeKind::Null, None));
        }
        if let TypeKey::Name(name) = key {
            if let Some(candidate) = frozen.aliases.single_candidate(name) {
                let candidate = candidate.clone();
                return self.plan_key(&candidate);
            }
        }
        Err(DiError::CannotResolveType(key.to_string()))
    }

    fn plan_registration(&mut self, key: &TypeKey, entry: &FrozenRegistration) -> DiResult<usize> {
        let registration = &entry.registration;
        match &registration.builder {
            Builder::Instance(value) => {
                let value = value.clone();
                Ok(self.install(
                    key,
                    registration.lifetime,
                    NodeKind::Instance(value),
                    registration.coerce.clone(),
                ))
            }
            Builder::Factory(factory) => {
                let factory = factory.clone();
                Ok(self.install(
                    key,
                    registration.lifetime,
                    NodeKind::Factory(factory),
                    registration.coerce.clone(),
                ))
            }
            Builder::ConcreteType(descriptor) => {
                let descriptor = descriptor.clone();
                let lifetime = registration.lifetime;
                let coerce = registration.coerce.clone();
                let locals = registration.locals.clone();
                self.visiting.push(key.clone());
                let result = self.plan_construct(key, lifetime, coerce, descriptor, locals);
                self.visiting.pop();
                result
            }
        }
    }

    fn plan_construct(
        &mut self,
        key: &TypeKey,
        lifetime: Lifetime,
        coerce: Option<CoerceFn>,
        descriptor: Arc<TypeDescriptor>,
        locals: Option<Arc<ScopeBindings>>,
    ) -> DiResult<usize> {
        let mut ctor_edges = Vec::with_capacity(descriptor.params.len());
        for param in &descriptor.params {
            let binding = match &param.dependency {
                Some(spec) => {
                    let child = self.resolve_spec(spec, &descriptor, locals.as_deref())?;
                    self.bind(&child)?
                }
                None => match self.frozen.aliases.single_candidate(param.name) {
                    Some(candidate) => {
                        let candidate = candidate.clone();
                        Binding::Node(self.plan_key(&candidate)?)
                    }
                    None if param.has_default => Binding::Default,
                    None => {
                        return Err(DiError::CannotResolveParameter {
                            parameter: param.name,
                            owner: descriptor.type_name.to_string(),
                            chain: self.chain(),
                        })
                    }
                },
            };
            ctor_edges.push(Edge {
                name: param.name,
                binding,
            });
        }

        let mut attr_edges = Vec::new();
        for attr in &descriptor.attrs {
            // Constructor wins over an attribute of the same name.
            if descriptor.params.iter().any(|p| p.name == attr.name) {
                continue;
            }
            let child = self.resolve_spec(&attr.dependency, &descriptor, locals.as_deref())?;
            let binding = self.bind(&child)?;
            attr_edges.push(Edge {
                name: attr.name,
                binding,
            });
        }

        Ok(self.install(
            key,
            lifetime,
            NodeKind::Construct {
                descriptor,
                ctor_edges,
                attr_edges,
            },
            coerce,
        ))
    }

    /// Binds an edge to a declared dependency key: registered keys plan
    /// directly, optional keys with an unregistered target bind to
    /// nothing, everything else goes through the normal key planning
    /// (which handles optional unwrapping and alias names).
    fn bind(&mut self, key: &TypeKey) -> DiResult<Binding> {
        if !self.is_registered(key) {
            if let Some(inner) = key.as_optional() {
                if !self.is_registered(inner) {
                    return Ok(Binding::None);
                }
            }
        }
        Ok(Binding::Node(self.plan_key(key)?))
    }

    fn resolve_spec(
        &self,
        spec: &DependencySpec,
        descriptor: &TypeDescriptor,
        locals: Option<&ScopeBindings>,
    ) -> DiResult<TypeKey> {
        match spec {
            DependencySpec::Key(key) => Ok(key.clone()),
            DependencySpec::Deferred(reference) => descriptor
                .locals
                .lookup(reference)
                .or_else(|| locals.and_then(|bindings| bindings.lookup(reference)))
                .cloned()
                .ok_or_else(|| DiError::FactoryMissingContext {
                    reference: (*reference).to_string(),
                    owner: descriptor.type_name.to_string(),
                }),
        }
    }
}
