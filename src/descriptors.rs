//! Compile-time dependency descriptors for injectable types.
//!
//! Rust has no runtime reflection, so types describe their own wiring: a
//! [`TypeDescriptor`] lists the constructor parameters and
//! post-construction attribute assignments of a concrete type, together
//! with a typed construct closure. The planner consumes descriptors to
//! build activation plans; the described types themselves stay untouched
//! (no container-specific trait bounds, no markers on the type itself).
//!
//! ```
//! use std::sync::Arc;
//! use wireplan::{Injectable, TypeDescriptor};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserService {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::of::<UserService>()
//!             .param::<Database>("db")
//!             .constructor(|args| Ok(UserService { db: args.next()? }))
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registration::AnyArc;

/// Types that carry a dependency descriptor.
///
/// Implementing this trait is the only thing the container asks of a
/// registered concrete type, and the implementation lives next to the
/// registration code, not on the type itself.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// The wiring descriptor for this type.
    fn descriptor() -> TypeDescriptor;
}

/// How a single dependency site names what it needs.
#[derive(Debug, Clone)]
pub enum DependencySpec {
    /// A fully specified key.
    Key(TypeKey),
    /// A deferred (string) reference, resolved at planning time against
    /// the descriptor's local bindings, then the registration's captured
    /// bindings.
    Deferred(&'static str),
}

/// One constructor parameter of a described type.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub(crate) name: &'static str,
    pub(crate) dependency: Option<DependencySpec>,
    pub(crate) has_default: bool,
}

/// Local name bindings used to resolve deferred references.
#[derive(Debug, Default, Clone)]
pub struct ScopeBindings {
    entries: HashMap<&'static str, TypeKey>,
}

impl ScopeBindings {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a name to a key.
    pub fn bind(mut self, name: &'static str, key: TypeKey) -> Self {
        self.entries.insert(name, key);
        self
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&TypeKey> {
        self.entries.get(name)
    }
}

/// A dependency value handed to construct closures and attribute setters.
pub enum Resolved {
    /// A materialized dependency.
    Value(AnyArc),
    /// An optional dependency whose target produced nothing.
    None,
    /// An omitted edge; the parameter's declared default supplies the
    /// value.
    Default,
}

impl Resolved {
    /// Downcasts a required concrete dependency.
    pub fn required<T: Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        match self {
            Resolved::Value(v) => v
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            _ => Err(DiError::CannotResolveType(
                std::any::type_name::<T>().to_string(),
            )),
        }
    }

    /// Downcasts a required trait-object dependency registered through an
    /// interface coercion.
    pub fn required_trait<T: ?Sized + Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        match self {
            Resolved::Value(v) => v
                .downcast::<Arc<T>>()
                .map(|wrapped| (*wrapped).clone())
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            _ => Err(DiError::CannotResolveType(
                std::any::type_name::<T>().to_string(),
            )),
        }
    }

    /// Downcasts an optional dependency; `None` and `Default` become
    /// `Ok(None)`.
    pub fn optional<T: Send + Sync + 'static>(self) -> DiResult<Option<Arc<T>>> {
        match self {
            Resolved::Value(v) => v
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            Resolved::None | Resolved::Default => Ok(None),
        }
    }

    /// The raw type-erased value, if any.
    pub fn raw(self) -> Option<AnyArc> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this dependency produced nothing.
    pub fn is_none(&self) -> bool {
        matches!(self, Resolved::None)
    }
}

/// Positional dependency values for a construct closure, one per
/// declared parameter, in declaration order.
pub struct ResolvedArgs {
    values: std::vec::IntoIter<Resolved>,
}

impl ResolvedArgs {
    pub(crate) fn new(values: Vec<Resolved>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// The next positional value, raw.
    pub fn next_arg(&mut self) -> Resolved {
        self.values.next().unwrap_or(Resolved::Default)
    }

    /// The next positional value as a required concrete dependency.
    pub fn next<T: Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        self.next_arg().required()
    }

    /// The next positional value as a required trait-object dependency.
    pub fn next_trait<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        self.next_arg().required_trait()
    }

    /// The next positional value as an optional dependency.
    pub fn next_optional<T: Send + Sync + 'static>(&mut self) -> DiResult<Option<Arc<T>>> {
        self.next_arg().optional()
    }

    /// The next positional value, falling back to `default` when the
    /// edge was omitted in favor of the parameter's default.
    pub fn next_or_else<T, F>(&mut self, default: F) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.next_arg() {
            Resolved::Default => Ok(Arc::new(default())),
            other => other.required(),
        }
    }
}

type BoxedAny = Box<dyn Any + Send + Sync>;
type ConstructFn = Arc<dyn Fn(&mut ResolvedArgs) -> DiResult<BoxedAny> + Send + Sync>;
type SealFn = Arc<dyn Fn(BoxedAny) -> DiResult<AnyArc> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Resolved) -> DiResult<()> + Send + Sync>;
pub(crate) type CoerceFn = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// One post-construction attribute assignment of a described type.
#[derive(Clone)]
pub struct AttrSpec {
    pub(crate) name: &'static str,
    pub(crate) dependency: DependencySpec,
    pub(crate) setter: SetterFn,
}

#[derive(Clone)]
pub(crate) struct ProvidesEntry {
    pub(crate) id: TypeId,
    #[allow(dead_code)]
    pub(crate) name: &'static str,
    pub(crate) coerce: CoerceFn,
}

/// The wiring descriptor of a concrete type: ordered constructor
/// parameters, attribute assignments, a construct closure, and the
/// interfaces the type can be registered under.
#[derive(Clone)]
pub struct TypeDescriptor {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) attrs: Vec<AttrSpec>,
    pub(crate) construct: ConstructFn,
    pub(crate) seal: SealFn,
    pub(crate) provides: Vec<ProvidesEntry>,
    pub(crate) locals: ScopeBindings,
}

impl TypeDescriptor {
    /// Starts describing a type. Finish with
    /// [`constructor`](DescriptorBuilder::constructor).
    pub fn of<T: Send + Sync + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            params: Vec::new(),
            attrs: Vec::new(),
            provides: Vec::new(),
            locals: ScopeBindings::new(),
            _marker: PhantomData,
        }
    }

    /// The described type's diagnostic name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn coercion_for(&self, id: TypeId) -> Option<CoerceFn> {
        self.provides
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.coerce.clone())
    }

    pub(crate) fn attr_setter(&self, name: &str) -> Option<&SetterFn> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.setter)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("params", &self.params.len())
            .field("attrs", &self.attrs.len())
            .finish()
    }
}

/// Fluent builder for [`TypeDescriptor`]s.
pub struct DescriptorBuilder<T> {
    params: Vec<ParamSpec>,
    attrs: Vec<AttrSpec>,
    provides: Vec<ProvidesEntry>,
    locals: ScopeBindings,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    /// A constructor parameter with a declared concrete (or trait-object)
    /// dependency type.
    pub fn param<D: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.param_key(name, TypeKey::of::<D>())
    }

    /// A constructor parameter with an optional dependency type.
    pub fn param_optional<D: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.param_key(name, TypeKey::optional(TypeKey::of::<D>()))
    }

    /// A constructor parameter with an explicit key (union,
    /// parameterized, collection, name).
    pub fn param_key(mut self, name: &'static str, key: TypeKey) -> Self {
        self.params.push(ParamSpec {
            name,
            dependency: Some(DependencySpec::Key(key)),
            has_default: false,
        });
        self
    }

    /// A constructor parameter declared through a deferred (string)
    /// reference, resolved against local bindings at planning time.
    pub fn param_deferred(mut self, name: &'static str, reference: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            dependency: Some(DependencySpec::Deferred(reference)),
            has_default: false,
        });
        self
    }

    /// A constructor parameter without a type declaration; satisfied
    /// through the alias table by parameter name.
    pub fn param_untyped(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            dependency: None,
            has_default: false,
        });
        self
    }

    /// An untyped constructor parameter with a default; when no alias
    /// candidate matches, the edge is omitted and the construct closure
    /// supplies the default.
    pub fn param_defaulted(mut self, name: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            dependency: None,
            has_default: true,
        });
        self
    }

    /// A required attribute assignment applied after construction.
    pub fn attr<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
    {
        self.attr_key(name, TypeKey::of::<V>(), move |target, value| {
            set(target, value.required::<V>()?);
            Ok(())
        })
    }

    /// A required trait-object attribute assignment.
    pub fn attr_trait<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
    {
        self.attr_key(name, TypeKey::of::<V>(), move |target, value| {
            set(target, value.required_trait::<V>()?);
            Ok(())
        })
    }

    /// An optional attribute assignment; the setter receives `None` when
    /// the dependency is not registered.
    pub fn attr_optional<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&mut T, Option<Arc<V>>) + Send + Sync + 'static,
    {
        self.attr_key(
            name,
            TypeKey::optional(TypeKey::of::<V>()),
            move |target, value| {
                set(target, value.optional::<V>()?);
                Ok(())
            },
        )
    }

    /// An attribute assignment under an explicit key, with full control
    /// over the received value.
    pub fn attr_key<F>(mut self, name: &'static str, key: TypeKey, set: F) -> Self
    where
        F: Fn(&mut T, Resolved) -> DiResult<()> + Send + Sync + 'static,
    {
        self.attrs.push(AttrSpec {
            name,
            dependency: DependencySpec::Key(key),
            setter: erase_setter::<T, F>(set),
        });
        self
    }

    /// An attribute assignment declared through a deferred (string)
    /// reference.
    pub fn attr_deferred<F>(mut self, name: &'static str, reference: &'static str, set: F) -> Self
    where
        F: Fn(&mut T, Resolved) -> DiResult<()> + Send + Sync + 'static,
    {
        self.attrs.push(AttrSpec {
            name,
            dependency: DependencySpec::Deferred(reference),
            setter: erase_setter::<T, F>(set),
        });
        self
    }

    /// Declares that this type can be registered under the interface `I`,
    /// supplying the coercion from the concrete instance.
    pub fn provides<I, F>(mut self, coerce: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.provides.push(ProvidesEntry {
            id: TypeId::of::<I>(),
            name: std::any::type_name::<I>(),
            coerce: Arc::new(move |any: AnyArc| {
                let concrete = any
                    .downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))?;
                Ok(Arc::new(coerce(concrete)) as AnyArc)
            }),
        });
        self
    }

    /// Binds a local name for deferred references declared on this
    /// descriptor.
    pub fn bind_local(mut self, name: &'static str, key: TypeKey) -> Self {
        self.locals = self.locals.bind(name, key);
        self
    }

    /// Supplies the construct closure and finishes the descriptor. The
    /// closure pulls one value per declared parameter, in declaration
    /// order.
    pub fn constructor<F>(self, construct: F) -> TypeDescriptor
    where
        F: Fn(&mut ResolvedArgs) -> DiResult<T> + Send + Sync + 'static,
    {
        TypeDescriptor {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            params: self.params,
            attrs: self.attrs,
            construct: Arc::new(move |args| {
                construct(args).map(|value| Box::new(value) as BoxedAny)
            }),
            seal: Arc::new(|boxed| {
                boxed
                    .downcast::<T>()
                    .map(|value| Arc::new(*value) as AnyArc)
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
            }),
            provides: self.provides,
            locals: self.locals,
        }
    }
}

fn erase_setter<T, F>(set: F) -> SetterFn
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, Resolved) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(move |obj, value| {
        let target = obj
            .downcast_mut::<T>()
            .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))?;
        set(target, value)
    })
}
