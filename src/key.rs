//! Type keys identifying registrations in the container.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Canonical identity under which a service is registered and looked up.
///
/// Keys are value types: cheap to clone, hashable, and structurally
/// comparable. Lookup never narrows or widens a key — a request for
/// `Concrete(T)` does not match a registration under `Union` or
/// `Parameterized` forms of `T`, and vice versa.
///
/// # Key forms
///
/// - **Concrete**: a single Rust type (including `dyn Trait` objects)
/// - **Parameterized**: an erased base type plus an argument tuple,
///   compared structurally
/// - **Variable**: a free type-variable placeholder inside a
///   parameterized argument tuple; equal only to an identical placeholder
/// - **Union**: an unordered set of keys treated as one key
/// - **Collection**: a container shape over an element key, satisfied as
///   a whole by a factory or instance
/// - **Name**: a string alias, consulted only when a dependency site has
///   no type declaration
/// - **Nothing**: the none-sentinel; `Union([T, Nothing])` is the
///   optional form of `T`
#[derive(Debug, Clone)]
pub enum TypeKey {
    /// Concrete type key with TypeId and name for diagnostics.
    Concrete(TypeId, &'static str),
    /// Parameterized generic form: erased base plus argument keys.
    Parameterized(TypeId, &'static str, Box<[TypeKey]>),
    /// Free type-variable placeholder, matched only against itself.
    Variable(&'static str),
    /// Unordered set of member keys; stored sorted and deduplicated so
    /// that set equality is plain structural equality.
    Union(Box<[TypeKey]>),
    /// Recognized container shape over an element key.
    Collection(CollectionKind, Box<TypeKey>),
    /// String alias key, used as fallback for undeclared dependency sites.
    Name(Box<str>),
    /// The none-sentinel member of optional unions.
    Nothing,
}

/// Container shapes recognized for [`TypeKey::Collection`] keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKind {
    /// Ordered sequence (`Vec`-like).
    Sequence,
    /// Unordered set.
    Set,
    /// Key-value mapping.
    Mapping,
    /// Lazily produced iterable.
    Iterable,
    /// Fixed-arity tuple.
    Tuple,
}

impl TypeKey {
    /// Key for a concrete Rust type. Works for trait objects too:
    /// `TypeKey::of::<dyn Logger>()`.
    pub fn of<T: ?Sized + 'static>() -> TypeKey {
        TypeKey::Concrete(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Parameterized form of a base type with the given argument keys.
    pub fn parameterized<B: ?Sized + 'static>(args: impl IntoIterator<Item = TypeKey>) -> TypeKey {
        TypeKey::Parameterized(
            TypeId::of::<B>(),
            std::any::type_name::<B>(),
            args.into_iter().collect(),
        )
    }

    /// Free type-variable placeholder for parameterized argument tuples.
    pub fn variable(name: &'static str) -> TypeKey {
        TypeKey::Variable(name)
    }

    /// Union of member keys. Members are sorted and deduplicated, so
    /// member order carries no meaning.
    pub fn union(members: impl IntoIterator<Item = TypeKey>) -> TypeKey {
        let mut members: Vec<TypeKey> = members.into_iter().collect();
        members.sort();
        members.dedup();
        TypeKey::Union(members.into_boxed_slice())
    }

    /// Optional form of a key: `Union([key, Nothing])`.
    pub fn optional(key: TypeKey) -> TypeKey {
        TypeKey::union([key, TypeKey::Nothing])
    }

    /// Collection key over an element key.
    pub fn collection(kind: CollectionKind, element: TypeKey) -> TypeKey {
        TypeKey::Collection(kind, Box::new(element))
    }

    /// String alias key.
    pub fn name(name: impl Into<String>) -> TypeKey {
        TypeKey::Name(name.into().into_boxed_str())
    }

    /// Returns the inner key when `self` is the optional form
    /// `Union([inner, Nothing])`.
    pub fn as_optional(&self) -> Option<&TypeKey> {
        match self {
            TypeKey::Union(members) if members.len() == 2 => {
                match members.iter().position(|m| matches!(m, TypeKey::Nothing)) {
                    Some(i) => Some(&members[1 - i]),
                    None => None,
                }
            }
            _ => None,
        }
    }

    /// Whether this key is the none-sentinel.
    pub fn is_nothing(&self) -> bool {
        matches!(self, TypeKey::Nothing)
    }

    fn rank(&self) -> u8 {
        match self {
            TypeKey::Concrete(..) => 0,
            TypeKey::Parameterized(..) => 1,
            TypeKey::Variable(_) => 2,
            TypeKey::Union(_) => 3,
            TypeKey::Collection(..) => 4,
            TypeKey::Name(_) => 5,
            TypeKey::Nothing => 6,
        }
    }
}

// TypeId-first equality: diagnostic names never participate.
impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeKey::Concrete(a, _), TypeKey::Concrete(b, _)) => a == b,
            (TypeKey::Parameterized(a, _, xs), TypeKey::Parameterized(b, _, ys)) => {
                a == b && xs == ys
            }
            (TypeKey::Variable(a), TypeKey::Variable(b)) => a == b,
            (TypeKey::Union(xs), TypeKey::Union(ys)) => xs == ys,
            (TypeKey::Collection(ka, ea), TypeKey::Collection(kb, eb)) => ka == kb && ea == eb,
            (TypeKey::Name(a), TypeKey::Name(b)) => a == b,
            (TypeKey::Nothing, TypeKey::Nothing) => true,
            _ => false,
        }
    }
}

impl Eq for TypeKey {}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TypeKey::Concrete(a, _), TypeKey::Concrete(b, _)) => a.cmp(b),
            (TypeKey::Parameterized(a, _, xs), TypeKey::Parameterized(b, _, ys)) => {
                a.cmp(b).then_with(|| xs.cmp(ys))
            }
            (TypeKey::Variable(a), TypeKey::Variable(b)) => a.cmp(b),
            (TypeKey::Union(xs), TypeKey::Union(ys)) => xs.cmp(ys),
            (TypeKey::Collection(ka, ea), TypeKey::Collection(kb, eb)) => {
                ka.cmp(kb).then_with(|| ea.cmp(eb))
            }
            (TypeKey::Name(a), TypeKey::Name(b)) => a.cmp(b),
            (TypeKey::Nothing, TypeKey::Nothing) => Ordering::Equal,
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            TypeKey::Concrete(id, _) => id.hash(state),
            TypeKey::Parameterized(id, _, args) => {
                id.hash(state);
                args.hash(state);
            }
            TypeKey::Variable(name) => name.hash(state),
            TypeKey::Union(members) => members.hash(state),
            TypeKey::Collection(kind, element) => {
                kind.hash(state);
                element.hash(state);
            }
            TypeKey::Name(name) => name.hash(state),
            TypeKey::Nothing => {}
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Concrete(_, name) => f.write_str(name),
            TypeKey::Parameterized(_, name, args) => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            TypeKey::Variable(name) => write!(f, "${}", name),
            TypeKey::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", m)?;
                }
                Ok(())
            }
            TypeKey::Collection(kind, element) => write!(f, "{:?}<{}>", kind, element),
            TypeKey::Name(name) => write!(f, "'{}'", name),
            TypeKey::Nothing => f.write_str("None"),
        }
    }
}
