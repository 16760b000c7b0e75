//! # wireplan
//!
//! Non-intrusive, plan-compiling dependency injection for Rust.
//!
//! ## Features
//!
//! - **Non-intrusive**: registered types carry no container markers; each
//!   type's wiring lives in a separate [`TypeDescriptor`]
//! - **Compiled activation plans**: the full dependency graph of a key is
//!   analyzed once, up front — missing registrations, unresolvable
//!   parameters, and cycles fail before anything is constructed
//! - **Three lifetimes**: Singleton, Scoped, and Transient services
//! - **Structural keys**: parameterized generics, union and optional
//!   keys, collection keys, and name aliases, all distinct by identity
//! - **Circular dependency detection**: structural cycles at plan time,
//!   factory re-entrancy at activation time, both with full paths
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use wireplan::{Container, Injectable, TypeDescriptor};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Injectable for Database {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::of::<Database>().constructor(|_| {
//!             Ok(Database {
//!                 url: "postgres://localhost".to_string(),
//!             })
//!         })
//!     }
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
//!
//! # fn main() -> wireplan::DiResult<()> {
//! let mut container = Container::new();
//! container.add_singleton::<Database>()?;
//! container.add_transient::<UserService>()?;
//!
//! let provider = container.build_provider();
//! let service = provider.get::<UserService>()?;
//! assert_eq!(service.db.url, "postgres://localhost");
//! # Ok(())
//! # }
//! ```
//!
//! ## Service lifetimes
//!
//! - **Singleton**: created once per provider and shared everywhere
//! - **Scoped**: one instance per [`ActivationScope`] (ideal for request
//!   contexts); a root `get` uses a fresh per-call scope
//! - **Transient**: created fresh on every resolution
//!
//! ## Interface resolution
//!
//! A concrete type declares the interfaces it can stand in for on its
//! descriptor; registration under an interface key then coerces
//! automatically:
//!
//! ```rust
//! use std::sync::Arc;
//! use wireplan::{Container, Injectable, TypeDescriptor};
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("[LOG] {}", message);
//!     }
//! }
//!
//! impl Injectable for ConsoleLogger {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::of::<ConsoleLogger>()
//!             .provides::<dyn Logger, _>(|logger| logger as Arc<dyn Logger>)
//!             .constructor(|_| Ok(ConsoleLogger))
//!     }
//! }
//!
//! # fn main() -> wireplan::DiResult<()> {
//! let mut container = Container::new();
//! container.add_transient_as::<dyn Logger, ConsoleLogger>()?;
//!
//! let provider = container.build_provider();
//! let logger = provider.get_trait::<dyn Logger>()?;
//! logger.log("resolved through the interface key");
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod container;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod observer;
pub mod provider;
pub mod registration;

// Internal modules
mod alias;
mod internal;
mod planner;

// Re-export core types
pub use container::{Container, ContainerOptions, RegistrationInfo, ScopeMode};
pub use descriptors::{
    DependencySpec, DescriptorBuilder, Injectable, Resolved, ResolvedArgs, ScopeBindings,
    TypeDescriptor,
};
pub use error::{DiError, DiResult};
pub use key::{CollectionKind, TypeKey};
pub use lifetime::Lifetime;
pub use observer::{DiObserver, LoggingObserver};
pub use provider::{ActivationScope, Provider};
pub use registration::{AnyArc, Builder, BuilderKind, Factory, Registration};
