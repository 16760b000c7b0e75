//! Internal implementation details.

mod ambient;

pub(crate) use ambient::{ambient_scope, pop_ambient, push_ambient};
