//! Plan execution: the activator.
//!
//! Executes a compiled [`ActivationPlan`] against an
//! [`ActivationScope`], honoring lifetime policies. Construction order
//! is a post-order traversal of the plan: constructor edges in
//! declaration order, then attribute edges.

use crate::descriptors::{Resolved, ResolvedArgs};
use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::planner::{ActivationPlan, Binding, Edge, NodeKind, PlanNode};
use crate::registration::AnyArc;

use super::ActivationScope;

pub(crate) fn execute(plan: &ActivationPlan, scope: &ActivationScope) -> DiResult<Option<AnyArc>> {
    // The nearest enclosing activation (a factory that re-entered the
    // container) is the activating type for the root node.
    let parent = scope.activating_type();
    activate(plan, plan.root, scope, parent.as_ref())
}

fn activate(
    plan: &ActivationPlan,
    idx: usize,
    scope: &ActivationScope,
    parent: Option<&TypeKey>,
) -> DiResult<Option<AnyArc>> {
    let node = &plan.nodes[idx];
    if matches!(node.kind, NodeKind::Null) {
        return Ok(None);
    }

    match node.lifetime {
        Lifetime::Singleton => {
            if let Some(cell) = scope.provider().singleton_cell(&node.key) {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                let value = build(plan, node, scope, parent)?;
                return Ok(cell.get_or_init(|| value.clone()).clone());
            }
            // Singletons added through Provider::set have no frozen slot;
            // they are instances and need no caching.
            build(plan, node, scope, parent)
        }
        Lifetime::Scoped => {
            if let Some(value) = scope.scoped_get(&node.key) {
                return Ok(value);
            }
            let value = build(plan, node, scope, parent)?;
            scope.scoped_store(node.key.clone(), value.clone());
            Ok(value)
        }
        Lifetime::Transient => build(plan, node, scope, parent),
    }
}

fn build(
    plan: &ActivationPlan,
    node: &PlanNode,
    scope: &ActivationScope,
    parent: Option<&TypeKey>,
) -> DiResult<Option<AnyArc>> {
    scope.enter(&node.key)?;
    let result = build_inner(plan, node, scope, parent);
    scope.exit();

    match (result?, &node.coerce) {
        (Some(value), Some(coerce)) => coerce(value).map(Some),
        (value, _) => Ok(value),
    }
}

fn build_inner(
    plan: &ActivationPlan,
    node: &PlanNode,
    scope: &ActivationScope,
    parent: Option<&TypeKey>,
) -> DiResult<Option<AnyArc>> {
    match &node.kind {
        NodeKind::Null => Ok(None),
        NodeKind::Instance(value) => Ok(Some(value.clone())),
        NodeKind::Factory(factory) => factory.invoke(scope, parent),
        NodeKind::Construct {
            descriptor,
            ctor_edges,
            attr_edges,
        } => {
            let mut values = Vec::with_capacity(ctor_edges.len());
            for edge in ctor_edges {
                values.push(resolve_edge(plan, edge, scope, &node.key)?);
            }
            let mut args = ResolvedArgs::new(values);
            let mut built = (descriptor.construct)(&mut args)?;

            for edge in attr_edges {
                let value = resolve_edge(plan, edge, scope, &node.key)?;
                let setter = descriptor
                    .attr_setter(edge.name)
                    .ok_or_else(|| DiError::TypeMismatch(descriptor.type_name().to_string()))?;
                setter(built.as_mut(), value)?;
            }

            (descriptor.seal)(built).map(Some)
        }
    }
}

fn resolve_edge(
    plan: &ActivationPlan,
    edge: &Edge,
    scope: &ActivationScope,
    parent: &TypeKey,
) -> DiResult<Resolved> {
    Ok(match edge.binding {
        Binding::Node(child) => match activate(plan, child, scope, Some(parent))? {
            Some(value) => Resolved::Value(value),
            None => Resolved::None,
        },
        Binding::None => Resolved::None,
        Binding::Default => Resolved::Default,
    })
}
