use std::sync::Arc;

use wireplan::{Container, DiError, Injectable, TypeDescriptor};

struct Chicken {
    egg: Option<Arc<Egg>>,
}

struct Egg {
    chicken: Option<Arc<Chicken>>,
}

impl Injectable for Chicken {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Chicken>()
            .attr::<Egg, _>("egg", |c, e| c.egg = Some(e))
            .constructor(|_| Ok(Chicken { egg: None }))
    }
}

impl Injectable for Egg {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Egg>()
            .attr::<Chicken, _>("chicken", |e, c| e.chicken = Some(c))
            .constructor(|_| Ok(Egg { chicken: None }))
    }
}

#[test]
fn structural_cycle_is_detected_at_plan_time() {
    let mut container = Container::new();
    container.add_transient::<Chicken>().unwrap();
    container.add_transient::<Egg>().unwrap();

    let provider = container.build_provider();
    match provider.get::<Chicken>() {
        Err(DiError::Circular(path)) => {
            assert!(path.iter().any(|k| k.contains("Chicken")));
            assert!(path.iter().any(|k| k.contains("Egg")));
            // The cycle closes on the revisited key.
            assert_eq!(path.first(), path.last());
        }
        other => panic!("expected Circular, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn cycle_is_detected_for_any_lifetime() {
    let mut container = Container::new();
    container.add_singleton::<Chicken>().unwrap();
    container.add_scoped::<Egg>().unwrap();

    let provider = container.build_provider();
    assert!(matches!(
        provider.get::<Egg>(),
        Err(DiError::Circular(_))
    ));
}

#[test]
fn self_referencing_factory_fails_at_activation() {
    use std::sync::Mutex;

    struct SelfReferencing;

    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();

    let mut container = Container::new();
    container
        .add_transient_factory::<SelfReferencing, _>(move |scope| {
            // The planner cannot see through factories; the activation
            // stack catches the re-entry instead.
            if let Err(error) = scope.get::<SelfReferencing>() {
                *seen_clone.lock().unwrap() = Some(error);
            }
            SelfReferencing
        })
        .unwrap();

    let provider = container.build_provider();
    let scope = provider.create_scope();
    scope.get::<SelfReferencing>().unwrap();

    let observed = seen.lock().unwrap().take();
    match observed {
        Some(DiError::Circular(path)) => {
            assert_eq!(path.len(), 2);
            assert!(path[0].contains("SelfReferencing"));
            assert!(path[1].contains("SelfReferencing"));
        }
        other => panic!("expected Circular, got {:?}", other),
    }
}

#[test]
fn factory_cycle_reports_both_keys() {
    use std::sync::Mutex;

    struct X;
    struct Y;

    let seen = Arc::new(Mutex::new(None));
    let seen_x = seen.clone();

    let mut container = Container::new();
    container
        .add_transient_factory::<Y, _>(move |scope| {
            if let Err(error) = scope.get::<X>() {
                *seen_x.lock().unwrap() = Some(error);
            }
            Y
        })
        .unwrap();
    container
        .add_transient_factory::<X, _>(|scope| {
            scope.get::<Y>().unwrap();
            X
        })
        .unwrap();

    let provider = container.build_provider();
    let scope = provider.create_scope();
    scope.get::<X>().unwrap();

    let observed = seen.lock().unwrap().take();
    match observed {
        Some(DiError::Circular(path)) => {
            assert!(path.iter().any(|k| k.contains("::X")));
            assert!(path.iter().any(|k| k.contains("::Y")));
        }
        other => panic!("expected Circular, got {:?}", other),
    }
}

#[test]
fn diamond_dependencies_are_not_cycles() {
    struct Leaf;
    struct Left {
        leaf: Arc<Leaf>,
    }
    struct Right {
        leaf: Arc<Leaf>,
    }
    struct Root {
        left: Arc<Left>,
        right: Arc<Right>,
    }

    impl Injectable for Leaf {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Leaf>().constructor(|_| Ok(Leaf))
        }
    }
    impl Injectable for Left {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Left>()
                .param::<Leaf>("leaf")
                .constructor(|args| Ok(Left { leaf: args.next()? }))
        }
    }
    impl Injectable for Right {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Right>()
                .param::<Leaf>("leaf")
                .constructor(|args| Ok(Right { leaf: args.next()? }))
        }
    }
    impl Injectable for Root {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Root>()
                .param::<Left>("left")
                .param::<Right>("right")
                .constructor(|args| {
                    Ok(Root {
                        left: args.next()?,
                        right: args.next()?,
                    })
                })
        }
    }

    let mut container = Container::new();
    container.add_scoped::<Leaf>().unwrap();
    container.add_transient::<Left>().unwrap();
    container.add_transient::<Right>().unwrap();
    container.add_transient::<Root>().unwrap();

    let provider = container.build_provider();
    let scope = provider.create_scope();
    let root = scope.get::<Root>().unwrap();

    // Shared subgraph: the scoped leaf is one instance on both sides.
    assert!(Arc::ptr_eq(&root.left.leaf, &root.right.leaf));
}
