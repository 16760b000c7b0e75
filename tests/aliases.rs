use std::sync::Arc;

use wireplan::{
    Container, ContainerOptions, DiError, Injectable, TypeDescriptor, TypeKey,
};

struct ProductRepository {
    tag: &'static str,
}

impl Injectable for ProductRepository {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<ProductRepository>()
            .constructor(|_| Ok(ProductRepository { tag: "repo" }))
    }
}

// Consumer whose parameter has no type declaration; the alias table is
// the only way to satisfy it.
struct Handler {
    product_repository: Arc<ProductRepository>,
}

impl Injectable for Handler {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Handler>()
            .param_untyped("product_repository")
            .constructor(|args| {
                Ok(Handler {
                    product_repository: args.next()?,
                })
            })
    }
}

#[test]
fn snake_case_alias_satisfies_undeclared_parameter() {
    let mut container = Container::new();
    container.add_transient::<ProductRepository>().unwrap();
    container.add_transient::<Handler>().unwrap();

    let provider = container.build_provider();
    let handler = provider.get::<Handler>().unwrap();
    assert_eq!(handler.product_repository.tag, "repo");
}

#[test]
fn strict_mode_disables_derived_aliases() {
    let mut container = Container::with_options(ContainerOptions {
        strict: true,
        ..Default::default()
    });
    container.add_transient::<ProductRepository>().unwrap();
    container.add_transient::<Handler>().unwrap();

    let provider = container.build_provider();
    match provider.get::<Handler>() {
        Err(DiError::CannotResolveParameter { parameter, .. }) => {
            assert_eq!(parameter, "product_repository");
        }
        other => panic!("expected CannotResolveParameter, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn explicit_alias_works_in_strict_mode() {
    let mut container = Container::with_options(ContainerOptions {
        strict: true,
        ..Default::default()
    });
    container.add_transient::<ProductRepository>().unwrap();
    container.add_alias("product_repository", TypeKey::of::<ProductRepository>());
    container.add_transient::<Handler>().unwrap();

    let provider = container.build_provider();
    let handler = provider.get::<Handler>().unwrap();
    assert_eq!(handler.product_repository.tag, "repo");
}

#[test]
fn alias_for_interface_registration_uses_the_implementation_name() {
    trait Storage: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    struct DiskStorage;

    impl Storage for DiskStorage {
        fn kind(&self) -> &'static str {
            "disk"
        }
    }

    impl Injectable for DiskStorage {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<DiskStorage>()
                .provides::<dyn Storage, _>(|this| this as Arc<dyn Storage>)
                .constructor(|_| Ok(DiskStorage))
        }
    }

    // Undeclared parameter named after the implementation, not the
    // interface.
    struct Backup {
        storage: Arc<dyn Storage>,
    }

    impl Injectable for Backup {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Backup>()
                .param_untyped("disk_storage")
                .constructor(|args| {
                    Ok(Backup {
                        storage: args.next_trait()?,
                    })
                })
        }
    }

    let mut container = Container::new();
    container
        .add_transient_as::<dyn Storage, DiskStorage>()
        .unwrap();
    container.add_transient::<Backup>().unwrap();

    let provider = container.build_provider();
    let backup = provider.get::<Backup>().unwrap();
    assert_eq!(backup.storage.kind(), "disk");
}

#[test]
fn declared_parameter_never_uses_aliases() {
    struct Impostor;

    impl Injectable for Impostor {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Impostor>().constructor(|_| Ok(Impostor))
        }
    }

    struct Typed {
        repo: Arc<ProductRepository>,
    }

    impl Injectable for Typed {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Typed>()
                .param::<ProductRepository>("repo")
                .constructor(|args| Ok(Typed { repo: args.next()? }))
        }
    }

    let mut container = Container::new();
    container.add_transient::<Impostor>().unwrap();
    // An alias that would shadow the declared dependency if aliases were
    // ever consulted for typed parameters.
    container.add_alias("repo", TypeKey::of::<Impostor>());
    container.add_transient::<Typed>().unwrap();

    let provider = container.build_provider();
    // ProductRepository is unregistered; the declared type fails instead
    // of falling back to the 'repo' alias.
    match provider.get::<Typed>() {
        Err(DiError::CannotResolveType(name)) => {
            assert!(name.contains("ProductRepository"));
        }
        other => panic!("expected CannotResolveType, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn ambiguous_alias_does_not_resolve() {
    struct First;
    struct Second;

    impl Injectable for First {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<First>().constructor(|_| Ok(First))
        }
    }
    impl Injectable for Second {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Second>().constructor(|_| Ok(Second))
        }
    }

    struct Needy;

    impl Injectable for Needy {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Needy>()
                .param_untyped("worker")
                .constructor(|_| Ok(Needy))
        }
    }

    let mut container = Container::new();
    container.add_transient::<First>().unwrap();
    container.add_transient::<Second>().unwrap();
    container.add_alias("worker", TypeKey::of::<First>());
    container.add_alias("worker", TypeKey::of::<Second>());
    container.add_transient::<Needy>().unwrap();

    let provider = container.build_provider();
    assert!(matches!(
        provider.get::<Needy>(),
        Err(DiError::CannotResolveParameter { .. })
    ));
}

#[test]
fn name_key_resolves_through_the_alias_table() {
    let mut container = Container::new();
    container.add_transient::<ProductRepository>().unwrap();

    let provider = container.build_provider();
    let by_name = provider
        .get_keyed::<ProductRepository>(&TypeKey::name("product_repository"))
        .unwrap();
    assert_eq!(by_name.tag, "repo");

    // Unknown names fail with the offending name in the message.
    match provider.resolve(&TypeKey::name("nonexistent")) {
        Err(DiError::CannotResolveType(name)) => assert!(name.contains("nonexistent")),
        other => panic!("expected CannotResolveType, got {:?}", other.map(|_| ())),
    }
}
