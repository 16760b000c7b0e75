use std::sync::Arc;

use wireplan::{Container, DiError, Injectable, Lifetime, Registration, TypeDescriptor, TypeKey};

struct Product;
struct Customer;

// The erased base: one concrete type serves every parameterization.
struct Repo {
    table: &'static str,
}

impl Injectable for Repo {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Repo>().constructor(|_| Ok(Repo { table: "rows" }))
    }
}

fn product_repo_key() -> TypeKey {
    TypeKey::parameterized::<Repo>([TypeKey::of::<Product>()])
}

fn customer_repo_key() -> TypeKey {
    TypeKey::parameterized::<Repo>([TypeKey::of::<Customer>()])
}

#[test]
fn parameterizations_are_distinct_registrations() {
    let mut container = Container::new();
    container
        .register(
            product_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Transient),
        )
        .unwrap();
    container
        .register(
            customer_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Transient),
        )
        .unwrap();

    let provider = container.build_provider();
    let products = provider.get_keyed::<Repo>(&product_repo_key()).unwrap();
    let customers = provider.get_keyed::<Repo>(&customer_repo_key()).unwrap();

    // Both are instances of the erased base type.
    assert_eq!(products.table, "rows");
    assert_eq!(customers.table, "rows");
    assert!(!Arc::ptr_eq(&products, &customers));
}

#[test]
fn parameterized_singletons_cache_per_key() {
    let mut container = Container::new();
    container
        .register(
            product_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Singleton),
        )
        .unwrap();
    container
        .register(
            customer_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Singleton),
        )
        .unwrap();

    let provider = container.build_provider();
    let p1 = provider.get_keyed::<Repo>(&product_repo_key()).unwrap();
    let p2 = provider.get_keyed::<Repo>(&product_repo_key()).unwrap();
    let c1 = provider.get_keyed::<Repo>(&customer_repo_key()).unwrap();

    assert!(Arc::ptr_eq(&p1, &p2));
    assert!(!Arc::ptr_eq(&p1, &c1));
}

#[test]
fn erased_base_is_not_a_fallback() {
    let mut container = Container::new();
    container
        .register(
            product_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Transient),
        )
        .unwrap();

    let provider = container.build_provider();

    // The plain concrete key was never registered.
    assert!(matches!(
        provider.get::<Repo>(),
        Err(DiError::CannotResolveType(_))
    ));
    // Nor does a plain registration satisfy a parameterized request.
    assert!(matches!(
        provider.resolve(&customer_repo_key()),
        Err(DiError::CannotResolveType(_))
    ));
}

#[test]
fn free_variable_keys_match_only_exactly() {
    let open_key = TypeKey::parameterized::<Repo>([TypeKey::variable("T")]);

    let mut container = Container::new();
    container
        .register(
            open_key.clone(),
            Registration::concrete::<Repo>(Lifetime::Transient),
        )
        .unwrap();

    let provider = container.build_provider();

    // The identical placeholder form resolves.
    assert!(provider.get_keyed::<Repo>(&open_key).is_ok());
    // A concrete substitution is a different key; no substitution is
    // attempted during lookup.
    assert!(matches!(
        provider.resolve(&product_repo_key()),
        Err(DiError::CannotResolveType(_))
    ));
}

#[test]
fn parameterized_dependency_site() {
    struct Catalog {
        repo: Arc<Repo>,
    }

    impl Injectable for Catalog {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::of::<Catalog>()
                .param_key(
                    "repo",
                    TypeKey::parameterized::<Repo>([TypeKey::of::<Product>()]),
                )
                .constructor(|args| Ok(Catalog { repo: args.next()? }))
        }
    }

    let mut container = Container::new();
    container
        .register(
            product_repo_key(),
            Registration::concrete::<Repo>(Lifetime::Singleton),
        )
        .unwrap();
    container.add_transient::<Catalog>().unwrap();

    let provider = container.build_provider();
    let catalog = provider.get::<Catalog>().unwrap();
    let direct = provider.get_keyed::<Repo>(&product_repo_key()).unwrap();
    assert!(Arc::ptr_eq(&catalog.repo, &direct));
}
