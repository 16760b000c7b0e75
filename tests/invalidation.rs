use std::sync::Arc;

use wireplan::{Container, DiError, Injectable, TypeDescriptor, TypeKey};

struct Settings {
    env: &'static str,
}

impl Injectable for Settings {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Settings>().constructor(|_| Ok(Settings { env: "dev" }))
    }
}

struct App {
    settings: Arc<Settings>,
}

impl Injectable for App {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<App>()
            .param::<Settings>("settings")
            .constructor(|args| {
                Ok(App {
                    settings: args.next()?,
                })
            })
    }
}

#[test]
fn mutation_after_resolution_discards_plans_and_singletons() {
    let mut container = Container::new();
    container.add_singleton::<Settings>().unwrap();

    let before = container.get::<Settings>().unwrap();
    assert_eq!(before.env, "dev");

    // Replace the registration; the next resolve must rebuild plans and
    // drop the cached singleton.
    container
        .register_override(
            TypeKey::of::<Settings>(),
            wireplan::Registration::factory(
                wireplan::Lifetime::Singleton,
                wireplan::Factory::new::<Settings, _>(|_| Settings { env: "prod" }),
            ),
        )
        .unwrap();

    let after = container.get::<Settings>().unwrap();
    assert_eq!(after.env, "prod");
    assert!(!Arc::ptr_eq(&before, &after));
}

#[test]
fn extension_after_resolution_is_visible() {
    let mut container = Container::new();
    container.add_singleton::<Settings>().unwrap();

    // App is not registered yet.
    assert!(matches!(
        container.get::<App>(),
        Err(DiError::CannotResolveType(_))
    ));

    container.add_transient::<App>().unwrap();
    let app = container.get::<App>().unwrap();
    assert_eq!(app.settings.env, "dev");
}

#[test]
fn unchanged_generation_keeps_singletons() {
    let mut container = Container::new();
    container.add_singleton::<Settings>().unwrap();

    let a = container.get::<Settings>().unwrap();
    let b = container.get::<Settings>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn built_provider_is_independent_of_later_mutations() {
    let mut container = Container::new();
    container.add_singleton::<Settings>().unwrap();

    let provider = container.build_provider();
    let before = provider.get::<Settings>().unwrap();

    container
        .register_override(
            TypeKey::of::<Settings>(),
            wireplan::Registration::factory(
                wireplan::Lifetime::Singleton,
                wireplan::Factory::new::<Settings, _>(|_| Settings { env: "prod" }),
            ),
        )
        .unwrap();

    // The frozen snapshot still serves the original singleton.
    let after = provider.get::<Settings>().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.env, "dev");
}

mod provider_set {
    use super::*;

    struct Extra {
        id: u32,
    }

    #[test]
    fn set_adds_new_singletons_without_invalidating() {
        let mut container = Container::new();
        container.add_singleton::<Settings>().unwrap();

        let provider = container.build_provider();
        let settings_before = provider.get::<Settings>().unwrap();

        provider.set(Extra { id: 7 }).unwrap();

        // The added instance resolves, and pre-existing singletons were
        // untouched.
        let extra = provider.get::<Extra>().unwrap();
        assert_eq!(extra.id, 7);
        let settings_after = provider.get::<Settings>().unwrap();
        assert!(Arc::ptr_eq(&settings_before, &settings_after));
    }

    #[test]
    fn set_rejects_keys_with_registrations() {
        let mut container = Container::new();
        container.add_singleton::<Settings>().unwrap();

        let provider = container.build_provider();
        let err = provider.set(Settings { env: "other" }).unwrap_err();
        assert!(matches!(err, DiError::OverridingService(_)));
    }

    #[test]
    fn set_rejects_repeated_keys() {
        let container = Container::new();
        let provider = container.build_provider();

        provider.set(Extra { id: 1 }).unwrap();
        let err = provider.set(Extra { id: 2 }).unwrap_err();
        assert!(matches!(err, DiError::OverridingService(_)));
    }

    #[test]
    fn set_instances_feed_later_plans() {
        struct Consumer {
            extra: Arc<Extra>,
        }

        impl Injectable for Consumer {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::of::<Consumer>()
                    .param::<Extra>("extra")
                    .constructor(|args| Ok(Consumer { extra: args.next()? }))
            }
        }

        let mut container = Container::new();
        container.add_transient::<Consumer>().unwrap();

        let provider = container.build_provider();
        // Consumer cannot be planned yet.
        assert!(provider.get::<Consumer>().is_err());

        provider.set(Extra { id: 42 }).unwrap();
        let consumer = provider.get::<Consumer>().unwrap();
        assert_eq!(consumer.extra.id, 42);
    }
}
