/// Scope and context lifecycle integration tests
///
/// These tests cover shared-context caching, the request window, custom
/// scopes, teardown ordering, and access to inactive contexts.
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use odi::{BeanCollection, Context, OdiError, ScopeKind};

#[derive(Debug)]
struct Repository {
    id: u32,
}

#[test]
fn shared_scope_creates_once_and_caches() {
    let created = Arc::new(AtomicU32::new(0));
    let created_clone = created.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .application_scoped()
        .with(move |_| Repository {
            id: created_clone.fetch_add(1, Ordering::SeqCst),
        })
        .done()
        .unwrap();

    let container = beans.build();
    let a = container.select::<Repository>().get().unwrap();
    let b = container.select::<Repository>().get().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn trait_and_concrete_views_share_one_instance() {
    trait Store: Send + Sync {
        fn id(&self) -> u32;
    }
    impl Store for Repository {
        fn id(&self) -> u32 {
            self.id
        }
    }

    let created = Arc::new(AtomicU32::new(0));
    let created_clone = created.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .singleton()
        .provides::<dyn Store>(|r| r as Arc<dyn Store>)
        .with(move |_| Repository {
            id: created_clone.fetch_add(1, Ordering::SeqCst) + 7,
        })
        .done()
        .unwrap();

    let container = beans.build();
    let concrete = container.select::<Repository>().get().unwrap();
    let view = container.select::<dyn Store>().get().unwrap();

    // One canonical instance behind both lookups.
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(concrete.id, view.id());
}

#[test]
fn request_scope_needs_an_active_window() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .request_scoped()
        .with(|_| Repository { id: 1 })
        .done()
        .unwrap();
    let container = beans.build();

    match container.select::<Repository>().get() {
        Err(OdiError::ContextNotActive(scope)) => assert_eq!(scope, ScopeKind::Request),
        other => panic!("expected inactive request scope, got {other:?}"),
    }

    let guard = container.begin_request().unwrap();
    assert!(container.select::<Repository>().get().is_ok());
    guard.end();

    assert!(matches!(
        container.select::<Repository>().get(),
        Err(OdiError::ContextNotActive(ScopeKind::Request))
    ));
}

#[test]
fn request_windows_are_isolated() {
    let next = Arc::new(AtomicU32::new(0));
    let next_clone = next.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .request_scoped()
        .with(move |_| Repository {
            id: next_clone.fetch_add(1, Ordering::SeqCst),
        })
        .done()
        .unwrap();
    let container = beans.build();

    let first = {
        let _guard = container.begin_request().unwrap();
        container.select::<Repository>().get().unwrap().id
    };
    let second = {
        let _guard = container.begin_request().unwrap();
        container.select::<Repository>().get().unwrap().id
    };
    assert_ne!(first, second);
}

#[test]
fn overlapping_request_windows_are_rejected() {
    let container = BeanCollection::new().build();
    let _guard = container.begin_request().unwrap();
    assert!(matches!(
        container.begin_request(),
        Err(OdiError::InvalidArgument(_))
    ));
}

#[test]
fn request_instances_are_destroyed_when_the_window_ends() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .request_scoped()
        .with(|_| Repository { id: 9 })
        .on_destroy(move |repo| log_clone.lock().unwrap().push(repo.id))
        .done()
        .unwrap();
    let container = beans.build();

    {
        let _guard = container.begin_request().unwrap();
        let repo = container.select::<Repository>().get().unwrap();
        assert_eq!(repo.id, 9);
        assert!(log.lock().unwrap().is_empty());
    }
    assert_eq!(*log.lock().unwrap(), vec![9]);
}

#[test]
fn custom_scope_caches_until_shutdown() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();

    let mut beans = BeanCollection::new();
    beans.register_scope("conversation");
    beans
        .register::<Repository>()
        .scoped(ScopeKind::Custom("conversation"))
        .with(|_| Repository { id: 3 })
        .on_destroy(move |repo| log_clone.lock().unwrap().push(repo.id))
        .done()
        .unwrap();
    let container = beans.build();

    let a = container.select::<Repository>().get().unwrap();
    let b = container.select::<Repository>().get().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    container.shutdown();
    assert_eq!(*log.lock().unwrap(), vec![3]);
}

#[test]
fn unregistered_custom_scope_is_not_active() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .scoped(ScopeKind::Custom("session"))
        .with(|_| Repository { id: 1 })
        .done()
        .unwrap();
    let container = beans.build();

    assert!(matches!(
        container.select::<Repository>().get(),
        Err(OdiError::ContextNotActive(ScopeKind::Custom("session")))
    ));
}

#[test]
fn context_surface_supports_non_creating_lookup() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .application_scoped()
        .with(|_| Repository { id: 4 })
        .done()
        .unwrap();
    let container = beans.build();

    let ctx: Arc<dyn Context> = container.get_context(ScopeKind::Application).unwrap();
    let bean = container.get_beans::<Repository>([]).unwrap().remove(0);

    // Nothing cached yet; the non-creating lookup must not create.
    assert!(ctx.get_if_present(&bean).is_none());
    assert_eq!(ctx.instance_count(), 0);

    let first = container.select::<Repository>().get().unwrap();
    let second = container.select::<Repository>().get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ctx.instance_count(), 1);
    assert!(ctx.get_if_present(&bean).is_some());

    // Explicit destroy empties the store again.
    ctx.destroy(&bean).unwrap();
    assert!(ctx.get_if_present(&bean).is_none());
    assert_eq!(ctx.instance_count(), 0);
}

#[test]
fn dependent_context_never_caches_anything() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .with(|_| Repository { id: 2 })
        .done()
        .unwrap();
    let container = beans.build();

    let ctx: Arc<dyn Context> = container.get_context(ScopeKind::Dependent).unwrap();
    let bean = container.get_beans::<Repository>([]).unwrap().remove(0);

    container.select::<Repository>().get().unwrap();
    assert!(ctx.get_if_present(&bean).is_none());
    assert_eq!(ctx.instance_count(), 0);
}

#[test]
fn shutdown_tears_down_application_before_singleton() {
    struct AppBean;
    struct RootBean;

    let log = Arc::new(Mutex::new(Vec::new()));
    let app_log = log.clone();
    let root_log = log.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<AppBean>()
        .application_scoped()
        .with(|_| AppBean)
        .on_destroy(move |_| app_log.lock().unwrap().push("application"))
        .done()
        .unwrap();
    beans
        .register::<RootBean>()
        .singleton()
        .with(|_| RootBean)
        .on_destroy(move |_| root_log.lock().unwrap().push("singleton"))
        .done()
        .unwrap();
    let container = beans.build();

    container.select::<AppBean>().get().unwrap();
    container.select::<RootBean>().get().unwrap();
    container.shutdown();

    assert_eq!(*log.lock().unwrap(), vec!["application", "singleton"]);
}

#[test]
fn shutdown_is_idempotent_and_contexts_stay_closed() {
    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .singleton()
        .with(|_| Repository { id: 1 })
        .done()
        .unwrap();
    let container = beans.build();

    container.select::<Repository>().get().unwrap();
    container.shutdown();
    container.shutdown();

    assert!(matches!(
        container.select::<Repository>().get(),
        Err(OdiError::ContextNotActive(ScopeKind::Singleton))
    ));
}

#[test]
fn explicit_destroy_evicts_and_recreates() {
    let next = Arc::new(AtomicU32::new(0));
    let next_clone = next.clone();
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();

    let mut beans = BeanCollection::new();
    beans
        .register::<Repository>()
        .application_scoped()
        .with(move |_| Repository {
            id: next_clone.fetch_add(1, Ordering::SeqCst),
        })
        .on_destroy(move |repo| log_clone.lock().unwrap().push(repo.id))
        .done()
        .unwrap();
    let container = beans.build();

    let instance = container.select::<Repository>();
    let first = instance.get().unwrap();
    assert_eq!(first.id, 0);

    let handle = instance.get_handle().unwrap();
    handle.destroy().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![0]);

    // The context is still active; the next lookup builds a fresh one.
    let second = container.select::<Repository>().get().unwrap();
    assert_eq!(second.id, 1);
}
