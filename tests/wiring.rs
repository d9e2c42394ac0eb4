use ferrous_pool::{
    Bindings, Category, Component, DiError, DiResult, Inject, Injector, Wire, Worker, WorkerRef,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ===== Test Components =====

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct FixedClock(u64);
impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}
impl Wire for FixedClock {}
impl Component for FixedClock {}

#[derive(Default)]
struct Db {
    begins: AtomicUsize,
    worker: WorkerRef,
}
impl Wire for Db {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject_worker(&self.worker);
        Ok(())
    }
}
impl Component for Db {
    fn begin_request(&self, _worker: &Worker) {
        self.begins.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct UserRepo {
    db: Inject<Db>,
    begins: AtomicUsize,
}
impl Wire for UserRepo {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.db)
    }
}
impl Component for UserRepo {
    fn begin_request(&self, _worker: &Worker) {
        self.begins.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Base {
    worker: WorkerRef,
    clock: Inject<dyn Clock>,
}
impl Wire for Base {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject_worker(&self.worker);
        injector.inject(&self.clock)
    }
}

#[derive(Default)]
struct Handler {
    base: Base,
    users: Inject<UserRepo>,
    missing: Inject<String>,
}
impl Wire for Handler {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.embed(&self.base)?;
        injector.inject(&self.users)?;
        injector.inject(&self.missing)
    }
}

fn bindings() -> Bindings {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Db::default);
    bindings.bind(Category::Repository, UserRepo::default);
    bindings
        .bind_singleton(Category::Infra, FixedClock(1_700_000_000))
        .implements::<dyn Clock>(|c| c);
    bindings
}

// ===== Transitive wiring =====

#[test]
fn test_transitive_wiring_and_hooks_once() {
    let container = bindings().build().unwrap();
    let worker = container.begin();
    let handler = Handler::default();

    let tracked = container.wire(&handler, &worker).unwrap();
    assert_eq!(tracked, 2); // UserRepo and Db; the clock is a singleton

    let users = handler.users.get().unwrap();
    let db = users.db.get().unwrap();
    assert_eq!(users.begins.load(Ordering::SeqCst), 1);
    assert_eq!(db.begins.load(Ordering::SeqCst), 1);
    assert!(db.worker.get().unwrap().ptr_eq(&worker));

    // Embedded fields are wired as if declared on the handler
    assert!(handler.base.worker.get().unwrap().ptr_eq(&worker));
    assert_eq!(handler.base.clock.get().unwrap().now(), 1_700_000_000);

    // Nothing bound to String, so the slot is skipped
    assert!(!handler.missing.is_set());

    assert_eq!(worker.acquired_count(), 2);
    container.finish(worker);
}

#[test]
fn test_wiring_twice_does_not_reacquire() {
    let container = bindings().build().unwrap();
    let worker = container.begin();
    let handler = Handler::default();

    container.wire(&handler, &worker).unwrap();
    let tracked = container.wire(&handler, &worker).unwrap();

    assert_eq!(tracked, 0);
    assert_eq!(handler.users.get().unwrap().begins.load(Ordering::SeqCst), 1);
    container.finish(worker);
}

#[test]
fn test_caller_supplied_slot_is_kept() {
    let container = bindings().build().unwrap();
    let worker = container.begin();

    let mine = Arc::new(UserRepo::default());
    let handler = Handler {
        users: Inject::with(mine.clone()),
        ..Handler::default()
    };
    container.wire(&handler, &worker).unwrap();

    assert!(Arc::ptr_eq(&mine, &handler.users.get().unwrap()));
    assert_eq!(mine.begins.load(Ordering::SeqCst), 0);
    assert!(!mine.db.is_set());
    container.finish(worker);
}

#[test]
fn test_require_reports_missing_binding() {
    #[derive(Default)]
    struct Strict {
        name: Inject<String>,
    }
    impl Wire for Strict {
        fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
            injector.require(&self.name)
        }
    }

    let container = Bindings::new().build().unwrap();
    let worker = container.begin();

    let err = container.wire(&Strict::default(), &worker).unwrap_err();
    assert!(matches!(err, DiError::NotFound(name) if name.contains("String")));
    container.finish(worker);
}

#[test]
fn test_get_resolves_interface() {
    let container = bindings().build().unwrap();
    let clock = container.run(|worker| container.get::<dyn Clock>(worker).unwrap());
    assert_eq!(clock.now(), 1_700_000_000);
}

#[test]
fn test_not_wired_slot() {
    let slot: Inject<Db> = Inject::new();
    assert!(matches!(slot.get(), Err(DiError::NotWired(_))));
}

// ===== Pool reuse through workers =====

#[test]
fn test_reuse_across_workers_rewires_nested_slots() {
    let container = bindings().build().unwrap();

    let (first_repo, first_db) = container.run(|worker| {
        let handler = Handler::default();
        container.wire(&handler, worker).unwrap();
        let users = handler.users.get().unwrap();
        let db = users.db.get().unwrap();
        (users, db)
    });

    let worker = container.begin();
    let handler = Handler::default();
    // The pooled repo comes back and its Db slot is resolved again
    assert_eq!(container.wire(&handler, &worker).unwrap(), 2);

    let users = handler.users.get().unwrap();
    assert!(Arc::ptr_eq(&first_repo, &users));
    assert_eq!(users.begins.load(Ordering::SeqCst), 2);

    let db = users.db.get().unwrap();
    assert!(Arc::ptr_eq(&first_db, &db));
    assert_eq!(db.begins.load(Ordering::SeqCst), 2);
    assert!(db.worker.get().unwrap().ptr_eq(&worker));
    assert_eq!(worker.acquired_count(), 2);

    container.finish(worker);
    assert_eq!(container.idle_count::<UserRepo>(), 1);
    assert_eq!(container.idle_count::<Db>(), 1);
}

#[test]
fn test_live_workers_never_share_pooled_instances() {
    let container = bindings().build().unwrap();

    // Leave one repo and one Db idle in the pools
    container.run(|worker| {
        container.get::<UserRepo>(worker).unwrap();
    });

    let w2 = container.begin();
    let w3 = container.begin();
    let repo = container.get::<UserRepo>(&w2).unwrap();
    let db_in_repo = repo.db.get().unwrap();
    let db_for_w3 = container.get::<Db>(&w3).unwrap();

    assert!(!Arc::ptr_eq(&db_in_repo, &db_for_w3));
    assert_eq!(w2.acquired_count(), 2);
    assert_eq!(w3.acquired_count(), 1);
    assert!(db_in_repo.worker.get().unwrap().ptr_eq(&w2));
    assert!(db_for_w3.worker.get().unwrap().ptr_eq(&w3));

    container.finish(w2);
    container.finish(w3);
    assert_eq!(container.idle_count::<Db>(), 2);
}

#[test]
fn test_caller_value_survives_pool_reuse() {
    let container = bindings().build().unwrap();

    let mine = Arc::new(Db::default());
    let repo = container.run(|worker| {
        let repo = container.get::<UserRepo>(worker).unwrap();
        repo.db.replace(mine.clone());
        repo
    });
    assert!(repo.db.is_caller_supplied());

    let worker = container.begin();
    let again = container.get::<UserRepo>(&worker).unwrap();
    assert!(Arc::ptr_eq(&repo, &again));
    assert!(Arc::ptr_eq(&again.db.get().unwrap(), &mine));
    // Only the repo was acquired
    assert_eq!(worker.acquired_count(), 1);
    container.finish(worker);
}

#[test]
fn test_stale_worker_slot_is_refilled() {
    let container = bindings().build().unwrap();

    let db = container.run(|worker| container.get::<Db>(worker).unwrap());
    assert!(!db.worker.is_set()); // finished worker counts as unset

    let worker = container.begin();
    let again = container.get::<Db>(&worker).unwrap();
    assert!(Arc::ptr_eq(&db, &again));
    assert!(again.worker.get().unwrap().ptr_eq(&worker));
    container.finish(worker);
}

// ===== Interfaces =====

trait Sender: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct Smtp;
impl Sender for Smtp {
    fn name(&self) -> &'static str {
        "smtp"
    }
}
impl Wire for Smtp {}
impl Component for Smtp {}

#[derive(Default)]
struct Sms;
impl Sender for Sms {
    fn name(&self) -> &'static str {
        "sms"
    }
}
impl Wire for Sms {}
impl Component for Sms {}

#[derive(Default)]
struct Notifier {
    sender: Inject<dyn Sender>,
}
impl Wire for Notifier {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.sender)
    }
}

#[test]
fn test_interface_with_one_candidate() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Smtp::default).implements::<dyn Sender>(|s| s);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    let notifier = Notifier::default();
    container.wire(&notifier, &worker).unwrap();

    assert_eq!(notifier.sender.get().unwrap().name(), "smtp");
    assert_eq!(worker.acquired_count(), 1);
    container.finish(worker);
    assert_eq!(container.idle_count::<Smtp>(), 1);
}

#[test]
fn test_ambiguous_interface_is_an_error() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Smtp::default).implements::<dyn Sender>(|s| s);
    bindings.bind(Category::Infra, Sms::default).implements::<dyn Sender>(|s| s);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    let err = container.wire(&Notifier::default(), &worker).unwrap_err();
    match err {
        DiError::AmbiguousInterface { interface, candidates } => {
            assert!(interface.contains("Sender"));
            assert_eq!(candidates.len(), 2);
            // Registration order
            assert!(candidates[0].ends_with("Smtp"));
            assert!(candidates[1].ends_with("Sms"));
        }
        other => panic!("expected AmbiguousInterface, got {other:?}"),
    }
    assert_eq!(worker.acquired_count(), 0);
    container.finish(worker);
}

#[test]
fn test_ambiguity_is_per_category_for_resolve() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Smtp::default).implements::<dyn Sender>(|s| s);
    bindings.bind(Category::Service, Sms::default).implements::<dyn Sender>(|s| s);
    let container = bindings.build().unwrap();

    let infra = container.resolve::<dyn Sender>(Category::Infra).unwrap().unwrap();
    let service = container.resolve::<dyn Sender>(Category::Service).unwrap().unwrap();
    assert!(infra.type_name().ends_with("Smtp"));
    assert!(service.type_name().ends_with("Sms"));
    assert!(container.resolve::<dyn Sender>(Category::Repository).unwrap().is_none());

    // Slots search every category at once, where both are candidates
    let worker = container.begin();
    assert!(matches!(
        container.get::<dyn Sender>(&worker),
        Err(DiError::AmbiguousInterface { .. })
    ));
    container.finish(worker);
}

#[test]
fn test_concrete_resolve_prefers_lookup_order() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Service, Smtp::default);
    bindings.bind(Category::Repository, Smtp::default);
    let container = bindings.build().unwrap();

    let d = container.resolve::<Smtp>(Category::Service).unwrap().unwrap();
    assert_eq!(d.category, Category::Service);

    // Repository is searched before Service
    let worker = container.begin();
    container.get::<Smtp>(&worker).unwrap();
    container.finish(worker);
    assert_eq!(container.idle_count::<Smtp>(), 1);
}

// ===== Factories =====

trait OrderStore: Send + Sync {
    fn label(&self) -> String;
}

#[derive(Default)]
struct SqlOrders {
    worker: WorkerRef,
}
impl OrderStore for SqlOrders {
    fn label(&self) -> String {
        format!("sql@{}", self.worker.get().map(|w| w.id()).unwrap_or(0))
    }
}
impl Wire for SqlOrders {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject_worker(&self.worker);
        Ok(())
    }
}
impl Component for SqlOrders {}

#[derive(Default)]
struct AuditService;
impl Wire for AuditService {}
impl Component for AuditService {}

#[derive(Default)]
struct OrderFactory {
    orders: Inject<dyn OrderStore>,
    audit: Inject<AuditService>,
    hooks: AtomicUsize,
}
impl Wire for OrderFactory {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.orders)?;
        injector.inject(&self.audit)
    }
}
impl Component for OrderFactory {
    fn begin_request(&self, _worker: &Worker) {
        self.hooks.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Checkout {
    factory: Inject<OrderFactory>,
}
impl Wire for Checkout {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.factory)
    }
}

fn factory_bindings() -> Bindings {
    let mut bindings = Bindings::new();
    bindings
        .bind(Category::Repository, SqlOrders::default)
        .implements::<dyn OrderStore>(|s| s);
    bindings.bind(Category::Service, AuditService::default);
    bindings.bind(Category::Factory, OrderFactory::default);
    bindings
}

#[test]
fn test_factory_wires_repositories_but_not_services() {
    let container = factory_bindings().build().unwrap();
    let worker = container.begin();
    let checkout = Checkout::default();

    let tracked = container.wire(&checkout, &worker).unwrap();

    let factory = checkout.factory.get().unwrap();
    assert_eq!(factory.hooks.load(Ordering::SeqCst), 1);
    assert_eq!(factory.orders.get().unwrap().label(), format!("sql@{}", worker.id()));
    // Services are outside a factory's scope
    assert!(!factory.audit.is_set());

    // The factory itself is not tracked, what it reached is
    assert_eq!(tracked, 1);
    assert_eq!(worker.acquired_count(), 1);

    container.finish(worker);
    assert_eq!(container.idle_count::<SqlOrders>(), 1);
    assert_eq!(container.idle_count::<OrderFactory>(), 0);
}

#[test]
fn test_factory_fresh_per_resolution() {
    let container = factory_bindings().build().unwrap();
    let worker = container.begin();

    let a = container.get::<OrderFactory>(&worker).unwrap();
    let b = container.get::<OrderFactory>(&worker).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    container.finish(worker);
}

// ===== Failures =====

#[derive(Default)]
struct Flaky;
impl Wire for Flaky {}
impl Component for Flaky {}

#[derive(Default)]
struct NeedsFlaky {
    db: Inject<Db>,
    flaky: Inject<Flaky>,
}
impl Wire for NeedsFlaky {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.db)?;
        injector.inject(&self.flaky)
    }
}

#[test]
fn test_constructor_failure_keeps_partial_graph_tracked() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Db::default);
    bindings.try_bind(Category::Infra, || -> Result<Flaky, String> {
        Err("connection refused".to_string())
    });
    let container = bindings.build().unwrap();

    let worker = container.begin();
    let entry = NeedsFlaky::default();
    let err = container.wire(&entry, &worker).unwrap_err();

    assert!(matches!(err, DiError::Construction { .. }));
    assert!(entry.db.is_set());
    assert_eq!(worker.acquired_count(), 1);

    container.finish(worker);
    assert_eq!(container.idle_count::<Db>(), 1);
}

#[test]
fn test_hook_sees_wired_slots() {
    #[derive(Default)]
    struct Observer {
        db: Inject<Db>,
        saw_db: Mutex<Option<bool>>,
    }
    impl Wire for Observer {
        fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
            injector.inject(&self.db)
        }
    }
    impl Component for Observer {
        fn begin_request(&self, _worker: &Worker) {
            *self.saw_db.lock().unwrap() = Some(self.db.is_set());
        }
    }

    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Db::default);
    bindings.bind(Category::Service, Observer::default);
    let container = bindings.build().unwrap();

    let observer = container.run(|worker| container.get::<Observer>(worker).unwrap());
    assert_eq!(*observer.saw_db.lock().unwrap(), Some(true));
}
