use ferrous_pool::{Bindings, Category, Component, DiError, DiResult, Inject, Injector, RuntimeConfig, Wire};

#[derive(Default, Debug)]
struct Alpha {
    beta: Inject<Beta>,
}
impl Wire for Alpha {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.beta)
    }
}
impl Component for Alpha {}

#[derive(Default, Debug)]
struct Beta {
    alpha: Inject<Alpha>,
}
impl Wire for Beta {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.alpha)
    }
}
impl Component for Beta {}

#[derive(Default, Debug)]
struct Ouroboros {
    tail: Inject<Ouroboros>,
}
impl Wire for Ouroboros {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.tail)
    }
}
impl Component for Ouroboros {}

fn short(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

#[test]
fn test_self_circular_dependency() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Service, Ouroboros::default);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    match container.get::<Ouroboros>(&worker) {
        Err(DiError::Circular(path)) => {
            let names: Vec<&str> = path.iter().map(|n| short(n)).collect();
            assert_eq!(names, vec!["Ouroboros", "Ouroboros"]);
        }
        other => panic!("expected Circular, got {:?}", other.map(|_| ())),
    }
    container.finish(worker);
}

#[test]
fn test_two_step_cycle_reports_path() {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Service, Alpha::default);
    bindings.bind(Category::Repository, Beta::default);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    let err = container.get::<Alpha>(&worker).unwrap_err();
    match &err {
        DiError::Circular(path) => {
            let names: Vec<&str> = path.iter().map(|n| short(n)).collect();
            assert_eq!(names, vec!["Alpha", "Beta", "Alpha"]);
        }
        other => panic!("expected Circular, got {other:?}"),
    }
    assert!(err.to_string().contains(" -> "));
    assert!(err.is_configuration());

    // Everything acquired before the cycle was found is still released
    let tracked = worker.acquired_count();
    assert!(tracked >= 2);
    container.finish(worker);
    assert_eq!(container.idle_count::<Alpha>() + container.idle_count::<Beta>(), tracked);
}

#[test]
fn test_depth_limit_without_cycle_detection() {
    let config = RuntimeConfig {
        detect_cycles: false,
        max_wire_depth: 8,
        ..RuntimeConfig::default()
    };
    let mut bindings = Bindings::with_config(config);
    bindings.bind(Category::Service, Ouroboros::default);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    assert!(matches!(
        container.get::<Ouroboros>(&worker),
        Err(DiError::DepthExceeded(8))
    ));
    container.finish(worker);
}

#[test]
fn test_diamond_is_not_a_cycle() {
    #[derive(Default)]
    struct Shared;
    impl Wire for Shared {}
    impl Component for Shared {}

    #[derive(Default)]
    struct Left {
        shared: Inject<Shared>,
    }
    impl Wire for Left {
        fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
            injector.inject(&self.shared)
        }
    }
    impl Component for Left {}

    #[derive(Default)]
    struct Right {
        shared: Inject<Shared>,
    }
    impl Wire for Right {
        fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
            injector.inject(&self.shared)
        }
    }
    impl Component for Right {}

    #[derive(Default)]
    struct Top {
        left: Inject<Left>,
        right: Inject<Right>,
    }
    impl Wire for Top {
        fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
            injector.inject(&self.left)?;
            injector.inject(&self.right)
        }
    }

    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Shared::default);
    bindings.bind(Category::Service, Left::default);
    bindings.bind(Category::Service, Right::default);
    let container = bindings.build().unwrap();

    let worker = container.begin();
    let top = Top::default();
    assert_eq!(container.wire(&top, &worker).unwrap(), 4);
    container.finish(worker);
    assert_eq!(container.idle_count::<Shared>(), 2);
}
