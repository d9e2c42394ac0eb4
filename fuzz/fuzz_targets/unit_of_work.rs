#![no_main]

use ferrous_pool::{Bindings, Category, Component, DiResult, Inject, Injector, Wire, Worker};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Default)]
struct Leaf;
impl Wire for Leaf {}
impl Component for Leaf {}

#[derive(Default)]
struct Node {
    leaf: Inject<Leaf>,
}
impl Wire for Node {
    fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
        injector.inject(&self.leaf)
    }
}
impl Component for Node {}

fuzz_target!(|data: &[u8]| {
    let mut bindings = Bindings::new();
    bindings.bind(Category::Infra, Leaf::default);
    bindings.bind(Category::Service, Node::default);
    let container = match bindings.build() {
        Ok(container) => container,
        Err(_) => return,
    };

    // Each byte drives one step against a small set of live workers
    let mut workers: Vec<Worker> = Vec::new();
    let mut held: Vec<Arc<Leaf>> = Vec::new();

    for byte in data {
        match byte % 6 {
            0 => workers.push(container.begin()),
            1 => {
                if let Some(worker) = workers.last() {
                    let node = container.get::<Node>(worker).unwrap();
                    assert!(node.leaf.is_set());
                }
            }
            2 => {
                if !workers.is_empty() {
                    let worker = workers.swap_remove(*byte as usize % workers.len());
                    container.finish(worker);
                }
            }
            3 => {
                if let Some(worker) = workers.last() {
                    worker.defer_recycle();
                }
            }
            4 => held.push(container.acquire::<Leaf>().unwrap()),
            _ => {
                if let Some(leaf) = held.pop() {
                    container.release(leaf);
                }
            }
        }
    }

    for worker in workers {
        let deferred = worker.is_defer_recycle();
        let before = worker.acquired_count();
        let handle = worker.clone();
        container.finish(worker);
        if deferred {
            assert_eq!(handle.acquired_count(), before);
        } else {
            assert_eq!(handle.acquired_count(), 0);
        }
    }
});
