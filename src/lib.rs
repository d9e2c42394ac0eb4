//! # ferrous-pool
//!
//! Request-scoped dependency injection and object pooling.
//!
//! For every unit of work (an HTTP request, a timer tick, a bus message) the
//! runtime builds a graph of collaborating components from registered
//! constructors, wires their dependencies by type or interface, runs a
//! begin-of-request hook on each, and returns the instances to per-type pools
//! when the unit of work ends.
//!
//! ## Features
//!
//! - **Pooled components**: Service, Repository and Infra bindings are recycled
//!   through per-type free lists
//! - **Singletons**: shared instances with a one-time application start hook
//! - **Factories**: fresh per resolution, wired against repositories and infra
//! - **Interfaces**: `dyn Trait` slots resolved through explicit declarations,
//!   with ambiguity reported as an error
//! - **Deferred recycle**: hand a worker to a background task and the pool
//!   never sees its instances again
//! - **Cycle detection**: circular wiring fails with the full path
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_pool::{Bindings, Category, Component, DiResult, Inject, Injector, Wire, Worker, WorkerRef};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("[LOG] {}", message);
//!     }
//! }
//! impl Wire for ConsoleLogger {}
//! impl Component for ConsoleLogger {}
//!
//! #[derive(Default)]
//! struct UserRepo {
//!     worker: WorkerRef,
//!     queries: AtomicUsize,
//! }
//!
//! impl Wire for UserRepo {
//!     fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
//!         injector.inject_worker(&self.worker);
//!         Ok(())
//!     }
//! }
//!
//! impl Component for UserRepo {
//!     fn begin_request(&self, worker: &Worker) {
//!         self.worker.set(worker);
//!         self.queries.store(0, Ordering::Relaxed);
//!     }
//! }
//!
//! #[derive(Default)]
//! struct UserService {
//!     repo: Inject<UserRepo>,
//!     logger: Inject<dyn Logger>,
//! }
//!
//! impl Wire for UserService {
//!     fn wire(&self, injector: &mut Injector<'_>) -> DiResult<()> {
//!         injector.require(&self.repo)?;
//!         injector.require(&self.logger)
//!     }
//! }
//!
//! // Register
//! let mut bindings = Bindings::new();
//! bindings.bind(Category::Repository, UserRepo::default);
//! bindings
//!     .bind_singleton(Category::Infra, ConsoleLogger)
//!     .implements::<dyn Logger>(|l| l);
//!
//! let container = bindings.build().unwrap();
//! container.boot().unwrap();
//!
//! // One unit of work
//! let worker = container.begin();
//! let service = UserService::default();
//! container.wire(&service, &worker).unwrap();
//!
//! service.logger.get().unwrap().log("handling request");
//! assert!(service.repo.get().unwrap().worker.get().unwrap().ptr_eq(&worker));
//!
//! container.finish(worker);
//! assert_eq!(container.idle_count::<UserRepo>(), 1);
//! ```
//!
//! ## Deferred recycle
//!
//! ```rust
//! use ferrous_pool::{Bindings, Category, Component, Wire};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Publisher;
//! impl Wire for Publisher {}
//! impl Component for Publisher {}
//!
//! let mut bindings = Bindings::new();
//! bindings.bind(Category::Infra, Publisher::default);
//! let container = bindings.build().unwrap();
//!
//! let worker = container.begin();
//! let publisher = container.get::<Publisher>(&worker).unwrap();
//! worker.defer_recycle();
//!
//! let background = worker.clone();
//! let handle = std::thread::spawn(move || {
//!     let _ = (publisher, background);
//! });
//!
//! container.finish(worker);
//! handle.join().unwrap();
//! assert_eq!(container.idle_count::<Publisher>(), 0);
//! ```

// Module declarations
pub mod category;
pub mod collection;
pub mod config;
pub mod container;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod inject;
pub mod injector;
pub mod key;
pub mod pool;
pub mod traits;
pub mod worker;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use category::Category;
pub use collection::{Binder, Bindings};
pub use config::RuntimeConfig;
pub use container::Container;
pub use context::{Context, ContextError};
pub use descriptors::BindingDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use inject::{Inject, WorkerRef};
pub use injector::Injector;
pub use internal::ShutdownReport;
pub use key::{key_of, Key};
pub use pool::ObjectPool;
pub use traits::{Component, Wire};
pub use worker::{Bus, Store, Worker};
