//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod shutdown;

pub(crate) use circular::ResolutionPath;
pub use shutdown::ShutdownReport;
pub(crate) use shutdown::ShutdownBag;
