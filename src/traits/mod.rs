//! Core traits implemented by wired components.

mod component;
mod wire;

pub use component::Component;
pub use wire::Wire;
