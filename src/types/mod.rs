// Fundamental types of dpos-core
// Principle: minimal, auditable, durable

pub mod address;
pub mod context;
pub mod primitives;
pub mod signature;

pub use address::*;
pub use context::*;
pub use primitives::*;
pub use signature::*;
