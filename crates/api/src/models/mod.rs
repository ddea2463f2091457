pub mod classes;
pub mod dependency;
pub mod mutable;
pub mod sbom;

pub use classes::*;
pub use dependency::*;
pub use mutable::*;
pub use sbom::*;
