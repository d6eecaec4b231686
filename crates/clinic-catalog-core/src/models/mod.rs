//! Domain models for the clinic catalog.

mod draft;
mod item;
mod query;

pub use draft::*;
pub use item::*;
pub use query::*;
