// Song catalog access: wire shapes, client, errors.

pub mod client;
pub mod error;
pub mod raw;

pub use client::{CatalogClient, Lyrics};
pub use error::{CatalogError, Result};
