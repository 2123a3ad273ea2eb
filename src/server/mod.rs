//! Document store and its HTTP surface.

pub mod error;
pub mod filter;
pub mod ids;
pub mod routes;
pub mod store;

pub use error::{ApiError, StoreError};
pub use ids::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use routes::{app, AppState};
pub use store::{CollectionInfo, Document, DocumentStore, ListOptions, Page, PageLimits};
