//! Session state: the annotation store, the background image loader and
//! the orchestrating session.

pub mod loader;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod tests;

pub use loader::{ImageLoadWorker, LoadRequest, LoadedImage};
pub use session::{
    ActiveImage, Notice, NoticeSeverity, SaveTrigger, Session, SessionEvent, SessionState,
};
pub use store::{AnnotationStore, ClassFilter, StoreError};
