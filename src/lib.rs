//! Form state for reactive UI hosts: typed field values, validation, and a
//! submit lifecycle that records its outcome as state instead of returning
//! errors.

pub mod form;
pub mod prelude;
pub mod reactivity;
pub mod validators;

pub use form::{FormStore, handle_submit};
pub use reactivity::{Batch, ImmediateBatch, Notifier, ReactivityDeps};
