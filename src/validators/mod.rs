//! Validator factories.
//!
//! Each factory captures a requirement and an error message and returns a
//! field validator: it yields the message when the value breaks the
//! requirement and an empty string otherwise. Pass the result straight to
//! [`crate::form::FormStore::register_field_validator`], alone or inside a
//! [`crate::form::ValidateList`].

mod files;
mod range;
mod text;

pub use files::{FileLike, FileList, SelectedFile, max_total_size, min_total_size};
pub use range::{max_range, min_range};
pub use text::{FieldText, required};
