pub use crate::form::{
    FieldKey, FieldLens, FieldMeta, FormError, FormModel, FormOptions, FormResult, FormSnapshot,
    FormStore, ResetOptions, Response, ResponseStatus, RevalidateMode, SubmitError, SubmitOptions,
    ValidateList, ValidateOptions, ValidationMode, handle_submit,
};
pub use crate::reactivity::{Batch, ImmediateBatch, Notifier, ReactivityDeps};
pub use crate::validators::{
    FileLike, FileList, SelectedFile, max_range, max_total_size, min_range, min_total_size,
    required,
};
