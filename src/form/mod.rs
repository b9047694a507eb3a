mod response;
mod store;
mod submit;
mod validation;


pub use calmform_derive::FormModel;
pub use response::{Response, ResponseStatus};
pub use store::{
    FieldKey, FieldMeta, FormError, FormId, FormOptions, FormResult, FormSnapshot, FormStore,
    ResetOptions, RevalidateMode, ValidationMode, ValidationTicket,
};
pub use submit::{SubmitError, SubmitOptions, SubmitPhase, UNKNOWN_ERROR_MESSAGE, handle_submit};
pub use validation::{
    AsyncFieldValidator, FieldLens, FieldValidateFn, FormModel, FormValidator, ValidateList,
    ValidateOptions,
};
