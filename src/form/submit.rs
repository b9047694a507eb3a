//! Submit lifecycle.
//!
//! A submission walks `Idle -> Resetting -> Validating -> [Acting] -> Cleanup -> Idle`.
//! The four opening writes (response, count, submitted, submitting) run inside
//! one host batch. Validation and action failures never escape: they become an
//! error [`Response`] on the form, and `submitting` is cleared on every exit,
//! including panics and a dropped future.

use std::future::Future;

use thiserror::Error;

use super::response::Response;
use super::store::{FormError, FormId, FormResult, FormStore};
use super::validation::{FormModel, ValidateOptions};
use crate::reactivity::ReactivityDeps;

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error has occurred.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubmitOptions {
    /// Leave the previous response in place instead of clearing it.
    pub keep_response: bool,
    pub should_active: bool,
    pub should_touched: bool,
    pub should_dirty: bool,
    pub should_focus: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        let validate = ValidateOptions::default();
        Self {
            keep_response: false,
            should_active: validate.should_active,
            should_touched: validate.should_touched,
            should_dirty: validate.should_dirty,
            should_focus: validate.should_focus,
        }
    }
}

impl From<SubmitOptions> for ValidateOptions {
    fn from(options: SubmitOptions) -> Self {
        Self {
            should_active: options.should_active,
            should_touched: options.should_touched,
            should_dirty: options.should_dirty,
            should_focus: options.should_focus,
        }
    }
}

/// Failure of a submit action, carrying whatever message it had.
#[derive(Debug, Clone, Default, Eq, PartialEq, Error)]
#[error("{}", message_or_default(.message))]
pub struct SubmitError {
    message: Option<String>,
}

fn message_or_default(message: &Option<String>) -> &str {
    message
        .as_deref()
        .filter(|message| !message.is_empty())
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A failure with nothing to say about itself.
    pub fn unknown() -> Self {
        Self { message: None }
    }

    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(error.to_string())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }

    pub fn message_or_default(&self) -> &str {
        message_or_default(&self.message)
    }
}

impl From<FormError> for SubmitError {
    fn from(error: FormError) -> Self {
        Self::from_error(&error)
    }
}

impl From<String> for SubmitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SubmitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitPhase {
    Idle,
    Resetting,
    Validating,
    Acting,
    Cleanup,
}

impl SubmitPhase {
    pub fn can_advance_to(self, next: SubmitPhase) -> bool {
        matches!(
            (self, next),
            (SubmitPhase::Idle, SubmitPhase::Resetting)
                | (SubmitPhase::Resetting, SubmitPhase::Validating)
                | (SubmitPhase::Validating, SubmitPhase::Acting)
                | (SubmitPhase::Validating, SubmitPhase::Cleanup)
                | (SubmitPhase::Acting, SubmitPhase::Cleanup)
                | (SubmitPhase::Cleanup, SubmitPhase::Idle)
        )
    }
}

struct SubmitLifecycle {
    form_id: FormId,
    phase: SubmitPhase,
}

impl SubmitLifecycle {
    fn new(form_id: FormId) -> Self {
        Self {
            form_id,
            phase: SubmitPhase::Idle,
        }
    }

    fn advance(&mut self, next: SubmitPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid submit phase transition: {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::trace!(form = %self.form_id, from = ?self.phase, to = ?next, "submit phase");
        self.phase = next;
    }
}

/// Clears `submitting` when dropped, whatever path left the submission.
struct SubmittingGuard<'a, T>
where
    T: FormModel,
{
    form: &'a FormStore<T>,
}

impl<T> Drop for SubmittingGuard<'_, T>
where
    T: FormModel,
{
    fn drop(&mut self) {
        self.form.finish_submitting();
    }
}

/// Runs one submission of `form`.
///
/// Returns an error only when the opening batch cannot write the form state,
/// or when the batch strategy never runs the mutation it was handed.
/// Everything that goes wrong afterwards ends up in [`FormStore::response`].
pub async fn handle_submit<T, A, Fut>(
    deps: &ReactivityDeps,
    form: &FormStore<T>,
    action: A,
    options: SubmitOptions,
) -> FormResult<()>
where
    T: FormModel,
    A: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), SubmitError>>,
{
    let mut lifecycle = SubmitLifecycle::new(form.form_id()?);
    lifecycle.advance(SubmitPhase::Resetting);

    let mut opened = None;
    deps.run_batch(|| opened = Some(form.begin_submit(options.keep_response)));
    let submit_count = opened.ok_or(FormError::BatchSkipped)??;
    let cleanup = SubmittingGuard { form };
    tracing::debug!(form = %lifecycle.form_id, submit_count, "submitting form");

    lifecycle.advance(SubmitPhase::Validating);
    let outcome = validate_then_act(form, action, options, &mut lifecycle).await;
    if let Err(error) = outcome {
        let message = error.message_or_default();
        tracing::warn!(form = %lifecycle.form_id, error = message, "form submission failed");
        if let Err(write_error) = form.set_response(Response::error(message)) {
            tracing::warn!(
                form = %lifecycle.form_id,
                %write_error,
                "could not record submit error"
            );
        }
    }

    lifecycle.advance(SubmitPhase::Cleanup);
    drop(cleanup);
    lifecycle.advance(SubmitPhase::Idle);
    Ok(())
}

async fn validate_then_act<T, A, Fut>(
    form: &FormStore<T>,
    action: A,
    options: SubmitOptions,
    lifecycle: &mut SubmitLifecycle,
) -> Result<(), SubmitError>
where
    T: FormModel,
    A: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), SubmitError>>,
{
    if !form.validate(options.into()).await? {
        tracing::debug!(form = %lifecycle.form_id, "submission skipped, form is invalid");
        return Ok(());
    }
    lifecycle.advance(SubmitPhase::Acting);
    action().await
}

impl<T> FormStore<T>
where
    T: FormModel,
{
    /// Submits the form with an action that takes no arguments.
    pub async fn submit<A, Fut>(
        &self,
        deps: &ReactivityDeps,
        action: A,
        options: SubmitOptions,
    ) -> FormResult<()>
    where
        A: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), SubmitError>>,
    {
        handle_submit(deps, self, action, options).await
    }

    /// Submits the form, handing the action the values as they were once
    /// validation passed.
    pub async fn submit_with<A, Fut>(
        &self,
        deps: &ReactivityDeps,
        action: A,
        options: SubmitOptions,
    ) -> FormResult<()>
    where
        A: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), SubmitError>>,
    {
        let form = self.clone();
        handle_submit(
            deps,
            self,
            move || async move {
                match form.values() {
                    Ok(values) => action(values).await,
                    Err(error) => Err(SubmitError::from(error)),
                }
            },
            options,
        )
        .await
    }

    fn begin_submit(&self, keep_response: bool) -> FormResult<u32> {
        if !keep_response {
            self.write("clearing response for submit", |state| {
                state.response = None;
            })?;
        }
        let submit_count = self.write("incrementing submit count", |state| {
            state.submit_count = state.submit_count.saturating_add(1);
            state.submit_count
        })?;
        self.write("marking form submitted", |state| state.submitted = true)?;
        self.write("marking form submitting", |state| state.submitting = true)?;
        Ok(submit_count)
    }

    fn finish_submitting(&self) {
        // Runs from a destructor, so a poisoned lock is recovered rather than
        // reported.
        {
            let mut state = match self.state.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.submitting = false;
        }
        self.notifier.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_follow_the_submit_path() {
        use SubmitPhase::*;

        assert!(Idle.can_advance_to(Resetting));
        assert!(Resetting.can_advance_to(Validating));
        assert!(Validating.can_advance_to(Acting));
        assert!(Validating.can_advance_to(Cleanup));
        assert!(Acting.can_advance_to(Cleanup));
        assert!(Cleanup.can_advance_to(Idle));

        assert!(!Idle.can_advance_to(Acting));
        assert!(!Resetting.can_advance_to(Acting));
        assert!(!Acting.can_advance_to(Validating));
        assert!(!Cleanup.can_advance_to(Validating));
    }

    #[test]
    fn submit_error_falls_back_when_message_is_missing_or_empty() {
        assert_eq!(SubmitError::unknown().message_or_default(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(SubmitError::new("").message_or_default(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(SubmitError::from("boom").message_or_default(), "boom");
        assert_eq!(SubmitError::unknown().to_string(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn submit_error_wraps_std_errors_by_display() {
        let io = std::io::Error::other("disk full");
        assert_eq!(SubmitError::from_error(&io).message(), Some("disk full"));

        let poisoned = SubmitError::from(FormError::StatePoisoned("reading form"));
        assert_eq!(
            poisoned.message(),
            Some("form state lock poisoned while reading form")
        );
    }

    #[test]
    fn submit_options_forward_validation_flags() {
        let options = SubmitOptions {
            keep_response: true,
            should_touched: true,
            should_focus: false,
            ..SubmitOptions::default()
        };
        let validate = ValidateOptions::from(options);
        assert!(validate.should_active);
        assert!(validate.should_touched);
        assert!(!validate.should_dirty);
        assert!(!validate.should_focus);
    }
}
