use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use super::response::Response;
use super::validation::{FieldLens, FormModel};
use crate::reactivity::{Notifier, SubscriptionId};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

/// When a field is validated before the first submit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

/// When a field is validated again once the form has been submitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevalidateMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

impl RevalidateMode {
    pub(super) fn matches(self, trigger: ValidationMode) -> bool {
        matches!(
            (self, trigger),
            (RevalidateMode::OnChange, ValidationMode::OnChange)
                | (RevalidateMode::OnBlur, ValidationMode::OnBlur)
                | (RevalidateMode::OnSubmit, ValidationMode::OnSubmit)
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    pub revalidate_mode: RevalidateMode,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnSubmit,
            revalidate_mode: RevalidateMode::OnChange,
        }
    }
}

/// Which pieces of submit state survive [`FormStore::reset`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResetOptions {
    pub keep_response: bool,
    pub keep_submit_count: bool,
    pub keep_submitted: bool,
    pub keep_values: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMeta {
    /// Inactive fields (hidden, unmounted) are skipped by validation when
    /// `should_active` is set.
    pub active: bool,
    pub touched: bool,
    pub dirty: bool,
    pub validating: bool,
    pub error: Option<String>,
}

impl Default for FieldMeta {
    fn default() -> Self {
        Self {
            active: true,
            touched: false,
            dirty: false,
            validating: false,
            error: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T> {
    pub values: T,
    pub response: Option<Response>,
    pub submit_count: u32,
    pub submitted: bool,
    pub submitting: bool,
    pub validating: bool,
    pub touched: bool,
    pub dirty: bool,
    pub invalid: bool,
    pub field_meta: BTreeMap<FieldKey, FieldMeta>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("batch strategy returned without running the submit reset")]
    BatchSkipped,
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SyncFieldValidatorFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
pub(super) type SyncFormValidatorFn<T> = Arc<dyn Fn(&T) -> Vec<(FieldKey, String)> + Send + Sync>;
pub(super) type AsyncFieldValidatorFn<T> =
    Arc<dyn Fn(&T) -> BoxFuture<'static, String> + Send + Sync>;
pub(super) type FocusHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub(super) struct AsyncFieldValidatorEntry<T> {
    pub(super) debounce: Duration,
    pub(super) validator: AsyncFieldValidatorFn<T>,
}

pub(super) struct FormState<T> {
    pub(super) id: FormId,
    pub(super) initial_values: T,
    pub(super) values: T,
    pub(super) response: Option<Response>,
    pub(super) submit_count: u32,
    pub(super) submitted: bool,
    pub(super) submitting: bool,
    pub(super) validating: bool,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta>,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
}

impl<T> FormState<T> {
    pub(super) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta {
        self.field_meta.entry(key).or_default()
    }
}

/// Shared handle to one form's live state.
///
/// Cloning is cheap and every clone observes the same form. Each write
/// notifies subscribers once, unless it runs inside a [`Notifier`] batch.
#[derive(Clone)]
pub struct FormStore<T>
where
    T: FormModel,
{
    pub(super) options: FormOptions,
    pub(super) state: Arc<RwLock<FormState<T>>>,
    pub(super) field_validators: Arc<RwLock<BTreeMap<FieldKey, Vec<SyncFieldValidatorFn<T>>>>>,
    pub(super) async_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<AsyncFieldValidatorEntry<T>>>>>,
    pub(super) form_validators: Arc<RwLock<Vec<SyncFormValidatorFn<T>>>>,
    pub(super) focus_handlers: Arc<RwLock<BTreeMap<FieldKey, FocusHandler>>>,
    pub(super) notifier: Notifier,
}

impl<T> FormStore<T>
where
    T: FormModel,
{
    pub fn new(initial: T, options: FormOptions) -> Self {
        let field_meta = T::field_keys()
            .into_iter()
            .map(|key| (key, FieldMeta::default()))
            .collect();
        Self {
            options,
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                initial_values: initial.clone(),
                values: initial,
                response: None,
                submit_count: 0,
                submitted: false,
                submitting: false,
                validating: false,
                field_meta,
                tickets: BTreeMap::new(),
            })),
            field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            async_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            form_validators: Arc::new(RwLock::new(Vec::new())),
            focus_handlers: Arc::new(RwLock::new(BTreeMap::new())),
            notifier: Notifier::new(),
        }
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    /// The notifier doubles as a [`crate::reactivity::Batch`] strategy that
    /// coalesces this store's notifications.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub(super) fn write<R>(
        &self,
        context: &'static str,
        f: impl FnOnce(&mut FormState<T>) -> R,
    ) -> FormResult<R> {
        let result = {
            let mut state = write_lock(&self.state, context)?;
            f(&mut *state)
        };
        self.notifier.notify();
        Ok(result)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values: state.values.clone(),
            response: state.response.clone(),
            submit_count: state.submit_count,
            submitted: state.submitted,
            submitting: state.submitting,
            validating: state.validating,
            touched: state.field_meta.values().any(|meta| meta.touched),
            dirty: state.field_meta.values().any(|meta| meta.dirty),
            invalid: state.field_meta.values().any(|meta| meta.error.is_some()),
            field_meta: state.field_meta.clone(),
        })
    }

    pub fn values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading form values")?.values.clone())
    }

    pub fn value<L>(&self, lens: L) -> FormResult<L::Value>
    where
        L: FieldLens<T>,
    {
        Ok(lens
            .get(&read_lock(&self.state, "reading field value")?.values)
            .clone())
    }

    pub fn field_meta<L>(&self, lens: L) -> FormResult<Option<FieldMeta>>
    where
        L: FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field meta")?
            .field_meta
            .get(&lens.key())
            .cloned())
    }

    pub fn response(&self) -> FormResult<Option<Response>> {
        Ok(read_lock(&self.state, "reading response")?.response.clone())
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading submitting flag")?.submitting)
    }

    pub fn is_submitted(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading submitted flag")?.submitted)
    }

    pub fn set_response(&self, response: Response) -> FormResult<()> {
        self.write("setting response", |state| state.response = Some(response))
    }

    pub fn clear_response(&self) -> FormResult<()> {
        self.write("clearing response", |state| state.response = None)
    }

    pub fn set_active<L>(&self, lens: L, active: bool) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        self.write("toggling field activity", |state| {
            state.ensure_meta(lens.key()).active = active;
        })
    }

    pub fn set_error<L>(&self, lens: L, error: impl Into<String>) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let error = error.into();
        self.write("setting field error", |state| {
            state.ensure_meta(lens.key()).error = (!error.is_empty()).then_some(error);
        })
    }

    pub fn clear_field_error<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        self.write("clearing field error", |state| {
            if let Some(meta) = state.field_meta.get_mut(&lens.key()) {
                meta.error = None;
                meta.validating = false;
            }
        })
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        self.write("clearing all field errors", |state| {
            for meta in state.field_meta.values_mut() {
                meta.error = None;
                meta.validating = false;
            }
        })
    }

    pub fn reset(&self, options: ResetOptions) -> FormResult<()> {
        self.write("resetting form", |state| {
            if !options.keep_values {
                state.values = state.initial_values.clone();
            }
            if !options.keep_response {
                state.response = None;
            }
            if !options.keep_submit_count {
                state.submit_count = 0;
            }
            if !options.keep_submitted {
                state.submitted = false;
            }
            state.validating = false;
            state.tickets.clear();
            for meta in state.field_meta.values_mut() {
                meta.touched = false;
                meta.validating = false;
                meta.error = None;
                if !options.keep_values {
                    meta.dirty = false;
                }
            }
        })
    }

    pub fn reset_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        self.write("resetting field", |state| {
            let initial_value = lens.get(&state.initial_values).clone();
            lens.set(&mut state.values, initial_value);
            state.tickets.remove(&lens.key());
            let meta = state.ensure_meta(lens.key());
            meta.dirty = false;
            meta.touched = false;
            meta.validating = false;
            meta.error = None;
        })
    }

    pub fn register_focus_handler<L>(
        &self,
        lens: L,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let mut handlers = write_lock(&self.focus_handlers, "registering focus handler")?;
        handlers.insert(lens.key(), Arc::new(handler));
        Ok(())
    }

    pub(super) fn focus(&self, key: FieldKey) -> FormResult<bool> {
        let handler = read_lock(&self.focus_handlers, "reading focus handlers")?
            .get(&key)
            .cloned();
        match handler {
            Some(handler) => {
                handler();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(super) fn known_field_keys(&self) -> FormResult<BTreeSet<FieldKey>> {
        let mut keys = BTreeSet::new();
        keys.extend(
            read_lock(&self.field_validators, "reading sync validator keys")?
                .keys()
                .copied(),
        );
        keys.extend(
            read_lock(&self.async_field_validators, "reading async validator keys")?
                .keys()
                .copied(),
        );
        keys.extend(
            read_lock(&self.state, "reading known keys from field metadata")?
                .field_meta
                .keys()
                .copied(),
        );
        Ok(keys)
    }
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
