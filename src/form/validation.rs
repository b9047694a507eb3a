use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures_timer::Delay;

use super::store::{
    AsyncFieldValidatorEntry, AsyncFieldValidatorFn, FieldKey, FormResult, FormStore,
    SyncFieldValidatorFn, SyncFormValidatorFn, ValidationMode, ValidationTicket, read_lock,
    write_lock,
};

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;

    /// Fields the store knows about before any of them is touched.
    fn field_keys() -> Vec<FieldKey> {
        Vec::new()
    }
}

/// Shared field validator: yields an error message, or an empty string when
/// the value is acceptable.
pub type FieldValidateFn<V> = Arc<dyn Fn(&V) -> String + Send + Sync>;

/// Ordered validators for one field. The first non-empty message wins.
///
/// Built from nothing (`ValidateList::default()`), a single validator via
/// `From`, or any iterator of validators via `collect`.
pub struct ValidateList<V> {
    validators: Vec<FieldValidateFn<V>>,
}

impl<V> ValidateList<V> {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn with(mut self, validator: impl Fn(&V) -> String + Send + Sync + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn first_error(&self, value: &V) -> Option<String> {
        self.validators
            .iter()
            .map(|validator| validator(value))
            .find(|message| !message.is_empty())
    }
}

impl<V> Default for ValidateList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ValidateList<V> {
    fn clone(&self) -> Self {
        Self {
            validators: self.validators.clone(),
        }
    }
}

impl<V, F> From<F> for ValidateList<V>
where
    F: Fn(&V) -> String + Send + Sync + 'static,
{
    fn from(validator: F) -> Self {
        Self::new().with(validator)
    }
}

impl<V, F> FromIterator<F> for ValidateList<V>
where
    F: Fn(&V) -> String + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = F>>(validators: I) -> Self {
        Self {
            validators: validators
                .into_iter()
                .map(|validator| Arc::new(validator) as FieldValidateFn<V>)
                .collect(),
        }
    }
}

pub trait AsyncFieldValidator<V>: Send + Sync {
    fn validate(&self, value: V) -> BoxFuture<'static, String>;
}

impl<V, F, Fut> AsyncFieldValidator<V> for F
where
    F: Fn(V) -> Fut + Send + Sync,
    Fut: Future<Output = String> + Send + 'static,
{
    fn validate(&self, value: V) -> BoxFuture<'static, String> {
        (self)(value).boxed()
    }
}

/// Cross-field validation over the whole model.
pub trait FormValidator<T>: Send + Sync {
    fn validate(&self, model: &T) -> Vec<(FieldKey, String)>;
}

impl<T, F> FormValidator<T> for F
where
    F: Fn(&T) -> Vec<(FieldKey, String)> + Send + Sync,
{
    fn validate(&self, model: &T) -> Vec<(FieldKey, String)> {
        (self)(model)
    }
}

/// Controls which fields take part in a form-wide validation and whether the
/// first invalid one receives focus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValidateOptions {
    pub should_active: bool,
    pub should_touched: bool,
    pub should_dirty: bool,
    pub should_focus: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            should_active: true,
            should_touched: false,
            should_dirty: false,
            should_focus: true,
        }
    }
}

/// Lowers the validating flags raised by [`FormStore::validate`] when it
/// exits before writing its result, e.g. when its future is dropped.
struct ValidatingGuard<'a, T>
where
    T: FormModel,
{
    form: &'a FormStore<T>,
    fields: Vec<FieldKey>,
    finished: bool,
}

impl<T> Drop for ValidatingGuard<'_, T>
where
    T: FormModel,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        {
            let mut state = match self.form.state.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.validating = false;
            for key in &self.fields {
                if let Some(meta) = state.field_meta.get_mut(key) {
                    meta.validating = false;
                }
            }
        }
        self.form.notifier.notify();
        tracing::debug!(fields = self.fields.len(), "form validation abandoned");
    }
}

impl<T> FormStore<T>
where
    T: FormModel,
{
    pub fn register_field_validator<L>(
        &self,
        lens: L,
        validate: impl Into<ValidateList<L::Value>>,
    ) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let wrapped = validate
            .into()
            .validators
            .into_iter()
            .map(|validator| {
                let wrapped: SyncFieldValidatorFn<T> =
                    Arc::new(move |model: &T| validator(lens.get(model)));
                wrapped
            })
            .collect::<Vec<_>>();
        {
            let mut validators =
                write_lock(&self.field_validators, "registering field validator")?;
            validators.entry(key).or_default().extend(wrapped);
        }
        write_lock(&self.state, "registering validated field")?.ensure_meta(key);
        Ok(())
    }

    pub fn register_async_field_validator<L, V>(&self, lens: L, validator: V) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<L::Value> + 'static,
    {
        self.register_async_field_validator_with_debounce(lens, 0, validator)
    }

    /// Change-triggered runs wait `debounce_ms` and are dropped if a newer
    /// change arrived meanwhile. Submit-time validation never waits.
    pub fn register_async_field_validator_with_debounce<L, V>(
        &self,
        lens: L,
        debounce_ms: u64,
        validator: V,
    ) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<L::Value> + 'static,
    {
        let key = lens.key();
        let validator = Arc::new(validator);
        let wrapped: AsyncFieldValidatorFn<T> = Arc::new(move |model: &T| {
            AsyncFieldValidator::validate(&*validator, lens.get(model).clone())
        });
        let entry = AsyncFieldValidatorEntry {
            debounce: Duration::from_millis(debounce_ms),
            validator: wrapped,
        };
        {
            let mut validators = write_lock(
                &self.async_field_validators,
                "registering async field validator",
            )?;
            validators.entry(key).or_default().push(entry);
        }
        write_lock(&self.state, "registering async validated field")?.ensure_meta(key);
        Ok(())
    }

    pub fn register_form_validator<V>(&self, validator: V) -> FormResult<()>
    where
        V: FormValidator<T> + 'static,
    {
        let validator = Arc::new(validator);
        let wrapped: SyncFormValidatorFn<T> =
            Arc::new(move |model: &T| FormValidator::validate(&*validator, model));
        let mut validators = write_lock(&self.form_validators, "registering form validator")?;
        validators.push(wrapped);
        Ok(())
    }

    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let submitted = self.write("writing field value", |state| {
            lens.set(&mut state.values, value);
            let is_dirty = lens.get(&state.values) != lens.get(&state.initial_values);
            state.ensure_meta(key).dirty = is_dirty;
            state.submitted
        })?;

        if self.validates_on(ValidationMode::OnChange, submitted) {
            let _ = self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    pub fn touch<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let submitted = self.write("touching field", |state| {
            state.ensure_meta(key).touched = true;
            state.submitted
        })?;

        if self.validates_on(ValidationMode::OnBlur, submitted) {
            let _ = self.validate_field_by_key(key)?;
        }
        Ok(())
    }

    pub async fn set_async<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.set(lens, value)?;
        // A sync failure already decided the field.
        let submitted = self.is_submitted()?;
        if self.validates_on(ValidationMode::OnChange, submitted) && !self.has_error(key)? {
            let _ = self.validate_field_async_registered_by_key(key).await?;
        }
        Ok(())
    }

    pub async fn touch_async<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.touch(lens)?;
        let submitted = self.is_submitted()?;
        if self.validates_on(ValidationMode::OnBlur, submitted) && !self.has_error(key)? {
            let _ = self.validate_field_async_registered_by_key(key).await?;
        }
        Ok(())
    }

    pub fn validate_field<L>(&self, lens: L) -> FormResult<bool>
    where
        L: FieldLens<T>,
    {
        self.validate_field_by_key(lens.key())
    }

    /// Runs every validator for the participating fields, records their
    /// errors and reports whether all of them passed.
    ///
    /// Fields filtered out by `options` keep their previous error.
    pub async fn validate(&self, options: ValidateOptions) -> FormResult<bool> {
        let known_keys = self.known_field_keys()?;
        let (model, participants) = self.write("starting form validation", |state| {
            state.validating = true;
            let mut participants = Vec::new();
            for key in known_keys {
                let meta = state.ensure_meta(key);
                let takes_part = (!options.should_active || meta.active)
                    && (!options.should_touched || meta.touched)
                    && (!options.should_dirty || meta.dirty);
                if takes_part {
                    meta.validating = true;
                    participants.push(key);
                }
            }
            (state.values.clone(), participants)
        })?;
        let mut in_flight = ValidatingGuard {
            form: self,
            fields: participants.clone(),
            finished: false,
        };

        let form_errors = self.run_form_validators(&model)?;
        let sync_validators =
            read_lock(&self.field_validators, "reading field validators for form")?.clone();
        let async_validators = read_lock(
            &self.async_field_validators,
            "reading async validators for form",
        )?
        .clone();

        let mut results = Vec::with_capacity(participants.len());
        for key in participants {
            let mut error = sync_validators
                .get(&key)
                .into_iter()
                .flatten()
                .map(|validator| validator(&model))
                .find(|message| !message.is_empty());
            if error.is_none() {
                for entry in async_validators.get(&key).into_iter().flatten() {
                    let message = (entry.validator)(&model).await;
                    if !message.is_empty() {
                        error = Some(message);
                        break;
                    }
                }
            }
            let error = error.or_else(|| form_errors.get(&key).cloned());
            results.push((key, error));
        }

        let valid = results.iter().all(|(_, error)| error.is_none());
        let first_invalid = results
            .iter()
            .find_map(|(key, error)| error.is_some().then_some(*key));
        let checked = results.len();
        self.write("applying form validation result", |state| {
            for (key, error) in results {
                let meta = state.ensure_meta(key);
                meta.validating = false;
                meta.error = error;
            }
            state.validating = false;
        })?;
        in_flight.finished = true;

        tracing::debug!(valid, checked, "validated form");
        if let Some(key) = first_invalid.filter(|_| options.should_focus) {
            if !self.focus(key)? {
                tracing::trace!(field = %key, "no focus handler for first invalid field");
            }
        }
        Ok(valid)
    }

    fn validates_on(&self, trigger: ValidationMode, submitted: bool) -> bool {
        self.options.validate_mode == trigger
            || (submitted && self.options.revalidate_mode.matches(trigger))
    }

    fn run_form_validators(&self, model: &T) -> FormResult<BTreeMap<FieldKey, String>> {
        let validators = read_lock(&self.form_validators, "reading form validators")?.clone();
        let mut errors = BTreeMap::new();
        for validator in validators {
            for (key, message) in validator(model) {
                if !message.is_empty() {
                    errors.entry(key).or_insert(message);
                }
            }
        }
        Ok(errors)
    }

    pub(super) fn validate_field_by_key(&self, key: FieldKey) -> FormResult<bool> {
        let model = self.values()?;
        let validators = read_lock(&self.field_validators, "reading field validators for key")?
            .get(&key)
            .cloned()
            .unwrap_or_default();

        let mut form_errors = self.run_form_validators(&model)?;
        let error = validators
            .iter()
            .map(|validator| validator(&model))
            .find(|message| !message.is_empty())
            .or_else(|| form_errors.remove(&key));
        let valid = error.is_none();

        self.write("writing field validation result", |state| {
            let meta = state.ensure_meta(key);
            meta.validating = false;
            meta.error = error;
        })?;
        Ok(valid)
    }

    pub(super) async fn validate_field_async_registered_by_key(
        &self,
        key: FieldKey,
    ) -> FormResult<Vec<ValidationTicket>> {
        let validators = read_lock(
            &self.async_field_validators,
            "reading registered async validators",
        )?
        .get(&key)
        .cloned()
        .unwrap_or_default();

        let mut tickets = Vec::with_capacity(validators.len());
        for entry in validators {
            let ticket = self.write("starting registered async validation", |state| {
                let next = ValidationTicket(
                    state
                        .tickets
                        .get(&key)
                        .copied()
                        .unwrap_or(ValidationTicket(0))
                        .0
                        + 1,
                );
                state.tickets.insert(key, next);
                state.ensure_meta(key).validating = true;
                next
            })?;

            if !entry.debounce.is_zero() {
                Delay::new(entry.debounce).await;
                if !self.is_latest_ticket(key, ticket)? {
                    continue;
                }
            }

            // Debounced runs read the value as of now, not as of the change.
            let model = self.values()?;
            let message = (entry.validator)(&model).await;
            let failed = !message.is_empty();
            self.finish_async_validation(key, ticket, message)?;
            tickets.push(ticket);
            if failed {
                break;
            }
        }
        Ok(tickets)
    }

    fn has_error(&self, key: FieldKey) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading field error")?
            .field_meta
            .get(&key)
            .is_some_and(|meta| meta.error.is_some()))
    }

    fn is_latest_ticket(&self, key: FieldKey, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?
            .tickets
            .get(&key)
            .copied()
            == Some(ticket))
    }

    fn finish_async_validation(
        &self,
        key: FieldKey,
        ticket: ValidationTicket,
        message: String,
    ) -> FormResult<()> {
        self.write("finishing async validation", |state| {
            if state.tickets.get(&key).copied() != Some(ticket) {
                return;
            }
            let meta = state.ensure_meta(key);
            meta.validating = false;
            meta.error = (!message.is_empty()).then_some(message);
        })
    }
}
