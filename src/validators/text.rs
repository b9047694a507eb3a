/// Read access to a text-like field value. `None` means no value at all.
pub trait FieldText {
    fn field_text(&self) -> Option<&str>;

    fn has_text(&self) -> bool {
        self.field_text().is_some_and(|text| !text.is_empty())
    }
}

impl FieldText for str {
    fn field_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl FieldText for String {
    fn field_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl FieldText for Option<String> {
    fn field_text(&self) -> Option<&str> {
        self.as_deref()
    }
}

pub fn required<V>(error: impl Into<String>) -> impl Fn(&V) -> String + Clone + Send + Sync + 'static
where
    V: FieldText + ?Sized + 'static,
{
    let error = error.into();
    move |value: &V| {
        if value.has_text() {
            String::new()
        } else {
            error.clone()
        }
    }
}
