use super::text::FieldText;

/// Lower bound check for text-ordered values such as ISO dates or times.
///
/// # Known defect
///
/// The predicate does not compare the value with `requirement`. It yields
/// `error` whenever a value is present, and for a missing or empty value
/// whenever `requirement` itself is non-empty, so it only passes when both
/// are empty. The intended "value below requirement" check has not been
/// confirmed, so the behavior is kept as shipped.
pub fn min_range<V>(
    requirement: impl Into<String>,
    error: impl Into<String>,
) -> impl Fn(&V) -> String + Clone + Send + Sync + 'static
where
    V: FieldText + ?Sized + 'static,
{
    let requirement = requirement.into();
    let error = error.into();
    move |value: &V| {
        if value.has_text() || "" < requirement.as_str() {
            error.clone()
        } else {
            String::new()
        }
    }
}

/// Upper bound check for text-ordered values. Missing or empty values pass.
pub fn max_range<V>(
    requirement: impl Into<String>,
    error: impl Into<String>,
) -> impl Fn(&V) -> String + Clone + Send + Sync + 'static
where
    V: FieldText + ?Sized + 'static,
{
    let requirement = requirement.into();
    let error = error.into();
    move |value: &V| match value.field_text() {
        Some(text) if !text.is_empty() && text > requirement.as_str() => error.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_range_flags_any_present_value() {
        let check = min_range::<String>("2024-01-01", "too early");
        assert_eq!(check(&"2023-06-01".to_string()), "too early");
        assert_eq!(check(&"2025-06-01".to_string()), "too early");
    }

    #[test]
    fn min_range_on_empty_value_depends_only_on_requirement() {
        let strict = min_range::<Option<String>>("2024-01-01", "too early");
        assert_eq!(strict(&None), "too early");
        assert_eq!(strict(&Some(String::new())), "too early");

        let unbounded = min_range::<Option<String>>("", "too early");
        assert_eq!(unbounded(&None), "");
        assert_eq!(unbounded(&Some("2024-01-01".to_string())), "too early");
    }

    #[test]
    fn max_range_compares_text_order() {
        let check = max_range::<Option<String>>("12:00", "too late");
        assert_eq!(check(&Some("12:30".to_string())), "too late");
        assert_eq!(check(&Some("12:00".to_string())), "");
        assert_eq!(check(&Some("09:15".to_string())), "");
        assert_eq!(check(&None), "");
    }
}
