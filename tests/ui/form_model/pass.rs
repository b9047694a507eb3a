use calmform::form::{FieldLens, FormModel};

#[derive(Clone, calmform::form::FormModel)]
struct ContactForm {
    email: String,
}

fn main() {
    let fields = ContactForm::fields();
    let lens = fields.email();
    let mut model = ContactForm {
        email: "a@example.com".to_string(),
    };
    lens.set(&mut model, "b@example.com".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "b@example.com");
    assert_eq!(ContactForm::field_keys().len(), 1);
}
