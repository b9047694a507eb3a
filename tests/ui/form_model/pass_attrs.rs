use calmform::form::{FieldKey, FieldLens, FormModel};

#[derive(Clone, calmform::form::FormModel)]
struct UploadForm {
    #[form(key = "display_name")]
    name: String,
    files: Vec<u64>,
    #[form(skip)]
    #[allow(dead_code)]
    draft_id: Option<u32>,
}

fn main() {
    assert_eq!(UploadForm::fields().name().key().as_str(), "display_name");
    assert_eq!(
        UploadForm::field_keys(),
        vec![FieldKey::new("display_name"), FieldKey::new("files")]
    );
    assert_eq!(UploadFormFields::KEYS.len(), 2);
}
