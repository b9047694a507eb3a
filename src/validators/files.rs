pub trait FileLike {
    /// Size in bytes.
    fn size(&self) -> u64;
}

/// A picked file as reported by the host's file input.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: None,
        }
    }
}

impl FileLike for SelectedFile {
    fn size(&self) -> u64 {
        self.size
    }
}

/// Field values holding a list of files.
pub trait FileList {
    /// Summed size of every file, or `None` when no list is present.
    fn total_size(&self) -> Option<u64>;
}

impl<F: FileLike> FileList for [F] {
    fn total_size(&self) -> Option<u64> {
        Some(
            self.iter()
                .fold(0u64, |total, file| total.saturating_add(file.size())),
        )
    }
}

impl<F: FileLike> FileList for Vec<F> {
    fn total_size(&self) -> Option<u64> {
        self.as_slice().total_size()
    }
}

impl<F: FileLike> FileList for Option<Vec<F>> {
    fn total_size(&self) -> Option<u64> {
        self.as_deref().and_then(|files| files.total_size())
    }
}

/// Fails when the files together exceed `requirement` bytes. A missing list
/// counts as empty.
pub fn max_total_size<V>(
    requirement: u64,
    error: impl Into<String>,
) -> impl Fn(&V) -> String + Clone + Send + Sync + 'static
where
    V: FileList + ?Sized + 'static,
{
    let error = error.into();
    move |value: &V| {
        if value.total_size().unwrap_or(0) > requirement {
            error.clone()
        } else {
            String::new()
        }
    }
}

/// Fails when a present list adds up to less than `requirement` bytes. A
/// missing list passes.
pub fn min_total_size<V>(
    requirement: u64,
    error: impl Into<String>,
) -> impl Fn(&V) -> String + Clone + Send + Sync + 'static
where
    V: FileList + ?Sized + 'static,
{
    let error = error.into();
    move |value: &V| {
        if value.total_size().is_some_and(|size| size < requirement) {
            error.clone()
        } else {
            String::new()
        }
    }
}
