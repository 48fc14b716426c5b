use std::fmt::{Display, Formatter};

/// When a [`ResourceProvider`] operation fails, the error states which class of failure it was.
/// The class decides what the caller may still do: a `Conflict` leaves room for another
/// creation candidate, everything else aborts the invocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The provider rejected a creation attempt for capacity or limit reasons. The workflow
    /// may try its next candidate; exhausting all candidates is a `Provider` failure.
    Conflict,

    /// A bounded wait reached its attempt ceiling before the awaited transition happened.
    Timeout,

    /// Required input was missing or malformed. No provider call was made.
    Validation,

    /// Any other failure reported by the provider.
    Provider,
}

impl FailureKind {
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::Conflict => "The provider rejected the requested capacity",
            FailureKind::Timeout => "A wait was exhausted before the expected transition",
            FailureKind::Validation => "The request input was missing or invalid",
            FailureKind::Provider => "The provider reported a failure",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.message(), f)
    }
}

/// The error type returned by [`ResourceProvider`] operations.
#[derive(Debug)]
pub struct ProviderError {
    /// Which class of failure this is.
    kind: FailureKind,

    /// Any message to be included with the error. This will be included in the formatted
    /// display before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by [`ResourceProvider`] operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new_with_source_and_context<S, E>(kind: FailureKind, context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<E>(kind: FailureKind, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(kind: FailureKind, context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())?;
        if let Some(context) = self.context() {
            write!(f, ", {}", context)?;
        }
        if let Some(inner) = self.inner() {
            write!(f, ": {:?}", inner)?;
        }
        Ok(())
    }
}

// Make `ProviderError` function as a standard error.
impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `ProviderError` using a familiar
/// `context` function.
pub trait IntoProviderError<T> {
    /// Convert `self` into a `ProviderError`.
    fn context<S>(self, kind: FailureKind, message: S) -> ProviderResult<T>
    where
        S: Into<String>;
}

// Implement `IntoProviderError` for all standard `Error + Send + Sync + 'static` types.
impl<T, E> IntoProviderError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, kind: FailureKind, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| ProviderError::new_with_source_and_context(kind, message, e))
    }
}

// Implement `IntoProviderError` for options where `None` is converted into an error.
impl<T> IntoProviderError<T> for std::option::Option<T> {
    fn context<S>(self, kind: FailureKind, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| ProviderError::new_with_context(kind, message))
    }
}
