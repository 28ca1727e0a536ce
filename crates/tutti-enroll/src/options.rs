//! Request options for enrollment operations.

use tutti_core::enums::EnrollmentMethod;
use tutti_store::TransactionHandle;

/// Options for `enroll_student` and `add_to_waitlist`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollOptions {
    pub method: EnrollmentMethod,
    /// Actor recorded on the records; falls back to the configured default.
    pub performed_by: Option<String>,
    /// Free-text reason stored in the mirror's audit entry.
    pub reason: Option<String>,
    /// Forwarded to every store call untouched.
    pub transaction: Option<TransactionHandle>,
}

impl EnrollOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn method(mut self, method: EnrollmentMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
        self.performed_by = Some(actor.into());
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn transaction(mut self, handle: TransactionHandle) -> Self {
        self.transaction = Some(handle);
        self
    }
}

/// Options for `unenroll_student`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnenrollOptions {
    pub performed_by: Option<String>,
    pub reason: Option<String>,
    pub transaction: Option<TransactionHandle>,
}

impl UnenrollOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
        self.performed_by = Some(actor.into());
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn transaction(mut self, handle: TransactionHandle) -> Self {
        self.transaction = Some(handle);
        self
    }
}
