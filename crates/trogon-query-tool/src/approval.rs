//! Consent as a type.
//!
//! [`QueryExecutor::invoke`](crate::QueryExecutor::invoke) only accepts an
//! [`Approved`] value, and the only way to obtain one is to call
//! [`PendingApproval::approve`].

/// A tool call the model proposed and nobody has decided on yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingApproval<T> {
    request: T,
}

impl<T> PendingApproval<T> {
    pub fn new(request: T) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &T {
        &self.request
    }

    pub fn approve(self) -> Approved<T> {
        Approved { request: self.request }
    }

    /// Decline the call, handing the request back.
    pub fn deny(self) -> T {
        self.request
    }
}

/// Proof that a human approved this request.
#[derive(Debug, Clone, PartialEq)]
pub struct Approved<T> {
    request: T,
}

impl<T> Approved<T> {
    pub fn request(&self) -> &T {
        &self.request
    }

    pub fn into_inner(self) -> T {
        self.request
    }
}
