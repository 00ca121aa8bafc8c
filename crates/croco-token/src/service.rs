use std::sync::Arc;

use parking_lot::Mutex;

use crate::address::Address;
use crate::calls::{CallOutput, ReceiptId, TokenCall};
use crate::error::TokenError;
use crate::snapshot::TokenSnapshot;
use crate::token::CrocoToken;

/// Shared handle to a single token. Every access holds the lock for the
/// whole call, so calls from different threads are applied one after
/// another and each sees the previous call fully applied.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<Mutex<CrocoToken>>,
}

impl TokenService {
    pub fn new(token: CrocoToken) -> Self {
        Self {
            inner: Arc::new(Mutex::new(token)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&CrocoToken) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut CrocoToken) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn execute(&self, caller: Address, call: &TokenCall) -> Result<CallOutput, TokenError> {
        self.inner.lock().execute(caller, call)
    }

    pub fn submit(
        &self,
        caller: Address,
        calls: &[TokenCall],
        receipt_id: ReceiptId,
    ) -> Result<Vec<CallOutput>, TokenError> {
        self.inner.lock().apply_calls(caller, calls, receipt_id)
    }

    pub fn snapshot(&self) -> TokenSnapshot {
        self.inner.lock().snapshot()
    }

    /// Clone of the current state.
    pub fn token(&self) -> CrocoToken {
        self.inner.lock().clone()
    }
}
