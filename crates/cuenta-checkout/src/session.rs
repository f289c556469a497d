//! # Session State
//!
//! The register's working state: one cart, the mode it is in, and the
//! payments tendered so far.
//!
//! ## Thread Safety
//! The state is wrapped in `Arc<Mutex<T>>` because:
//! 1. Several workflows may touch the session concurrently
//! 2. Only one of them may change it at a time
//! 3. The lock is never held across an `.await` (store calls happen between
//!    two short critical sections)
//!
//! ## Write Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize_sale() / save_as_account() / add_to_account() / ...           │
//! │                                                                         │
//! │  lock ─► pending = Some(kind) ─► snapshot cart/mode/payments ─► unlock │
//! │                                   │                                     │
//! │                       SaleStore / AccountStore (await)                  │
//! │                                   │                                     │
//! │  guard drop ─► reset (complete) or keep ─► pending = None              │
//! │                                                                         │
//! │  While a write is pending every mutation, and every other write, fails │
//! │  with FinalizationInProgress or AccountWriteInProgress. Reads are      │
//! │  still served.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use cuenta_core::{Cart, CartMode, Payment, TaxRate};

use crate::error::{CheckoutError, CheckoutResult};

/// The store write a session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingWrite {
    /// `finalize_sale`
    Finalization,
    /// Saving, merging into, committing or cancelling an account.
    AccountWrite,
}

impl PendingWrite {
    /// The error a competing call receives.
    pub fn in_progress(self) -> CheckoutError {
        match self {
            PendingWrite::Finalization => CheckoutError::FinalizationInProgress,
            PendingWrite::AccountWrite => CheckoutError::AccountWriteInProgress,
        }
    }
}

/// Everything a session holds between workflow calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub cart: Cart,
    pub mode: CartMode,
    pub payments: Vec<Payment>,
    pub pending: Option<PendingWrite>,
}

impl SessionState {
    /// A fresh session with an empty cart taxed at `tax_rate`.
    pub fn new(tax_rate: TaxRate) -> Self {
        SessionState {
            cart: Cart::new().with_tax_rate(tax_rate),
            mode: CartMode::Fresh,
            payments: Vec::new(),
            pending: None,
        }
    }

    /// Back to an empty fresh cart with no payments. The tax rate is kept.
    pub fn reset(&mut self) {
        self.cart.clear();
        self.mode = CartMode::Fresh;
        self.payments.clear();
    }

    /// Fails while a store write is pending.
    pub fn ensure_idle(&self) -> CheckoutResult<()> {
        match self.pending {
            Some(write) => Err(write.in_progress()),
            None => Ok(()),
        }
    }
}

/// Shared handle to one session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn new(tax_rate: TaxRate) -> Self {
        SessionHandle {
            state: Arc::new(Mutex::new(SessionState::new(tax_rate))),
        }
    }

    // Poisoning is ignored: closures validate before they mutate.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-only access.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SessionState) -> R,
    {
        let state = self.lock();
        f(&state)
    }

    /// Exclusive access, refused while a store write is pending.
    pub fn with_session_mut<F, R>(&self, f: F) -> CheckoutResult<R>
    where
        F: FnOnce(&mut SessionState) -> CheckoutResult<R>,
    {
        let mut state = self.lock();
        state.ensure_idle()?;
        f(&mut state)
    }

    /// Marks `write` pending after `check` accepts the state.
    ///
    /// The returned guard holds a copy of the state being written and clears
    /// the mark when dropped, also when the calling future is dropped
    /// mid-await.
    pub fn begin_write<F>(&self, write: PendingWrite, check: F) -> CheckoutResult<WriteGuard>
    where
        F: FnOnce(&SessionState) -> CheckoutResult<()>,
    {
        let mut state = self.lock();
        state.ensure_idle()?;
        check(&state)?;
        state.pending = Some(write);

        Ok(WriteGuard {
            snapshot: state.clone(),
            session: self.clone(),
            reset_on_drop: false,
        })
    }
}

/// A pending store write.
///
/// Dropping the guard keeps cart, mode and payments as they were. Calling
/// [`complete`](WriteGuard::complete) resets the session first.
#[derive(Debug)]
pub struct WriteGuard {
    snapshot: SessionState,
    session: SessionHandle,
    reset_on_drop: bool,
}

impl WriteGuard {
    /// The session as it was when the write began.
    pub fn snapshot(&self) -> &SessionState {
        &self.snapshot
    }

    /// Ends the write and starts a new, empty sale.
    pub fn complete(mut self) {
        self.reset_on_drop = true;
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        if self.reset_on_drop {
            state.reset();
        }
        state.pending = None;
    }
}
