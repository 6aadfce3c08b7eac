//! Request lifecycle and loading indicators.
//!
//! A [`Call`] identifies one in-flight request and can cancel it. The
//! [`Lifecycle`] shows an [`Indicator`] when a call starts and dismisses it
//! when the call ends. Cancelling the indicator cancels the call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use derive_more::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// ============================================================================
// Call
// ============================================================================

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("call-{_0}")]
pub struct CallId(u64);

/// Handle to an in-flight request.
///
/// Clones share the same identity and cancellation.
#[derive(Debug, Clone)]
pub struct Call {
    id: CallId,
    token: CancellationToken,
}

impl Call {
    /// Create a handle with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: CallId(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed)),
            token: CancellationToken::new(),
        }
    }

    /// Identity of this call.
    #[must_use]
    pub const fn id(&self) -> CallId {
        self.id
    }

    /// Cancel the call. Cancelling twice is harmless.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the call was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token transports watch to abort the call.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for Call {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Indicator
// ============================================================================

/// A cancellable loading indicator, such as a progress dialog.
pub trait Indicator: Send {
    /// Display the indicator.
    fn show(&mut self);

    /// Hide the indicator.
    fn dismiss(&mut self);

    /// Register the callback to run when the user cancels the indicator.
    fn on_cancel(&mut self, callback: Box<dyn FnOnce() + Send>);
}

/// Creates indicators bound to a UI context.
pub trait IndicatorFactory: Send + Sync {
    /// UI context an indicator is attached to.
    type Context: ?Sized;

    /// Indicator type produced.
    type Indicator: Indicator;

    /// Create an indicator displaying `message`.
    fn create(&self, context: &Self::Context, message: &str) -> Self::Indicator;
}

/// Factory for headless use: no context, nothing displayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

/// Indicator that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopIndicator;

impl Indicator for NoopIndicator {
    fn show(&mut self) {}

    fn dismiss(&mut self) {}

    fn on_cancel(&mut self, _callback: Box<dyn FnOnce() + Send>) {}
}

impl IndicatorFactory for Headless {
    type Context = ();
    type Indicator = NoopIndicator;

    fn create(&self, _context: &(), _message: &str) -> NoopIndicator {
        NoopIndicator
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Tracks the indicator of every started call.
///
/// At most one indicator exists per call. Indicator methods run outside
/// the map lock.
pub struct Lifecycle<F: IndicatorFactory> {
    factory: F,
    message: String,
    cancelable: bool,
    indicators: Mutex<HashMap<CallId, F::Indicator>>,
}

impl<F: IndicatorFactory> std::fmt::Debug for Lifecycle<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("message", &self.message)
            .field("cancelable", &self.cancelable)
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}

impl<F: IndicatorFactory> Lifecycle<F> {
    /// Create a lifecycle whose indicators display `message`.
    ///
    /// When `cancelable` is set, cancelling an indicator cancels its call.
    #[must_use]
    pub fn new(factory: F, message: impl Into<String>, cancelable: bool) -> Self {
        Self {
            factory,
            message: message.into(),
            cancelable,
            indicators: Mutex::new(HashMap::new()),
        }
    }

    fn indicators(&self) -> MutexGuard<'_, HashMap<CallId, F::Indicator>> {
        self.indicators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Show an indicator for `call`.
    ///
    /// Without a context nothing is shown. Starting a call that already has
    /// an indicator dismisses the previous one.
    pub fn start(&self, context: Option<&F::Context>, call: &Call) {
        let Some(context) = context else {
            return;
        };

        let mut indicator = self.factory.create(context, &self.message);
        if self.cancelable {
            let call = call.clone();
            indicator.on_cancel(Box::new(move || call.cancel()));
        }
        indicator.show();
        debug!(call = %call.id(), "indicator shown");

        let previous = self.indicators().insert(call.id(), indicator);
        if let Some(mut previous) = previous {
            warn!(call = %call.id(), "call started twice, dismissing previous indicator");
            previous.dismiss();
        }
    }

    /// Dismiss the indicator of `call`, if any.
    pub fn end(&self, call: &Call) {
        let indicator = self.indicators().remove(&call.id());
        if let Some(mut indicator) = indicator {
            indicator.dismiss();
            debug!(call = %call.id(), "indicator dismissed");
        }
    }

    /// Returns `true` if `call` has an indicator.
    #[must_use]
    pub fn is_active(&self, call: &Call) -> bool {
        self.indicators().contains_key(&call.id())
    }

    /// Number of indicators currently shown.
    #[must_use]
    pub fn active(&self) -> usize {
        self.indicators().len()
    }
}
