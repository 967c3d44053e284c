//! Debounced, staleness-guarded price recomputation.
//!
//! Overlapping in-flight computations are legal; ordering is guaranteed by
//! fingerprint comparison at response-application time, never by completion
//! order. The last-issued selection wins. Cancellation is advisory: a stale
//! request is not aborted in transport, its result is discarded on arrival.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::ResolverError;
use crate::pricing::{reconcile, DisplayAmounts, PriceQuote, RemotePrice};
use crate::selection::{SelectionFingerprint, SelectionSnapshot, SelectionView};

/// Transport or remote failure from the pricing collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PricingError(pub String);

#[async_trait]
pub trait PricingClient: Send + Sync {
    async fn compute_price(
        &self,
        snapshot: &SelectionSnapshot,
    ) -> Result<RemotePrice, PricingError>;
}

/// What the price panel shows for a given selection view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PriceDisplay {
    /// The minimum pricing fields are not all selected yet.
    Ineligible,
    /// A computation for the current selection is outstanding or imminent.
    Recalculating,
    Quoted(DisplayAmounts),
    /// The last recompute failed; the previous amounts are still shown.
    Stale(DisplayAmounts),
    /// The last recompute failed and there is no prior quote to fall back to.
    Failed,
}

/// Pure record of issued price requests and applied responses.
///
/// `latest` is the fingerprint of the newest selection handed to
/// [`PriceResolver::recompute`]; a response is applied only while its own
/// fingerprint still equals `latest`.
#[derive(Debug, Default)]
pub struct PriceBoard {
    quote: Option<PriceQuote>,
    latest: Option<SelectionFingerprint>,
    awaiting: Option<SelectionFingerprint>,
    failed: bool,
}

impl PriceBoard {
    /// Explicit clear for an ineligible selection. Distinct from transient
    /// failure: the previous quote is dropped, not retained.
    pub fn note_ineligible(&mut self, fingerprint: SelectionFingerprint) {
        self.latest = Some(fingerprint);
        self.awaiting = None;
        self.quote = None;
        self.failed = false;
    }

    pub fn begin(&mut self, fingerprint: SelectionFingerprint) {
        self.latest = Some(fingerprint);
        self.awaiting = Some(fingerprint);
    }

    pub fn is_current(&self, fingerprint: SelectionFingerprint) -> bool {
        self.latest == Some(fingerprint)
    }

    /// Applies a successful response unless it is stale. Returns whether it
    /// was applied.
    pub fn apply_success(
        &mut self,
        fingerprint: SelectionFingerprint,
        remote: RemotePrice,
        quantity: u32,
    ) -> bool {
        if !self.is_current(fingerprint) {
            return false;
        }
        self.quote = Some(PriceQuote::from_remote(remote, quantity, fingerprint));
        self.awaiting = None;
        self.failed = false;
        true
    }

    /// Records a failed response unless it is stale. The previous quote, if
    /// any, stays in place.
    pub fn apply_failure(&mut self, fingerprint: SelectionFingerprint) -> bool {
        if !self.is_current(fingerprint) {
            return false;
        }
        self.awaiting = None;
        self.failed = true;
        true
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        self.quote.as_ref()
    }

    pub fn display(&self, view: &SelectionView) -> PriceDisplay {
        if view.snapshot.is_none() {
            return PriceDisplay::Ineligible;
        }

        // A manual override is authoritative for display regardless of what
        // the resolver is doing underneath.
        if let Some(amounts) =
            reconcile(self.quote.as_ref(), view.quantity, view.custom_price_override)
        {
            if amounts.overridden {
                return PriceDisplay::Quoted(amounts);
            }
        }

        if self.awaiting == Some(view.fingerprint) {
            return PriceDisplay::Recalculating;
        }

        match &self.quote {
            Some(quote) => {
                let amounts = reconcile(Some(quote), view.quantity, None)
                    .expect("a held quote always reconciles");
                if self.failed {
                    PriceDisplay::Stale(amounts)
                } else if quote.fingerprint == view.fingerprint {
                    PriceDisplay::Quoted(amounts)
                } else {
                    PriceDisplay::Recalculating
                }
            }
            None if self.failed => PriceDisplay::Failed,
            None => PriceDisplay::Recalculating,
        }
    }
}

/// Async driver over a [`PriceBoard`], shared between overlapping
/// recomputations.
#[derive(Clone)]
pub struct PriceResolver<P> {
    pricing: P,
    board: Arc<Mutex<PriceBoard>>,
    debounce: Duration,
}

impl<P> PriceResolver<P>
where
    P: PricingClient,
{
    pub fn new(pricing: P, debounce: Duration) -> Self {
        Self { pricing, board: Arc::new(Mutex::new(PriceBoard::default())), debounce }
    }

    pub fn display(&self, view: &SelectionView) -> PriceDisplay {
        self.lock_board().display(view)
    }

    pub fn current_quote(&self) -> Option<PriceQuote> {
        self.lock_board().quote().cloned()
    }

    /// Drives one recomputation for `view`.
    ///
    /// Ineligible selections clear the board without a remote call. Eligible
    /// ones wait out the debounce window, and are skipped entirely when a
    /// newer selection arrives inside it. Failures for the current selection
    /// surface as `PriceComputationFailed`; stale failures are discarded
    /// silently.
    pub async fn recompute(&self, view: SelectionView) -> Result<PriceDisplay, ResolverError> {
        let fingerprint = view.fingerprint;
        let snapshot = {
            let mut board = self.lock_board();
            match view.snapshot.clone() {
                None => {
                    board.note_ineligible(fingerprint);
                    return Ok(board.display(&view));
                }
                Some(snapshot) => {
                    board.begin(fingerprint);
                    snapshot
                }
            }
        };

        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
            if !self.lock_board().is_current(fingerprint) {
                // Superseded inside the debounce window; no remote call.
                return Ok(self.lock_board().display(&view));
            }
        }

        let result = self.pricing.compute_price(&snapshot).await;
        let mut board = self.lock_board();
        match result {
            Ok(remote) => {
                board.apply_success(fingerprint, remote, snapshot.quantity);
            }
            Err(error) => {
                if board.apply_failure(fingerprint) {
                    return Err(ResolverError::PriceComputationFailed { message: error.0 });
                }
            }
        }
        Ok(board.display(&view))
    }

    fn lock_board(&self) -> MutexGuard<'_, PriceBoard> {
        match self.board.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
