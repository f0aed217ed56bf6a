//! Corporation number checker
//!
//! Verifies nine-digit corporation numbers against the remote service and
//! keeps a small status machine:
//!
//! ```text
//!            check(bad format)                    reset()
//!   Idle ─────────────────────────▶ Invalid      any ─────▶ Idle
//!    │
//!    │ check(nine digits)
//!    ▼
//!  Checking ──▶ Valid     (service accepted)
//!           ──▶ Invalid   (service rejected, message from service)
//!           ──▶ Error     (transport failure or non-2xx)
//! ```
//!
//! Every `check` and `reset` starts a new generation and cancels the token of
//! the previous in-flight check. A completion only touches state if its
//! generation is still current, so a superseded check can never move the
//! status backward.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::CorpNumberVerifier;
use crate::schema::{is_corporation_number, CORPORATION_NUMBER_FORMAT};

/// Fallback when the service rejects a number without saying why
pub const INVALID_CORPORATION_NUMBER: &str = "Invalid corporation number";

/// Shown when the check could not be completed
pub const CHECK_FAILED: &str = "Validation failed. Try again.";

/// Checker status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpCheckStatus {
    #[default]
    Idle,
    Checking,
    Valid,
    Invalid,
    Error,
}

/// Observable checker state.
///
/// `message` is only ever set for `Invalid` and `Error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpCheckState {
    status: CorpCheckStatus,
    message: Option<String>,
}

impl CorpCheckState {
    fn idle() -> Self {
        Self::default()
    }

    fn checking() -> Self {
        Self {
            status: CorpCheckStatus::Checking,
            message: None,
        }
    }

    fn valid() -> Self {
        Self {
            status: CorpCheckStatus::Valid,
            message: None,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: CorpCheckStatus::Invalid,
            message: Some(message.into()),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: CorpCheckStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> CorpCheckStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// True for `Invalid` and `Error`
    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            CorpCheckStatus::Invalid | CorpCheckStatus::Error
        )
    }
}

#[derive(Default)]
struct InFlight {
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl InFlight {
    /// Invalidate the current check and return the new generation
    fn supersede(&mut self) -> u64 {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Returns the checker to `Idle` if a `check` future is dropped before it
/// settles while still being the latest call
struct PendingCheck<'a> {
    in_flight: &'a Mutex<InFlight>,
    state: &'a watch::Sender<CorpCheckState>,
    generation: u64,
    settled: bool,
}

impl Drop for PendingCheck<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut in_flight = self.in_flight.lock();
        if in_flight.generation != self.generation {
            return;
        }
        in_flight.supersede();
        self.state.send_replace(CorpCheckState::idle());
        debug!(generation = self.generation, "corporation number check abandoned");
    }
}

/// Corporation number checker
pub struct CorpNumberChecker<V: ?Sized> {
    verifier: Arc<V>,
    in_flight: Mutex<InFlight>,
    state: watch::Sender<CorpCheckState>,
}

impl<V: CorpNumberVerifier + ?Sized> CorpNumberChecker<V> {
    pub fn new(verifier: Arc<V>) -> Self {
        let (state, _) = watch::channel(CorpCheckState::idle());
        Self {
            verifier,
            in_flight: Mutex::new(InFlight::default()),
            state,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> CorpCheckState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> CorpCheckStatus {
        self.state.borrow().status
    }

    /// Subscribe to state changes
    pub fn watch(&self) -> watch::Receiver<CorpCheckState> {
        self.state.subscribe()
    }

    /// Verify `number`. Returns true only if this call is still the latest
    /// one when it settles and the service accepted the number.
    pub async fn check(&self, number: &str) -> bool {
        if !is_corporation_number(number) {
            let mut in_flight = self.in_flight.lock();
            in_flight.supersede();
            self.publish(CorpCheckState::invalid(CORPORATION_NUMBER_FORMAT));
            drop(in_flight);
            debug!(corporation_number = %number, "corporation number failed format check");
            return false;
        }

        let (generation, cancel) = {
            let mut in_flight = self.in_flight.lock();
            let generation = in_flight.supersede();
            let token = CancellationToken::new();
            in_flight.cancel = Some(token.clone());
            self.publish(CorpCheckState::checking());
            (generation, token)
        };
        let mut pending = PendingCheck {
            in_flight: &self.in_flight,
            state: &self.state,
            generation,
            settled: false,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(corporation_number = %number, generation, "corporation number check superseded");
                return false;
            }
            outcome = self.verifier.verify(number) => outcome,
        };
        pending.settled = true;

        let mut in_flight = self.in_flight.lock();
        if in_flight.generation != generation {
            debug!(corporation_number = %number, generation, "discarding stale check result");
            return false;
        }
        in_flight.cancel = None;

        match outcome {
            Ok(response) if response.is_valid() => {
                info!(corporation_number = %number, "corporation number accepted");
                self.publish(CorpCheckState::valid());
                true
            }
            Ok(response) => {
                let message = response.message().unwrap_or(INVALID_CORPORATION_NUMBER);
                info!(corporation_number = %number, %message, "corporation number rejected");
                self.publish(CorpCheckState::invalid(message));
                false
            }
            Err(err) => {
                warn!(
                    corporation_number = %number,
                    error = %err,
                    transport = err.is_transport(),
                    "corporation number check failed"
                );
                self.publish(CorpCheckState::error(CHECK_FAILED));
                false
            }
        }
    }

    /// Cancel any in-flight check and return to `Idle`
    pub fn reset(&self) {
        let mut in_flight = self.in_flight.lock();
        in_flight.supersede();
        self.publish(CorpCheckState::idle());
    }

    fn publish(&self, state: CorpCheckState) {
        self.state.send_replace(state);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use onboard_client::{ClientError, CorpCheckResponse};
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    type Answer = Result<CorpCheckResponse, ClientError>;

    /// Verifier whose answers are released by the test
    #[derive(Default)]
    pub(crate) struct GatedVerifier {
        gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Answer>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl GatedVerifier {
        /// Gate the next check of `number`; the answer is sent through the returned sender
        pub(crate) fn gate(&self, number: &str) -> oneshot::Sender<Answer> {
            let (tx, rx) = oneshot::channel();
            self.gates
                .lock()
                .entry(number.to_string())
                .or_default()
                .push_back(rx);
            tx
        }

        /// Pre-load an answer for the next check of `number`
        pub(crate) fn answer(&self, number: &str, answer: Answer) {
            let _ = self.gate(number).send(answer);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl CorpNumberVerifier for GatedVerifier {
        async fn verify(&self, number: &str) -> Answer {
            self.calls.lock().push(number.to_string());
            let gate = self
                .gates
                .lock()
                .get_mut(number)
                .and_then(|queue| queue.pop_front());
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ClientError::Config("gate dropped".into()))),
                None => Err(ClientError::Config(format!("no answer for {number}"))),
            }
        }
    }

    pub(crate) fn unavailable() -> ClientError {
        ClientError::Api {
            status_code: 503,
            message: CHECK_FAILED.into(),
        }
    }

    fn checker() -> (Arc<GatedVerifier>, CorpNumberChecker<GatedVerifier>) {
        let verifier = Arc::new(GatedVerifier::default());
        let checker = CorpNumberChecker::new(verifier.clone());
        (verifier, checker)
    }

    #[test]
    fn test_starts_idle() {
        let (_, checker) = checker();
        assert_eq!(checker.status(), CorpCheckStatus::Idle);
        assert_eq!(checker.state().message(), None);
    }

    #[tokio::test]
    async fn test_bad_format_skips_network() {
        let (verifier, checker) = checker();

        for input in ["", "12345", "1234567890", "12345678a", " 123456789", "+123456789"] {
            assert!(!checker.check(input).await);
            assert_eq!(checker.status(), CorpCheckStatus::Invalid);
            assert_eq!(checker.state().message(), Some(CORPORATION_NUMBER_FORMAT));
        }
        assert!(verifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_number() {
        let (verifier, checker) = checker();
        verifier.answer("123456789", Ok(CorpCheckResponse::accepted("123456789")));

        assert!(checker.check("123456789").await);
        assert_eq!(checker.state(), CorpCheckState::valid());
        assert_eq!(verifier.calls(), vec!["123456789"]);
    }

    #[tokio::test]
    async fn test_rejected_number_uses_service_message() {
        let (verifier, checker) = checker();
        verifier.answer(
            "999999999",
            Ok(CorpCheckResponse::rejected(Some("Not registered".into()))),
        );

        assert!(!checker.check("999999999").await);
        assert_eq!(checker.state(), CorpCheckState::invalid("Not registered"));
    }

    #[tokio::test]
    async fn test_rejected_number_without_message() {
        let (verifier, checker) = checker();
        verifier.answer("999999999", Ok(CorpCheckResponse::rejected(None)));
        verifier.answer("999999999", Ok(CorpCheckResponse::rejected(Some(String::new()))));

        assert!(!checker.check("999999999").await);
        assert_eq!(checker.state().message(), Some(INVALID_CORPORATION_NUMBER));
        assert!(!checker.check("999999999").await);
        assert_eq!(checker.state().message(), Some(INVALID_CORPORATION_NUMBER));
    }

    #[tokio::test]
    async fn test_transport_failure_sets_error() {
        let (verifier, checker) = checker();
        verifier.answer("123456789", Err(unavailable()));

        assert!(!checker.check("123456789").await);
        assert_eq!(checker.state(), CorpCheckState::error(CHECK_FAILED));
        assert!(checker.state().is_failure());
    }

    #[test]
    fn test_checking_while_in_flight() {
        let (verifier, checker) = checker();
        let gate = verifier.gate("123456789");

        let mut check = task::spawn(checker.check("123456789"));
        assert_pending!(check.poll());
        assert_eq!(checker.state(), CorpCheckState::checking());

        gate.send(Ok(CorpCheckResponse::accepted("123456789"))).unwrap();
        assert!(check.is_woken());
        assert_ready_eq!(check.poll(), true);
        assert_eq!(checker.status(), CorpCheckStatus::Valid);
    }

    #[test]
    fn test_superseded_check_cannot_overwrite_newer() {
        let (verifier, checker) = checker();
        let gate_a = verifier.gate("111111111");
        let gate_b = verifier.gate("222222222");

        let mut a = task::spawn(checker.check("111111111"));
        assert_pending!(a.poll());
        let mut b = task::spawn(checker.check("222222222"));
        assert_pending!(b.poll());

        // A was cancelled when B started
        assert!(a.is_woken());

        // A's answer lands late and must be dropped
        let _ = gate_a.send(Ok(CorpCheckResponse::accepted("111111111")));
        assert_ready_eq!(a.poll(), false);
        assert_eq!(checker.status(), CorpCheckStatus::Checking);

        gate_b
            .send(Ok(CorpCheckResponse::rejected(Some("Unknown corporation".into()))))
            .unwrap();
        assert_ready_eq!(b.poll(), false);
        assert_eq!(checker.state(), CorpCheckState::invalid("Unknown corporation"));
        assert_eq!(verifier.calls(), vec!["111111111", "222222222"]);
    }

    #[test]
    fn test_older_failure_after_newer_success_is_ignored() {
        let (verifier, checker) = checker();
        let gate_a = verifier.gate("111111111");
        let gate_b = verifier.gate("222222222");

        let mut a = task::spawn(checker.check("111111111"));
        assert_pending!(a.poll());
        let mut b = task::spawn(checker.check("222222222"));
        assert_pending!(b.poll());

        gate_b.send(Ok(CorpCheckResponse::accepted("222222222"))).unwrap();
        assert_ready_eq!(b.poll(), true);

        let _ = gate_a.send(Err(unavailable()));
        assert_ready_eq!(a.poll(), false);
        assert_eq!(checker.state(), CorpCheckState::valid());
    }

    #[test]
    fn test_repeated_check_of_same_number_keeps_latest() {
        let (verifier, checker) = checker();
        let first = verifier.gate("123456789");
        let second = verifier.gate("123456789");

        let mut a = task::spawn(checker.check("123456789"));
        assert_pending!(a.poll());
        let mut b = task::spawn(checker.check("123456789"));
        assert_pending!(b.poll());

        let _ = first.send(Err(unavailable()));
        assert_ready_eq!(a.poll(), false);
        assert_eq!(checker.status(), CorpCheckStatus::Checking);

        second.send(Ok(CorpCheckResponse::accepted("123456789"))).unwrap();
        assert_ready_eq!(b.poll(), true);
        assert_eq!(checker.status(), CorpCheckStatus::Valid);
    }

    #[test]
    fn test_bad_format_supersedes_in_flight_check() {
        let (verifier, checker) = checker();
        let gate = verifier.gate("123456789");

        let mut a = task::spawn(checker.check("123456789"));
        assert_pending!(a.poll());

        let mut b = task::spawn(checker.check("1234"));
        assert_ready_eq!(b.poll(), false);

        let _ = gate.send(Ok(CorpCheckResponse::accepted("123456789")));
        assert_ready_eq!(a.poll(), false);
        assert_eq!(
            checker.state(),
            CorpCheckState::invalid(CORPORATION_NUMBER_FORMAT)
        );
    }

    #[test]
    fn test_bad_format_then_dropped_check_stays_invalid() {
        let (verifier, checker) = checker();
        let _gate = verifier.gate("123456789");
        let mut watcher = checker.watch();

        let mut a = task::spawn(checker.check("123456789"));
        assert_pending!(a.poll());

        let mut b = task::spawn(checker.check("1234"));
        assert_ready_eq!(b.poll(), false);
        drop(a);

        let invalid = CorpCheckState::invalid(CORPORATION_NUMBER_FORMAT);
        assert_eq!(*watcher.borrow_and_update(), invalid);
        assert!(!watcher.has_changed().unwrap());
        assert_eq!(checker.state(), invalid);
    }

    #[test]
    fn test_reset_cancels_in_flight_without_error() {
        let (verifier, checker) = checker();
        let gate = verifier.gate("123456789");

        let mut check = task::spawn(checker.check("123456789"));
        assert_pending!(check.poll());

        checker.reset();
        assert_eq!(checker.state(), CorpCheckState::idle());
        assert!(check.is_woken());

        drop(gate);
        assert_ready_eq!(check.poll(), false);
        assert_eq!(checker.state(), CorpCheckState::idle());
    }

    #[test]
    fn test_dropped_check_returns_to_idle() {
        let (verifier, checker) = checker();
        let _gate = verifier.gate("123456789");
        let mut rx = checker.watch();

        let mut check = task::spawn(checker.check("123456789"));
        assert_pending!(check.poll());
        assert_eq!(checker.status(), CorpCheckStatus::Checking);

        drop(check);
        assert_eq!(checker.state(), CorpCheckState::idle());
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_dropped_superseded_check_leaves_newer_alone() {
        let (verifier, checker) = checker();
        let _gate_a = verifier.gate("111111111");
        let _gate_b = verifier.gate("222222222");

        let mut a = task::spawn(checker.check("111111111"));
        assert_pending!(a.poll());
        let mut b = task::spawn(checker.check("222222222"));
        assert_pending!(b.poll());

        drop(a);
        assert_eq!(checker.status(), CorpCheckStatus::Checking);
        drop(b);
        assert_eq!(checker.status(), CorpCheckStatus::Idle);
    }

    #[test]
    fn test_dropped_settled_check_keeps_result() {
        let (verifier, checker) = checker();
        let gate = verifier.gate("123456789");

        let mut check = task::spawn(checker.check("123456789"));
        assert_pending!(check.poll());
        gate.send(Ok(CorpCheckResponse::accepted("123456789"))).unwrap();
        assert_ready_eq!(check.poll(), true);

        drop(check);
        assert_eq!(checker.status(), CorpCheckStatus::Valid);
    }

    #[tokio::test]
    async fn test_reset_from_any_state() {
        let (verifier, checker) = checker();

        verifier.answer("123456789", Ok(CorpCheckResponse::accepted("123456789")));
        assert!(checker.check("123456789").await);
        checker.reset();
        assert_eq!(checker.state(), CorpCheckState::idle());

        verifier.answer("123456789", Err(unavailable()));
        checker.check("123456789").await;
        checker.reset();
        assert_eq!(checker.state(), CorpCheckState::idle());

        checker.check("12").await;
        checker.reset();
        assert_eq!(checker.state(), CorpCheckState::idle());

        checker.reset();
        assert_eq!(checker.state(), CorpCheckState::idle());
    }

    #[tokio::test]
    async fn test_watch_sees_transitions() {
        let (verifier, checker) = checker();
        let mut rx = checker.watch();
        assert!(!rx.has_changed().unwrap());

        verifier.answer("123456789", Ok(CorpCheckResponse::accepted("123456789")));
        checker.check("123456789").await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status(), CorpCheckStatus::Valid);
    }
}
