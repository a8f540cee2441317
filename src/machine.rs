//! Initialization state machine
//!
//! Pure, synchronous owner of [`InitializationState`] and [`ProgressState`].
//! It never performs I/O: whenever a transition depends on the readiness
//! oracle it hands back a [`ReadinessCheck`] and waits for the answer through
//! [`InitStateMachine::apply_verdict`]. The orchestrator runtime is the only
//! caller, which keeps a single writer for the completion lock.
//!
//! Ready requires two independent signals within one modal lifetime:
//! `ScanComplete` for the initializing network, then an oracle check that
//! finds the network in the persisted record.

use std::time::Duration;

use crate::chain::ChainId;
use crate::config::ReadinessConfig;
use crate::events::LifecycleEvent;
use crate::oracle::Readiness;
use crate::state::{messages, InitPhase, InitializationState, ProgressState, ReadinessSnapshot};

/// What caused a gate check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateTrigger {
    /// Initial wallet connection
    Connect,
    /// User-initiated network switch
    Switch,
    /// `InitStarted` / `ScanStarted` from the SDK
    SdkStart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckPurpose {
    /// Decide whether initialization UI is needed at all
    Gate(GateTrigger),
    /// Confirm persistence after `ScanComplete`
    Confirm { attempt: u32 },
}

/// Oracle lookup requested by the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadinessCheck {
    pub session_epoch: u64,
    pub modal_lifetime: u64,
    pub chain: ChainId,
    pub purpose: CheckPurpose,
    /// Wait before querying
    pub delay: Duration,
}

/// Effect of an oracle answer on the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictOutcome {
    /// Issued for a previous wallet session
    Superseded,
    /// Network already synchronized, nothing to initialize
    AlreadyReady,
    /// Initialization UI armed for the network
    Armed,
    /// SDK scan accepted
    Scanning,
    /// Both completion conditions hold
    Ready,
    /// Not persisted yet, polling continues or was exhausted
    Pending,
    /// No longer applicable to the current state
    Ignored,
}

/// SDK scan start waiting for its gate answer
///
/// Progress and completion for that network can overtake the oracle; they are
/// held here and replayed once the scan is accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingScan {
    chain: ChainId,
    percent: Option<f64>,
    scan_complete: bool,
}

impl PendingScan {
    fn new(chain: ChainId) -> Self {
        Self {
            chain,
            percent: None,
            scan_complete: false,
        }
    }
}

pub struct InitStateMachine {
    state: InitializationState,
    progress: ProgressState,
    completion_locked: bool,
    scan_complete_seen: bool,
    confirm_in_flight: bool,
    pending_scan: Option<PendingScan>,
    initial_connect_done: bool,
    active_chain: Option<ChainId>,
    session_epoch: u64,
    modal_lifetime: u64,
    confirm_interval: Duration,
    confirm_attempts: u32,
}

impl InitStateMachine {
    pub fn new(confirm_interval: Duration, confirm_attempts: u32) -> Self {
        Self {
            state: InitializationState::idle(),
            progress: ProgressState::inactive(),
            completion_locked: false,
            scan_complete_seen: false,
            confirm_in_flight: false,
            pending_scan: None,
            initial_connect_done: false,
            active_chain: None,
            session_epoch: 0,
            modal_lifetime: 0,
            confirm_interval,
            confirm_attempts: confirm_attempts.max(1),
        }
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(config.confirm_interval, config.confirm_attempts)
    }

    pub fn state(&self) -> &InitializationState {
        &self.state
    }

    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    pub fn phase(&self) -> InitPhase {
        self.state.phase
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn snapshot(&self) -> ReadinessSnapshot {
        ReadinessSnapshot {
            state: self.state.clone(),
            progress: self.progress,
            completion_locked: self.completion_locked,
            session_epoch: self.session_epoch,
            modal_lifetime: self.modal_lifetime,
            initial_connect_done: self.initial_connect_done,
        }
    }

    /// Hard reset on wallet address change; all outstanding checks become stale
    pub fn reset_session(&mut self) {
        self.session_epoch += 1;
        self.initial_connect_done = false;
        self.active_chain = None;
        self.pending_scan = None;
        self.clear_lifetime();
        log::debug!("State machine reset (session epoch {})", self.session_epoch);
    }

    /// Network the wallet is connected to right now
    pub fn set_active_chain(&mut self, chain: ChainId) {
        self.active_chain = Some(chain);
    }

    /// Close the modal; the next initialization starts a fresh lifetime
    pub fn close_modal(&mut self) {
        log::debug!(
            "Closing modal lifetime {} in phase {:?}",
            self.modal_lifetime,
            self.state.phase
        );
        self.clear_lifetime();
    }

    /// Entry point for connect and switch: every caller goes through a fresh oracle check
    pub fn request_gate(&mut self, chain: ChainId, trigger: GateTrigger) -> ReadinessCheck {
        if matches!(trigger, GateTrigger::Connect | GateTrigger::Switch) {
            self.active_chain = Some(chain);
        }
        self.check(chain, CheckPurpose::Gate(trigger), Duration::ZERO)
    }

    /// Fold one lifecycle event, returning any oracle check it needs
    pub fn handle_event(&mut self, event: &LifecycleEvent) -> Option<ReadinessCheck> {
        match event {
            LifecycleEvent::SignatureRequested => {
                if self.state.phase == InitPhase::Idle {
                    let chain = self.active_chain;
                    self.begin_lifetime(chain);
                    self.state.phase = InitPhase::AwaitingSignature;
                    self.state.message = messages::AWAITING_SIGNATURE.to_string();
                }
                None
            }
            LifecycleEvent::InitStarted { chain_id } | LifecycleEvent::ScanStarted { chain_id } => {
                self.on_scan_start(*chain_id)
            }
            LifecycleEvent::InitProgress => {
                if matches!(self.state.phase, InitPhase::Scanning | InitPhase::Bootstrapping)
                    && !self.completion_locked
                {
                    self.state.message = messages::SYNCING.to_string();
                }
                None
            }
            LifecycleEvent::BootstrapProgress { chain_id, percent } => {
                self.on_bootstrap_progress(*chain_id, *percent);
                None
            }
            LifecycleEvent::ScanComplete { chain_id } => self.on_scan_complete(*chain_id),
            LifecycleEvent::InitCompleted => {
                if self.state.phase.is_in_progress() {
                    self.state.message = messages::FINALIZING.to_string();
                }
                None
            }
            LifecycleEvent::InitFailed { error } => {
                log::warn!(
                    "Vault initialization failed on chain {:?}: {}",
                    self.state.initializing_chain_id,
                    error
                );
                if self.state.phase == InitPhase::Idle {
                    let chain = self.active_chain;
                    self.begin_lifetime(chain);
                }
                self.state.phase = InitPhase::Failed;
                self.state.message = messages::FAILED.to_string();
                self.state.failure = Some(error.clone());
                self.progress.active = false;
                self.confirm_in_flight = false;
                None
            }
            LifecycleEvent::WalletMetadataReady => {
                if self.scan_complete_seen
                    && !self.confirm_in_flight
                    && self.state.phase.is_in_progress()
                {
                    self.start_confirmation()
                } else {
                    None
                }
            }
        }
    }

    /// Apply an oracle answer for a check this machine issued
    pub fn apply_verdict(
        &mut self,
        check: &ReadinessCheck,
        verdict: Readiness,
    ) -> (VerdictOutcome, Option<ReadinessCheck>) {
        if check.session_epoch != self.session_epoch {
            log::debug!(
                "Dropping readiness answer for chain {} from session epoch {}",
                check.chain,
                check.session_epoch
            );
            return (VerdictOutcome::Superseded, None);
        }

        match check.purpose {
            CheckPurpose::Gate(trigger) => self.apply_gate(check.chain, trigger, verdict),
            CheckPurpose::Confirm { attempt } => self.apply_confirmation(check, attempt, verdict),
        }
    }

    fn apply_gate(
        &mut self,
        chain: ChainId,
        trigger: GateTrigger,
        verdict: Readiness,
    ) -> (VerdictOutcome, Option<ReadinessCheck>) {
        if matches!(trigger, GateTrigger::Connect) {
            self.initial_connect_done = true;
        }

        let pending = match trigger {
            GateTrigger::SdkStart if self.pending_scan.is_some_and(|p| p.chain == chain) => {
                self.pending_scan.take()
            }
            _ => None,
        };

        if verdict.is_ready() {
            if self.state.phase == InitPhase::AwaitingSignature
                && self.state.initializing_chain_id == Some(chain)
            {
                log::info!("Chain {} already synchronized, dismissing signature prompt", chain);
                self.clear_lifetime();
            } else {
                log::debug!("Chain {} already synchronized", chain);
            }
            return (VerdictOutcome::AlreadyReady, None);
        }

        match trigger {
            GateTrigger::Connect | GateTrigger::Switch => (self.arm(chain), None),
            GateTrigger::SdkStart => {
                let outcome = self.accept_scan(chain);
                let follow_up = pending.and_then(|p| self.replay_pending(p));
                (outcome, follow_up)
            }
        }
    }

    fn replay_pending(&mut self, pending: PendingScan) -> Option<ReadinessCheck> {
        if self.state.initializing_chain_id != Some(pending.chain) || !self.is_scanning() {
            return None;
        }
        if let Some(percent) = pending.percent {
            self.on_bootstrap_progress(pending.chain, percent);
        }
        if pending.scan_complete {
            log::debug!("Replaying early scan completion for chain {}", pending.chain);
            return self.on_scan_complete(Some(pending.chain));
        }
        None
    }

    fn is_scanning(&self) -> bool {
        matches!(self.state.phase, InitPhase::Scanning | InitPhase::Bootstrapping)
    }

    fn arm(&mut self, chain: ChainId) -> VerdictOutcome {
        if self.state.phase.is_in_progress() && self.state.initializing_chain_id == Some(chain) {
            return VerdictOutcome::Armed;
        }

        log::info!("Chain {} needs first-time synchronization, arming initialization", chain);
        self.begin_lifetime(Some(chain));
        self.state.phase = InitPhase::AwaitingSignature;
        self.state.message = messages::AWAITING_SIGNATURE.to_string();
        VerdictOutcome::Armed
    }

    fn accept_scan(&mut self, chain: ChainId) -> VerdictOutcome {
        match self.state.phase {
            InitPhase::Idle => {
                self.begin_lifetime(Some(chain));
            }
            InitPhase::AwaitingSignature => {
                if self.state.initializing_chain_id.is_some_and(|c| c != chain) {
                    log::debug!("Scan start for chain {} does not match the armed network", chain);
                    return VerdictOutcome::Ignored;
                }
                self.state.initializing_chain_id = Some(chain);
            }
            _ => return VerdictOutcome::Ignored,
        }

        log::info!("Scanning chain {}", chain);
        self.state.phase = InitPhase::Scanning;
        self.state.message = messages::SCANNING.to_string();
        self.progress.active = true;
        VerdictOutcome::Scanning
    }

    fn apply_confirmation(
        &mut self,
        check: &ReadinessCheck,
        attempt: u32,
        verdict: Readiness,
    ) -> (VerdictOutcome, Option<ReadinessCheck>) {
        if check.modal_lifetime != self.modal_lifetime {
            return (VerdictOutcome::Ignored, None);
        }
        if !self.scan_complete_seen
            || !self.state.phase.is_in_progress()
            || self.state.initializing_chain_id != Some(check.chain)
        {
            self.confirm_in_flight = false;
            return (VerdictOutcome::Ignored, None);
        }

        if verdict.is_ready() {
            log::info!("Chain {} synchronized and persisted", check.chain);
            self.confirm_in_flight = false;
            self.completion_locked = true;
            self.progress = ProgressState {
                percent: 100.0,
                active: false,
            };
            self.state.phase = InitPhase::Ready;
            self.state.message = messages::READY.to_string();
            return (VerdictOutcome::Ready, None);
        }

        if attempt < self.confirm_attempts {
            let next = self.check(
                check.chain,
                CheckPurpose::Confirm {
                    attempt: attempt + 1,
                },
                self.confirm_interval,
            );
            return (VerdictOutcome::Pending, Some(next));
        }

        log::warn!(
            "Chain {} scan finished but not persisted after {} confirmation checks",
            check.chain,
            self.confirm_attempts
        );
        self.confirm_in_flight = false;
        (VerdictOutcome::Pending, None)
    }

    fn on_scan_start(&mut self, chain: ChainId) -> Option<ReadinessCheck> {
        match self.state.phase {
            InitPhase::Idle => {}
            InitPhase::AwaitingSignature
                if self.state.initializing_chain_id.map_or(true, |c| c == chain) => {}
            phase => {
                log::debug!("Ignoring scan start for chain {} in {:?}", chain, phase);
                return None;
            }
        }
        if !self.pending_scan.is_some_and(|p| p.chain == chain) {
            self.pending_scan = Some(PendingScan::new(chain));
        }
        // Re-check even if an earlier answer exists: reconnects re-emit scan starts
        Some(self.check(chain, CheckPurpose::Gate(GateTrigger::SdkStart), Duration::ZERO))
    }

    fn on_bootstrap_progress(&mut self, chain: ChainId, percent: f64) {
        if self.state.phase == InitPhase::Idle && !percent.is_nan() {
            if let Some(pending) = self.pending_scan.as_mut().filter(|p| p.chain == chain) {
                let locked = pending.percent.is_some_and(|p| p >= 100.0);
                pending.percent = Some(if locked { 100.0 } else { percent });
                return;
            }
        }
        if self.state.initializing_chain_id != Some(chain) {
            log::debug!(
                "Ignoring progress for chain {} (initializing {:?})",
                chain,
                self.state.initializing_chain_id
            );
            return;
        }
        if !self.state.phase.is_in_progress() || percent.is_nan() {
            return;
        }

        self.state.phase = InitPhase::Bootstrapping;
        self.progress.active = true;

        if self.completion_locked {
            self.progress.percent = 100.0;
            return;
        }

        let percent = percent.clamp(0.0, 100.0);
        if percent >= 100.0 {
            self.completion_locked = true;
            self.progress.percent = 100.0;
            self.state.message = messages::CREATING.to_string();
        } else {
            self.progress.percent = percent;
        }
    }

    fn on_scan_complete(&mut self, chain: Option<ChainId>) -> Option<ReadinessCheck> {
        if matches!(self.state.phase, InitPhase::Idle | InitPhase::AwaitingSignature) {
            if let Some(pending) = self.pending_scan.as_mut() {
                if chain.map_or(true, |c| c == pending.chain) {
                    log::debug!(
                        "Holding scan completion for chain {} until the scan is accepted",
                        pending.chain
                    );
                    pending.scan_complete = true;
                    return None;
                }
            }
        }

        let Some(initializing) = self.state.initializing_chain_id else {
            return None;
        };
        if chain.is_some_and(|c| c != initializing) || !self.is_scanning() {
            log::debug!("Ignoring scan completion for {:?}", chain);
            return None;
        }

        self.scan_complete_seen = true;
        self.state.message = messages::CONFIRMING.to_string();
        if self.confirm_in_flight {
            return None;
        }
        self.start_confirmation()
    }

    fn start_confirmation(&mut self) -> Option<ReadinessCheck> {
        let chain = self.state.initializing_chain_id?;
        self.confirm_in_flight = true;
        Some(self.check(chain, CheckPurpose::Confirm { attempt: 1 }, Duration::ZERO))
    }

    fn begin_lifetime(&mut self, chain: Option<ChainId>) {
        self.clear_lifetime();
        self.state.initializing_chain_id = chain;
        self.progress = ProgressState::started();
    }

    fn clear_lifetime(&mut self) {
        self.modal_lifetime += 1;
        self.state = InitializationState::idle();
        self.progress = ProgressState::inactive();
        self.completion_locked = false;
        self.scan_complete_seen = false;
        self.confirm_in_flight = false;
    }

    fn check(&self, chain: ChainId, purpose: CheckPurpose, delay: Duration) -> ReadinessCheck {
        ReadinessCheck {
            session_epoch: self.session_epoch,
            modal_lifetime: self.modal_lifetime,
            chain,
            purpose,
            delay,
        }
    }
}
