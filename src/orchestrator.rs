/// Readiness orchestrator runtime
///
/// Owns the [`InitStateMachine`] on a single task and is the only writer of
/// its state:
/// - lifecycle events from the bus are folded into the machine
/// - oracle checks the machine asks for run as spawned tasks whose answers
///   come back through a channel
/// - connect / switch / dismiss requests arrive as [`Command`]s
/// - every change is published as a [`ReadinessSnapshot`] on a watch channel
///
/// A wallet address change aborts every in-flight check. Checks that already
/// finished are rejected by the machine's session epoch, and retry loops stop
/// early through a shared epoch guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::chain::ChainId;
use crate::config::ReadinessConfig;
use crate::error::CoordinatorError;
use crate::events::{EventBus, EventListener, LifecycleEvent};
use crate::machine::{GateTrigger, InitStateMachine, ReadinessCheck, VerdictOutcome};
use crate::oracle::{MetadataStore, Readiness, ReadinessOracle};
use crate::session::WalletSession;
use crate::state::ReadinessSnapshot;

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Result of a connect / switch evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Network already synchronized, no initialization UI
    AlreadyReady,
    /// Initialization armed for the network
    Armed,
    /// Wallet changed before the answer arrived
    Superseded,
}

impl From<VerdictOutcome> for EvaluationOutcome {
    fn from(outcome: VerdictOutcome) -> Self {
        match outcome {
            VerdictOutcome::AlreadyReady => EvaluationOutcome::AlreadyReady,
            VerdictOutcome::Armed => EvaluationOutcome::Armed,
            _ => EvaluationOutcome::Superseded,
        }
    }
}

pub enum Command {
    /// Replace the wallet session; a different address resets everything
    SetSession(Option<WalletSession>),
    /// Fresh oracle check for `chain`, arming initialization if not ready
    Evaluate {
        chain: ChainId,
        trigger: GateTrigger,
        reply: oneshot::Sender<EvaluationOutcome>,
    },
    /// Close modal lifetime `lifetime` (ignored if it already ended)
    CloseModal { lifetime: u64 },
    Shutdown,
}

struct VerdictMessage {
    request: Option<u64>,
    check: ReadinessCheck,
    /// `None` when the check was superseded before answering
    verdict: Option<Readiness>,
}

/// Cloneable handle to a running orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<ReadinessSnapshot>,
}

impl OrchestratorHandle {
    pub async fn set_session(&self, session: Option<WalletSession>) -> Result<(), CoordinatorError> {
        self.send(Command::SetSession(session)).await
    }

    pub async fn evaluate(
        &self,
        chain: ChainId,
        trigger: GateTrigger,
    ) -> Result<EvaluationOutcome, CoordinatorError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Evaluate {
            chain,
            trigger,
            reply,
        })
        .await?;
        answer.await.map_err(|_| CoordinatorError::OrchestratorClosed)
    }

    pub async fn close_modal(&self, lifetime: u64) -> Result<(), CoordinatorError> {
        self.send(Command::CloseModal { lifetime }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    /// Latest published state
    pub fn snapshot(&self) -> ReadinessSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<ReadinessSnapshot, CoordinatorError>
    where
        F: FnMut(&ReadinessSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            rx.changed()
                .await
                .map_err(|_| CoordinatorError::OrchestratorClosed)?;
        }
    }

    async fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoordinatorError::OrchestratorClosed)
    }
}

pub struct Orchestrator<S> {
    machine: InitStateMachine,
    oracle: Arc<ReadinessOracle<S>>,
    session: Option<WalletSession>,
    epoch_guard: Arc<AtomicU64>,
    in_flight: Vec<JoinHandle<()>>,
    pending_replies: HashMap<u64, oneshot::Sender<EvaluationOutcome>>,
    next_request: u64,
    verdict_tx: mpsc::UnboundedSender<VerdictMessage>,
    snapshot_tx: watch::Sender<ReadinessSnapshot>,
}

impl<S: MetadataStore> Orchestrator<S> {
    /// Start the orchestrator task, listening on `bus`
    pub fn spawn(
        oracle: Arc<ReadinessOracle<S>>,
        bus: &EventBus,
        config: &ReadinessConfig,
    ) -> OrchestratorHandle {
        let machine = InitStateMachine::from_config(config);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (verdict_tx, verdict_rx) = mpsc::unbounded_channel();
        let listener = bus.subscribe();

        let orchestrator = Self {
            machine,
            oracle,
            session: None,
            epoch_guard: Arc::new(AtomicU64::new(0)),
            in_flight: Vec::new(),
            pending_replies: HashMap::new(),
            next_request: 0,
            verdict_tx,
            snapshot_tx,
        };

        tokio::spawn(orchestrator.run(listener, command_rx, verdict_rx));
        log::info!("Readiness orchestrator started");

        OrchestratorHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(
        mut self,
        mut listener: EventListener,
        mut commands: mpsc::Receiver<Command>,
        mut verdicts: mpsc::UnboundedReceiver<VerdictMessage>,
    ) {
        let mut bus_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                event = listener.next(), if bus_open => match event {
                    Some(event) => self.on_event(event),
                    None => {
                        log::warn!("Lifecycle event bus closed");
                        bus_open = false;
                    }
                },
                Some(message) = verdicts.recv() => self.on_verdict(message),
            }
            self.publish();
        }

        self.abort_in_flight();
        log::info!("Readiness orchestrator stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SetSession(session) => self.on_session(session),
            Command::Evaluate {
                chain,
                trigger,
                reply,
            } => {
                if self.session.is_none() {
                    log::debug!("Evaluation for chain {} without a wallet session", chain);
                    let _ = reply.send(EvaluationOutcome::Superseded);
                    return;
                }
                let check = self.machine.request_gate(chain, trigger);
                let request = self.next_request;
                self.next_request += 1;
                self.pending_replies.insert(request, reply);
                self.spawn_check(Some(request), check);
            }
            Command::CloseModal { lifetime } => {
                if self.machine.snapshot().modal_lifetime == lifetime {
                    self.machine.close_modal();
                } else {
                    log::debug!("Ignoring close for ended modal lifetime {}", lifetime);
                }
            }
            Command::Shutdown => {}
        }
    }

    fn on_session(&mut self, session: Option<WalletSession>) {
        let same_wallet = match (&self.session, &session) {
            (Some(current), Some(next)) => current.same_wallet(next),
            (None, None) => true,
            _ => false,
        };

        if !same_wallet {
            self.abort_in_flight();
            self.machine.reset_session();
            self.epoch_guard
                .store(self.machine.session_epoch(), Ordering::SeqCst);
            self.publish();
            for (_, reply) in self.pending_replies.drain() {
                let _ = reply.send(EvaluationOutcome::Superseded);
            }
            match &session {
                Some(next) => log::info!(
                    "Wallet session {} started for {} on chain {}",
                    next.id,
                    next.address,
                    next.chain_id
                ),
                None => log::info!("Wallet disconnected, readiness state reset"),
            }
        }

        if let Some(next) = &session {
            self.machine.set_active_chain(next.chain_id);
        }
        self.session = session;
    }

    fn on_event(&mut self, event: LifecycleEvent) {
        if let Some(check) = self.machine.handle_event(&event) {
            self.spawn_check(None, check);
        }
    }

    fn on_verdict(&mut self, message: VerdictMessage) {
        let outcome = match message.verdict {
            Some(verdict) => {
                let (outcome, follow_up) = self.machine.apply_verdict(&message.check, verdict);
                if let Some(next) = follow_up {
                    self.spawn_check(None, next);
                }
                outcome
            }
            None => VerdictOutcome::Superseded,
        };

        log::debug!(
            "Readiness check {:?} for chain {}: {:?}",
            message.check.purpose,
            message.check.chain,
            outcome
        );

        // Callers read the snapshot right after the reply
        self.publish();
        if let Some(request) = message.request {
            if let Some(reply) = self.pending_replies.remove(&request) {
                let _ = reply.send(outcome.into());
            }
        }
    }

    fn spawn_check(&mut self, request: Option<u64>, check: ReadinessCheck) {
        self.in_flight.retain(|handle| !handle.is_finished());

        let tx = self.verdict_tx.clone();
        let Some(session) = self.session.as_ref() else {
            let _ = tx.send(VerdictMessage {
                request,
                check,
                verdict: None,
            });
            return;
        };

        let oracle = self.oracle.clone();
        let guard = self.epoch_guard.clone();
        let address = session.address.clone();
        let vault_wallet_id = session.vault_wallet_id.clone();
        let session_id = session.id;

        let handle = tokio::spawn(async move {
            if !check.delay.is_zero() {
                tokio::time::sleep(check.delay).await;
            }
            let verdict = oracle
                .check_with_retry(&address, vault_wallet_id.as_deref(), check.chain, || {
                    guard.load(Ordering::SeqCst) == check.session_epoch
                })
                .await;
            log::debug!(
                "[session {}] oracle answered {:?} for chain {}",
                session_id,
                verdict,
                check.chain
            );
            let _ = tx.send(VerdictMessage {
                request,
                check,
                verdict,
            });
        });
        self.in_flight.push(handle);
    }

    fn abort_in_flight(&mut self) {
        let count = self.in_flight.len();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
        if count > 0 {
            log::debug!("Aborted {} in-flight readiness check(s)", count);
        }
    }

    fn publish(&self) {
        let next = self.machine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
