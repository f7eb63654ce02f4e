pub mod clock;
pub mod room;
pub mod scoring;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::room_store::RoomStore,
    error::ServiceError,
    state::{room::RoomSession, state_machine::RoomPhase},
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};
use self::state_machine::{RoomEvent, RoomStateMachine};

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-room broadcast channel capacity.
const ROOM_SSE_CAPACITY: usize = 32;

/// Everything that belongs to one live room: its state machine, session data,
/// event hub, and the serialization primitives for host transitions.
pub struct RoomHandle {
    machine: RwLock<RoomStateMachine>,
    session: RwLock<RoomSession>,
    sse: SseHub,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
    timer_generation: AtomicU64,
}

impl RoomHandle {
    /// Wrap a session at the given phase into a shareable handle.
    pub fn new(session: RoomSession, phase: RoomPhase) -> Arc<Self> {
        Arc::new(Self {
            machine: RwLock::new(RoomStateMachine::at_phase(phase)),
            session: RwLock::new(session),
            sse: SseHub::new(ROOM_SSE_CAPACITY),
            transition_gate: Mutex::new(()),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
            timer_generation: AtomicU64::new(0),
        })
    }

    /// The room's session data.
    pub fn session(&self) -> &RwLock<RoomSession> {
        &self.session
    }

    /// Broadcast hub for this room's SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Snapshot the current phase of the room's state machine.
    pub async fn phase(&self) -> RoomPhase {
        self.machine.read().await.phase()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.machine.read().await;
        sm.snapshot()
    }

    /// Invalidate every timer task spawned for this room and return the new
    /// generation. Timers stamp the generation at spawn and exit once it moves.
    pub fn bump_timer_generation(&self) -> u64 {
        self.timer_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current timer generation.
    pub fn timer_generation(&self) -> u64 {
        self.timer_generation.load(Ordering::SeqCst)
    }

    /// Plan a transition on the room's state machine, returning the plan.
    async fn plan_transition(&self, event: RoomEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<RoomPhase, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Run `work` under a planned transition: the plan reserves the phase
    /// change, the work performs the side effects, and the plan is applied on
    /// success or aborted on failure or timeout. The gate serializes
    /// concurrent transitions so a host action and an expiring timer cannot
    /// interleave; the loser of the race fails its plan instead.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: RoomEvent,
        work: F,
    ) -> Result<(T, RoomPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

/// Central application state storing the room registry and database handles.
pub struct AppState {
    config: AppConfig,
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    rooms: DashMap<Uuid, Arc<RoomHandle>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            room_store: RwLock::new(None),
            rooms: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Static application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current room store or fail with a degraded-mode error.
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn install_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current room store and enter degraded mode.
    pub async fn clear_room_store(&self) {
        {
            let mut guard = self.room_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of live rooms keyed by room id.
    pub fn rooms(&self) -> &DashMap<Uuid, Arc<RoomHandle>> {
        &self.rooms
    }

    /// The live handle for `room_id`, if the room exists in this process.
    pub fn room(&self, room_id: Uuid) -> Option<Arc<RoomHandle>> {
        self.rooms.get(&room_id).map(|entry| entry.value().clone())
    }

    /// Register a room handle in the live registry.
    pub fn insert_room(&self, room_id: Uuid, handle: Arc<RoomHandle>) {
        self.rooms.insert(room_id, handle);
    }

    /// Flip the degraded flag without touching the installed store; used by
    /// the storage supervisor while it retries a flaky backend.
    pub async fn set_degraded(&self, value: bool) {
        self.update_degraded(value).await;
    }

    /// Update and broadcast the degraded flag when the value changes.
    async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
