//! Background supervision of the room store connection.
//!
//! While the store is unreachable the shared state is flagged degraded: live
//! rooms keep serving from memory, and every operation that must persist
//! fails with 503 until the store comes back.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{StorageError, room_store::RoomStore},
    state::SharedState,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Supervise the room store: connect with backoff, install the store, then
/// poll its health. A connection that cannot be recovered in place is dropped
/// and rebuilt from scratch.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn RoomStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                info!(live_rooms = state.rooms().len(), "room store connected");
                state.install_room_store(store.clone()).await;
                backoff.reset();
                watch_store(&state, store).await;
            }
            Err(err) => {
                warn!(error = %err, "room store connection attempt failed");
            }
        }
        backoff.wait().await;
    }
}

/// Poll the store until a health check fails and reconnection is exhausted.
async fn watch_store(state: &SharedState, store: Arc<dyn RoomStore>) {
    loop {
        if let Err(err) = store.health_check().await {
            warn!(
                error = %err,
                live_rooms = state.rooms().len(),
                "room store health check failed"
            );
            if !reconnect(state, &store).await {
                return;
            }
        } else if state.is_degraded().await {
            info!("room store healthy again; leaving degraded mode");
            state.set_degraded(false).await;
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

/// Bounded in-place reconnect attempts. The state goes degraded on the first
/// failed attempt; returns whether the store came back.
async fn reconnect(state: &SharedState, store: &Arc<dyn RoomStore>) -> bool {
    let mut backoff = Backoff::new();

    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "room store reconnected");
                state.set_degraded(false).await;
                return true;
            }
            Err(err) => {
                if attempt == 1 {
                    warn!(
                        attempt,
                        error = %err,
                        live_rooms = state.rooms().len(),
                        "room store reconnect failed; entering degraded mode"
                    );
                    state.set_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "room store reconnect failed");
                }
                backoff.wait().await;
            }
        }
    }

    warn!("room store reconnect attempts exhausted; rebuilding the connection");
    false
}

/// Exponential delay capped at [`MAX_BACKOFF`].
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_BACKOFF,
        }
    }

    fn reset(&mut self) {
        self.delay = INITIAL_BACKOFF;
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{config::AppConfig, dao::room_store::memory::MemoryRoomStore, state::AppState};

    #[tokio::test(start_paused = true)]
    async fn installs_the_store_after_failed_connection_attempts() {
        let state = AppState::new(AppConfig::default());
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        tokio::spawn(run(state.clone(), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(StorageError::unavailable(
                        "connection refused".into(),
                        std::io::Error::other("connection refused"),
                    ))
                } else {
                    Ok(Arc::new(MemoryRoomStore::new()) as Arc<dyn RoomStore>)
                }
            }
        }));

        tokio::time::timeout(Duration::from_secs(60), async {
            while state.is_degraded().await {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("store never got installed");

        assert!(state.room_store().await.is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
