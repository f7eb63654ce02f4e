//! Room lifecycle: creation with join-code allocation, code resolution, and
//! lazy loading of persisted rooms into the live registry.

use std::sync::Arc;

use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::rooms::{CreateRoomRequest, CreateRoomResponse},
    error::ServiceError,
    state::{
        RoomHandle, SharedState,
        room::{RoomSession, phase_from_entity},
        state_machine::RoomPhase,
    },
};

/// Reservation attempts before giving up on finding a free join code.
const MAX_CODE_ATTEMPTS: u32 = 8;

/// Random six-digit join code; never starts with zero so codes survive
/// clients that parse them as integers.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Create a room in the lobby phase, reserving a unique join code for it.
///
/// Code reservation is transactional in the store, so two rooms racing for the
/// same code cannot both win. After [`MAX_CODE_ATTEMPTS`] collisions the code
/// space is considered exhausted and the request fails with 503.
pub async fn create_room(
    state: &SharedState,
    payload: CreateRoomRequest,
) -> Result<CreateRoomResponse, ServiceError> {
    let store = state.require_room_store().await?;

    let quiz = match payload.quiz {
        Some(quiz) => quiz.into(),
        None => state.config().default_quiz().clone(),
    };

    let mut session = RoomSession::new(generate_code(), quiz);
    let mut reserved = false;
    for attempt in 0..MAX_CODE_ATTEMPTS {
        if attempt > 0 {
            session.code = generate_code();
        }
        if store
            .reserve_code(session.code.clone(), session.id)
            .await?
        {
            reserved = true;
            break;
        }
    }
    if !reserved {
        return Err(ServiceError::Exhausted(
            "no free join code after several attempts".into(),
        ));
    }

    if let Err(err) = store.save_room(session.to_entity(RoomPhase::Lobby)).await {
        // Give the code back so the failed room does not burn it.
        let _ = store.release_code(session.code.clone()).await;
        return Err(err.into());
    }

    let response = CreateRoomResponse {
        room_id: session.id,
        code: session.code.clone(),
        host_id: session.host_id,
        host_token: session.host_token,
    };

    info!(room_id = %session.id, code = %session.code, "room created");
    let handle = RoomHandle::new(session, RoomPhase::Lobby);
    state.insert_room(response.room_id, handle);

    Ok(response)
}

/// Resolve a six-digit join code to a room id.
pub async fn resolve_code(state: &SharedState, code: &str) -> Result<Uuid, ServiceError> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::InvalidInput(
            "join codes are exactly six digits".into(),
        ));
    }

    let store = state.require_room_store().await?;
    store
        .resolve_code(code.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no room with code {code}")))
}

/// Fetch the live handle for a room, re-hydrating it from storage when this
/// process has not seen it yet.
pub async fn load_room(
    state: &SharedState,
    room_id: Uuid,
) -> Result<Arc<RoomHandle>, ServiceError> {
    if let Some(handle) = state.room(room_id) {
        return Ok(handle);
    }

    let store = state.require_room_store().await?;
    let entity = store
        .find_room(room_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no room {room_id}")))?;
    let players = store.list_players(room_id).await?;

    let phase = phase_from_entity(entity.state, entity.paused);
    let session = RoomSession::from_entities(entity, players);
    let handle = RoomHandle::new(session, phase);
    state.insert_room(room_id, handle.clone());

    info!(room_id = %room_id, "room re-hydrated from storage");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            StorageResult,
            models::{PlayerEntity, RoomEntity},
            room_store::{RoomStore, memory::MemoryRoomStore},
        },
        state::AppState,
    };

    /// Store whose code space is always taken.
    struct CollidingStore {
        inner: MemoryRoomStore,
    }

    impl RoomStore for CollidingStore {
        fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save_room(room)
        }

        fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            self.inner.find_room(id)
        }

        fn save_player(
            &self,
            room_id: Uuid,
            player: PlayerEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save_player(room_id, player)
        }

        fn save_players(
            &self,
            room_id: Uuid,
            players: Vec<PlayerEntity>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.save_players(room_id, players)
        }

        fn list_players(
            &self,
            room_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
            self.inner.list_players(room_id)
        }

        fn reserve_code(&self, _: String, _: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }

        fn release_code(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.release_code(code)
        }

        fn resolve_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Uuid>>> {
            self.inner.resolve_code(code)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    async fn state_with_memory_store() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        state
    }

    #[tokio::test]
    async fn create_room_allocates_a_six_digit_code() {
        let state = state_with_memory_store().await;

        let response = create_room(&state, CreateRoomRequest { quiz: None })
            .await
            .unwrap();

        assert_eq!(response.code.len(), 6);
        assert!(response.code.chars().all(|c| c.is_ascii_digit()));
        assert!(state.room(response.room_id).is_some());
        assert_eq!(
            resolve_code(&state, &response.code).await.unwrap(),
            response.room_id
        );
    }

    #[tokio::test]
    async fn create_room_fails_when_codes_are_exhausted() {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(CollidingStore {
                inner: MemoryRoomStore::new(),
            }))
            .await;

        let result = create_room(&state, CreateRoomRequest { quiz: None }).await;
        assert!(matches!(result, Err(ServiceError::Exhausted(_))));
    }

    #[tokio::test]
    async fn create_room_without_store_is_degraded() {
        let state = AppState::new(AppConfig::default());
        let result = create_room(&state, CreateRoomRequest { quiz: None }).await;
        assert!(matches!(result, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn resolve_code_rejects_malformed_codes() {
        let state = state_with_memory_store().await;

        for code in ["", "12345", "1234567", "12a456"] {
            assert!(matches!(
                resolve_code(&state, code).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn load_room_rehydrates_from_storage() {
        let state = state_with_memory_store().await;
        let response = create_room(&state, CreateRoomRequest { quiz: None })
            .await
            .unwrap();

        // Drop the live handle and load again through the store.
        state.rooms().remove(&response.room_id);
        let handle = load_room(&state, response.room_id).await.unwrap();

        let session = handle.session().read().await;
        assert_eq!(session.code, response.code);
        assert_eq!(handle.phase().await, RoomPhase::Lobby);
    }
}
