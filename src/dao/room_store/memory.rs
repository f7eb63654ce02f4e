//! In-process store used when no database is configured. Data lives for the
//! lifetime of the server, which covers a classroom session.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    StorageResult,
    models::{PlayerEntity, RoomEntity},
    room_store::RoomStore,
};

/// Room store backed by concurrent hash maps.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    rooms: DashMap<Uuid, RoomEntity>,
    players: DashMap<Uuid, Vec<PlayerEntity>>,
    codes: DashMap<String, Uuid>,
}

impl MemoryRoomStore {
    /// Fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert_player(&self, room_id: Uuid, player: PlayerEntity) {
        let mut roster = self.inner.players.entry(room_id).or_default();
        match roster.iter_mut().find(|existing| existing.id == player.id) {
            Some(existing) => *existing = player,
            None => roster.push(player),
        }
    }
}

impl RoomStore for MemoryRoomStore {
    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.rooms.insert(room.id, room);
            Ok(())
        })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.rooms.get(&id).map(|room| room.clone())) })
    }

    fn save_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.upsert_player(room_id, player);
            Ok(())
        })
    }

    fn save_players(
        &self,
        room_id: Uuid,
        players: Vec<PlayerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            for player in players {
                store.upsert_player(room_id, player);
            }
            Ok(())
        })
    }

    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players = store
                .inner
                .players
                .get(&room_id)
                .map(|roster| roster.clone())
                .unwrap_or_default();
            players.sort_by(|a, b| b.score.cmp(&a.score));
            Ok(players)
        })
    }

    fn reserve_code(&self, code: String, room_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            match store.inner.codes.entry(code) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(room_id);
                    Ok(true)
                }
            }
        })
    }

    fn release_code(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.codes.remove(&code);
            Ok(())
        })
    }

    fn resolve_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Uuid>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.codes.get(&code).map(|entry| *entry.value())) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{QuizEntity, RoomStateEntity};

    fn room_entity(code: &str) -> RoomEntity {
        let now = SystemTime::now();
        RoomEntity {
            id: Uuid::new_v4(),
            code: code.into(),
            host_id: Uuid::new_v4(),
            host_token: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            state: RoomStateEntity::Lobby,
            paused: false,
            quiz: QuizEntity {
                title: "t".into(),
                questions: Vec::new(),
            },
            current_question_index: None,
            question_start: None,
            pause_start: None,
            paused_accum_ms: 0,
            leader: None,
            winner: None,
        }
    }

    fn player_entity(name: &str, score: u32) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            score,
            joined_at: SystemTime::now(),
            answers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn codes_reserve_exactly_once() {
        let store = MemoryRoomStore::new();
        let first_room = Uuid::new_v4();

        assert!(store.reserve_code("123456".into(), first_room).await.unwrap());
        assert!(!store.reserve_code("123456".into(), Uuid::new_v4()).await.unwrap());
        assert_eq!(
            store.resolve_code("123456".into()).await.unwrap(),
            Some(first_room)
        );

        store.release_code("123456".into()).await.unwrap();
        assert!(store.reserve_code("123456".into(), Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn rooms_round_trip() {
        let store = MemoryRoomStore::new();
        let room = room_entity("654321");
        let id = room.id;

        store.save_room(room.clone()).await.unwrap();
        assert_eq!(store.find_room(id).await.unwrap(), Some(room));
        assert_eq!(store.find_room(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn players_upsert_and_sort_by_score() {
        let store = MemoryRoomStore::new();
        let room_id = Uuid::new_v4();
        let mut ada = player_entity("ada", 100);
        let grace = player_entity("grace", 900);

        store.save_player(room_id, ada.clone()).await.unwrap();
        store.save_player(room_id, grace.clone()).await.unwrap();

        ada.score = 1_200;
        store.save_player(room_id, ada.clone()).await.unwrap();

        let players = store.list_players(room_id).await.unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "ada");
        assert_eq!(players[1].name, "grace");
    }

    #[tokio::test]
    async fn save_players_batch_upserts() {
        let store = MemoryRoomStore::new();
        let room_id = Uuid::new_v4();
        let players = vec![player_entity("a", 1), player_entity("b", 2)];

        store.save_players(room_id, players.clone()).await.unwrap();
        store.save_players(room_id, players).await.unwrap();

        assert_eq!(store.list_players(room_id).await.unwrap().len(), 2);
    }
}
