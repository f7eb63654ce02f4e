pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::StorageResult;
use crate::dao::models::{PlayerEntity, RoomEntity};
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for rooms, players, and join codes.
pub trait RoomStore: Send + Sync {
    /// Upsert the room document (roster excluded).
    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a room document by id.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Upsert a single player document for the given room.
    fn save_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Upsert a batch of player documents for the given room.
    fn save_players(
        &self,
        room_id: Uuid,
        players: Vec<PlayerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// List the room's players ordered by score descending.
    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    /// Atomically claim a join code for a room. Returns false when taken.
    fn reserve_code(
        &self,
        code: String,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Free a previously reserved join code.
    fn release_code(&self, code: String) -> BoxFuture<'static, StorageResult<()>>;
    /// Resolve a join code to the room that owns it.
    fn resolve_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Uuid>>>;
    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
