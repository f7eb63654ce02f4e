use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoCodeDocument, MongoPlayerDocument, MongoRoomDocument, doc_id, uuid_as_binary},
};
use crate::dao::{
    StorageResult,
    models::{PlayerEntity, RoomEntity},
    room_store::RoomStore,
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const PLAYER_COLLECTION_NAME: &str = "players";
const CODE_COLLECTION_NAME: &str = "codes";

/// Server-side error code for a unique key violation.
const DUPLICATE_KEY_CODE: i32 = 11_000;

/// Room store backed by MongoDB, with an internally swappable connection so
/// the supervisor can reconnect without rebuilding the store.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // Player documents are keyed by (room_id, player_id) so joins upsert
        // instead of duplicating.
        let player_collection = database.collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME);
        let player_index = mongodb::IndexModel::builder()
            .keys(doc! {"room_id": 1, "player_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_room_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        player_collection
            .create_index(player_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "room_id,player_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn room_collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    async fn code_collection(&self) -> Collection<MongoCodeDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoCodeDocument>(CODE_COLLECTION_NAME)
    }

    async fn save_room(&self, room: RoomEntity) -> MongoResult<()> {
        let id = room.id;
        let document: MongoRoomDocument = room.into();
        let collection = self.room_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRoom { id, source })?;

        Ok(())
    }

    async fn find_room(&self, id: Uuid) -> MongoResult<Option<RoomEntity>> {
        let collection = self.room_collection().await;

        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRoom { id, source })?;

        Ok(document.map(Into::into))
    }

    async fn save_player(&self, room_id: Uuid, player: PlayerEntity) -> MongoResult<()> {
        let player_id = player.id;
        let document: MongoPlayerDocument = (room_id, player).into();
        let collection = self.player_collection().await;
        collection
            .replace_one(
                doc! {
                    "room_id": uuid_as_binary(room_id),
                    "player_id": uuid_as_binary(player_id),
                },
                &document,
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlayer {
                room_id,
                player_id,
                source,
            })?;

        Ok(())
    }

    async fn save_players(&self, room_id: Uuid, players: Vec<PlayerEntity>) -> MongoResult<()> {
        for player in players {
            self.save_player(room_id, player).await?;
        }
        Ok(())
    }

    async fn list_players(&self, room_id: Uuid) -> MongoResult<Vec<PlayerEntity>> {
        let collection = self.player_collection().await;

        let documents: Vec<MongoPlayerDocument> = collection
            .find(doc! { "room_id": uuid_as_binary(room_id) })
            .sort(doc! { "score": -1 })
            .await
            .map_err(|source| MongoDaoError::ListPlayers { room_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPlayers { room_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn reserve_code(&self, code: String, room_id: Uuid) -> MongoResult<bool> {
        let collection = self.code_collection().await;
        let document = MongoCodeDocument {
            code: code.clone(),
            room_id,
        };

        match collection.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::ReserveCode { code, source }),
        }
    }

    async fn release_code(&self, code: String) -> MongoResult<()> {
        let collection = self.code_collection().await;
        collection
            .delete_one(doc! { "_id": &code })
            .await
            .map_err(|source| MongoDaoError::ReleaseCode { code, source })?;
        Ok(())
    }

    async fn resolve_code(&self, code: String) -> MongoResult<Option<Uuid>> {
        let collection = self.code_collection().await;
        let document = collection
            .find_one(doc! { "_id": &code })
            .await
            .map_err(|source| MongoDaoError::ResolveCode { code, source })?;
        Ok(document.map(|entry| entry.room_id))
    }
}

impl RoomStore for MongoRoomStore {
    fn save_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_room(room).await.map_err(Into::into) })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(id).await.map_err(Into::into) })
    }

    fn save_player(
        &self,
        room_id: Uuid,
        player: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_player(room_id, player).await.map_err(Into::into) })
    }

    fn save_players(
        &self,
        room_id: Uuid,
        players: Vec<PlayerEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_players(room_id, players)
                .await
                .map_err(Into::into)
        })
    }

    fn list_players(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players(room_id).await.map_err(Into::into) })
    }

    fn reserve_code(&self, code: String, room_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.reserve_code(code, room_id).await.map_err(Into::into) })
    }

    fn release_code(&self, code: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.release_code(code).await.map_err(Into::into) })
    }

    fn resolve_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<Uuid>>> {
        let store = self.clone();
        Box::pin(async move { store.resolve_code(code).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
