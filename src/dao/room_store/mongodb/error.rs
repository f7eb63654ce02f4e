use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save room `{id}`")]
    SaveRoom {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load room `{id}`")]
    LoadRoom {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save player `{player_id}` in room `{room_id}`")]
    SavePlayer {
        room_id: Uuid,
        player_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list players for room `{room_id}`")]
    ListPlayers {
        room_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to reserve join code `{code}`")]
    ReserveCode {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to release join code `{code}`")]
    ReleaseCode {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to resolve join code `{code}`")]
    ResolveCode {
        code: String,
        #[source]
        source: MongoError,
    },
}
