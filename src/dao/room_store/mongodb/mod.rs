mod connection;
mod error;
mod models;
pub mod config;
pub mod store;

pub use error::MongoDaoError;
pub use store::MongoRoomStore;

use crate::dao::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
