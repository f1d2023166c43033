use mongodb::{options::ClientOptions, Client, Database};
use tracing::info;

use crate::db::{MongoStore, StoreError};

pub async fn init_db(mongo_uri: &str, db_name: &str) -> Result<Database, StoreError> {
    let mut client_options = ClientOptions::parse(mongo_uri)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to parse MongoDB URI: {e}")))?;

    client_options.app_name = Some("Pollverse".to_string());

    let client = Client::with_options(client_options).map_err(|e| {
        StoreError::Unavailable(format!("Failed to initialize MongoDB client: {e}"))
    })?;

    info!(db = %db_name, "database client initialized");

    Ok(client.database(db_name))
}

/// Connects and makes sure the uniqueness indexes exist before any request
/// is served.
pub async fn connect_store(mongo_uri: &str, db_name: &str) -> Result<MongoStore, StoreError> {
    let database = init_db(mongo_uri, db_name).await?;
    let store = MongoStore::new(database);
    store.ensure_indexes().await?;
    Ok(store)
}
