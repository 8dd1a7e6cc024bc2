//! MongoDB backend for [`DocumentStore`].

use std::fmt;
use std::time::Duration;

use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::executor::DEFAULT_QUERY_TIMEOUT;
use crate::store::{DocumentStore, FindOptions, StoreError};

/// Database used when the connection string names none.
const FALLBACK_DATABASE: &str = "test";
const MAX_TIME_MS_EXPIRED: i32 = 50;
const MAX_MESSAGE_CHARS: usize = 300;

/// A pooled, read-only view of one database.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    max_time: Duration,
}

impl MongoStore {
    /// Build the process-wide client. No server round trip happens here; see
    /// [`MongoStore::ping`].
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let mut options = ClientOptions::parse(config.uri()).await.map_err(|_| {
            StoreError::Configuration("MONGODB_URI is not a valid connection string".into())
        })?;
        options.max_pool_size = Some(config.max_pool_size);
        options.min_pool_size = Some(config.min_pool_size);
        options.app_name.get_or_insert_with(|| "trogon-query-tool".to_string());

        let client = Client::with_options(options)
            .map_err(|_| StoreError::Configuration("could not build database client".into()))?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));

        info!(
            database = %db.name(),
            max_pool_size = config.max_pool_size,
            min_pool_size = config.min_pool_size,
            "document store configured"
        );
        Ok(Self {
            db,
            max_time: DEFAULT_QUERY_TIMEOUT,
        })
    }

    /// Server-side time limit attached to every operation.
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

impl fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.db.name())
            .field("max_time", &self.max_time)
            .finish()
    }
}

impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Map<String, Value>,
        options: FindOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<Value>, StoreError> {
        let coll = self.db.collection::<Document>(collection);
        let filter = to_document(filter)?;
        let projection = to_document(options.projection)?;
        let sort = to_document(options.sort)?;

        let query = async {
            let mut find = coll.find(filter).limit(options.limit).max_time(self.max_time);
            if !projection.is_empty() {
                find = find.projection(projection);
            }
            if !sort.is_empty() {
                find = find.sort(sort);
            }
            find.await?.try_collect::<Vec<Document>>().await
        };

        // Returning on cancellation drops the open cursor, which the driver kills server-side.
        let documents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            result = query => result.map_err(classify)?,
        };
        Ok(documents.into_iter().map(to_json).collect())
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<Value>,
        cancel: CancellationToken,
    ) -> Result<Vec<Value>, StoreError> {
        let coll = self.db.collection::<Document>(collection);
        let stages = pipeline
            .into_iter()
            .map(|stage| match stage {
                Value::Object(map) => to_document(map),
                _ => Err(StoreError::Execution("each pipeline stage must be an object".into())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let query = async {
            coll.aggregate(stages)
                .max_time(self.max_time)
                .await?
                .try_collect::<Vec<Document>>()
                .await
        };

        let documents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StoreError::Cancelled),
            result = query => result.map_err(classify)?,
        };
        Ok(documents.into_iter().map(to_json).collect())
    }
}

/// Honours extended JSON such as `{"$oid": ...}` and `{"$date": ...}`.
fn to_document(map: Map<String, Value>) -> Result<Document, StoreError> {
    match Bson::try_from(Value::Object(map)) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) | Err(_) => Err(StoreError::Execution("invalid extended JSON value".into())),
    }
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

/// Map a driver error to something safe to show a model. Only server command
/// messages pass through; everything else is generic so hosts and credentials
/// never leak.
fn classify(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        MongoErrorKind::Command(command) if command.code == MAX_TIME_MS_EXPIRED => StoreError::Timeout,
        MongoErrorKind::Command(command) => StoreError::Execution(truncate(&command.message)),
        MongoErrorKind::Authentication { .. }
        | MongoErrorKind::ServerSelection { .. }
        | MongoErrorKind::DnsResolve { .. }
        | MongoErrorKind::Io(_)
        | MongoErrorKind::ConnectionPoolCleared { .. } => {
            warn!("document store unreachable");
            StoreError::Unavailable
        }
        _ => {
            warn!("unclassified document store error");
            StoreError::Execution("database error".into())
        }
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
    cut.push('…');
    cut
}
