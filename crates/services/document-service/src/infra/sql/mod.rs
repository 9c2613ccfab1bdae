//! Postgres document store on SeaORM.
//!
//! All collections share one `documents` table with a JSONB body. Equality
//! filters use JSONB containment, substring filters `ILIKE` on the extracted
//! text and ordering the JSONB path.

mod entity;
pub mod migrations;

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict, Order, SimpleExpr};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select, Statement,
};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use common::{AppError, AppResult, StoreCredentials};
use domain::{EntityDescriptor, OrderBy};

use self::entity::{ActiveModel, Column, Entity as Documents, Model};
use self::migrations::Migrator;
use super::store::{
    Document, DocumentStore, Filter, FindOptions, StoreConnector, StoredDocument, ID_FIELD,
};

const MAX_CONNECTIONS: u32 = 20;
const MIN_CONNECTIONS: u32 = 1;

/// Connector opening pooled Postgres connections and applying migrations.
#[derive(Debug, Clone, Default)]
pub struct SqlConnector;

#[async_trait]
impl StoreConnector for SqlConnector {
    async fn connect(&self, credentials: &StoreCredentials) -> AppResult<Arc<dyn DocumentStore>> {
        let mut options = ConnectOptions::new(credentials.connection_url());
        options
            .max_connections(MAX_CONNECTIONS)
            .min_connections(MIN_CONNECTIONS)
            .sqlx_logging(false);

        let db = Database::connect(options).await?;

        // Run pending migrations
        Migrator::up(&db, None).await?;
        info!(
            "Database {} on {}:{} connected and migrations applied",
            credentials.db_name, credentials.host, credentials.port
        );

        Ok(Arc::new(SqlStore::new(db)))
    }
}

/// One pooled connection onto the documents table.
#[derive(Clone)]
pub struct SqlStore {
    connection_id: Uuid,
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            db,
        }
    }

    fn select(&self, collection: &str, filters: &[Filter]) -> AppResult<Select<Documents>> {
        let mut conditions = Condition::all().add(Column::Collection.eq(collection));
        for filter in filters {
            conditions = conditions.add(condition(filter)?);
        }
        Ok(Documents::find().filter(conditions))
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    async fn ensure_collection(&self, descriptor: &'static EntityDescriptor) -> AppResult<()> {
        let collection = identifier(descriptor.collection)?;
        for field in descriptor.indexed_fields {
            let field = identifier(field)?;
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS idx_{c}_{f} ON documents ((body ->> '{f}')) \
                 WHERE collection = '{c}'",
                c = collection,
                f = field
            );
            self.db.execute_unprepared(&sql).await?;
        }
        debug!("Indexes ensured for collection {}", collection);
        Ok(())
    }

    async fn find(&self, collection: &str, options: FindOptions) -> AppResult<Vec<StoredDocument>> {
        let mut query = sorted(self.select(collection, &options.filters)?, &options.sort);
        if options.skip > 0 {
            query = query.offset(options.skip);
        }
        if let Some(limit) = options.limit {
            query = query.limit(limit);
        }

        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(into_document)
            .collect()
    }

    async fn count(&self, collection: &str, filters: Vec<Filter>) -> AppResult<u64> {
        Ok(self.select(collection, &filters)?.count(&self.db).await?)
    }

    async fn insert_one(&self, collection: &str, body: Document) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        Documents::insert(active_model(id, collection, body))
            .exec_without_returning(&self.db)
            .await?;
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, bodies: Vec<Document>) -> AppResult<Vec<Uuid>> {
        if bodies.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = bodies.iter().map(|_| Uuid::new_v4()).collect();
        let models = ids
            .iter()
            .zip(bodies)
            .map(|(id, body)| active_model(*id, collection, body));

        Documents::insert_many(models)
            .exec_without_returning(&self.db)
            .await?;
        Ok(ids)
    }

    async fn replace_one(&self, collection: &str, id: Uuid, body: Document) -> AppResult<()> {
        Documents::insert(active_model(id, collection, body))
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_column(Column::Body)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_one(&self, collection: &str, id: Uuid) -> AppResult<bool> {
        let result = Documents::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::Collection.eq(collection))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.db.clone().close().await?;
        debug!("Closed database connection {}", self.connection_id);
        Ok(())
    }
}

fn active_model(id: Uuid, collection: &str, body: Document) -> ActiveModel {
    ActiveModel {
        id: Set(id),
        collection: Set(collection.to_string()),
        body: Set(Value::Object(body)),
    }
}

fn into_document(model: Model) -> AppResult<StoredDocument> {
    match model.body {
        Value::Object(body) => Ok(StoredDocument::new(model.id, body)),
        other => Err(AppError::internal(format!(
            "Document {} has a non-object body: {}",
            model.id, other
        ))),
    }
}

/// Names spliced into DDL must be plain lowercase identifiers.
fn identifier(name: &str) -> AppResult<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(AppError::internal(format!("'{}' is not a valid identifier", name)))
    }
}

/// Apply the requested ordering, always ending on the primary key so that
/// offset paging stays stable when sort keys tie.
fn sorted(mut query: Select<Documents>, sort: &[OrderBy]) -> Select<Documents> {
    for order in sort {
        let direction = if order.ascending {
            Order::Asc
        } else {
            Order::Desc
        };
        query = if order.field_name == ID_FIELD {
            query.order_by(Column::Id, direction)
        } else {
            query.order_by(
                Expr::cust_with_values("body -> $1", [order.field_name.clone()]),
                direction,
            )
        };
    }
    if sort.iter().any(|order| order.field_name == ID_FIELD) {
        query
    } else {
        query.order_by(Column::Id, Order::Asc)
    }
}

fn parse_id(value: &Value) -> AppResult<Uuid> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest(format!("'{}' is not a valid id", value)))
}

fn contains_json(field: &str, value: &Value) -> SimpleExpr {
    Expr::cust_with_values("body @> $1", [json!({ field: value })])
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn condition(filter: &Filter) -> AppResult<Condition> {
    let condition = match filter {
        Filter::Eq(field, value) if field == ID_FIELD => {
            Condition::all().add(Column::Id.eq(parse_id(value)?))
        }
        Filter::Eq(field, value) => Condition::all().add(contains_json(field, value)),
        Filter::In(field, values) if field == ID_FIELD => {
            let ids = values.iter().map(parse_id).collect::<AppResult<Vec<_>>>()?;
            Condition::all().add(Column::Id.is_in(ids))
        }
        Filter::In(_, values) if values.is_empty() => Condition::all().add(Expr::cust("FALSE")),
        Filter::In(field, values) => values
            .iter()
            .fold(Condition::any(), |any, value| any.add(contains_json(field, value))),
        Filter::Contains(field, _) if field == ID_FIELD => {
            return Err(AppError::BadRequest(
                "Substring search is not supported on id".to_string(),
            ))
        }
        Filter::Contains(field, text) => Condition::all().add(Expr::cust_with_values(
            "body ->> $1 ILIKE $2",
            [field.clone(), format!("%{}%", escape_like(text))],
        )),
        Filter::And(filters) => {
            let mut all = Condition::all();
            for filter in filters {
                all = all.add(condition(filter)?);
            }
            all
        }
        Filter::Or(filters) => {
            let mut any = Condition::any();
            for filter in filters {
                any = any.add(condition(filter)?);
            }
            any
        }
    };
    Ok(condition)
}
