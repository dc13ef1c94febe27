//! Dining Table Repository

use super::{BaseRepository, CountRow, RepoError, RepoResult};
use crate::db::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use crate::utils::time::now_millis;
use shared::{PageQuery, PaginatedResponse};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

/// 唯一索引名，见 `db::bootstrap_schema`
const UNIQUE_INDEX: &str = "dining_table_restaurant_no";

#[derive(Clone)]
pub struct DiningTableRepository {
    base: BaseRepository,
}

impl DiningTableRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Page through all dining tables, newest first by default
    pub async fn find_all_paged(
        &self,
        query: &PageQuery,
    ) -> RepoResult<PaginatedResponse<DiningTable>> {
        let order = if query.ascending() { "ASC" } else { "DESC" };
        let mut result = self
            .base
            .db()
            .query(format!(
                "SELECT * FROM dining_table ORDER BY created_at {order} LIMIT $limit START $start"
            ))
            .query("SELECT count() AS count FROM dining_table GROUP ALL")
            .bind(("limit", query.limit() as i64))
            .bind(("start", query.offset() as i64))
            .await?;
        let tables: Vec<DiningTable> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        let total = counts.first().map(|c| c.count).unwrap_or(0);
        Ok(PaginatedResponse::new(
            tables,
            total,
            query.page(),
            query.limit(),
        ))
    }

    /// Find all tables of a restaurant, optionally filtered by floor type
    ///
    /// `floor_type = "all"` 是哨兵值，等同于不过滤。
    pub async fn find_by_restaurant(
        &self,
        restaurant: &RecordId,
        floor_type: Option<&str>,
        ascending: bool,
    ) -> RepoResult<Vec<DiningTable>> {
        let order = if ascending { "ASC" } else { "DESC" };
        let floor_filter = floor_type.filter(|f| *f != "all");

        let sql = if floor_filter.is_some() {
            format!(
                "SELECT * FROM dining_table \
                 WHERE restaurant = $restaurant AND floor_type = $floor_type \
                 ORDER BY created_at {order}"
            )
        } else {
            format!(
                "SELECT * FROM dining_table WHERE restaurant = $restaurant \
                 ORDER BY created_at {order}"
            )
        };

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("restaurant", restaurant.clone()));
        if let Some(floor) = floor_filter {
            query = query.bind(("floor_type", floor.to_string()));
        }

        let tables: Vec<DiningTable> = query.await?.take(0)?;
        Ok(tables)
    }

    /// Find table by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<DiningTable>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let table: Option<DiningTable> = self.base.db().select(thing).await?;
        Ok(table)
    }

    /// Find table by number within a restaurant
    pub async fn find_by_no_in_restaurant(
        &self,
        restaurant: &RecordId,
        table_no: u32,
    ) -> RepoResult<Option<DiningTable>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM dining_table \
                 WHERE restaurant = $restaurant AND table_no = $table_no LIMIT 1",
            )
            .bind(("restaurant", restaurant.clone()))
            .bind(("table_no", table_no))
            .await?;
        let tables: Vec<DiningTable> = result.take(0)?;
        Ok(tables.into_iter().next())
    }

    /// Create a new dining table
    ///
    /// The conflict guard pre-checks `(restaurant, table_no)`; the unique
    /// index remains the authoritative word under racing creates, its
    /// rejection is mapped back to [`RepoError::Duplicate`] here.
    pub async fn create(&self, data: DiningTableCreate) -> RepoResult<DiningTable> {
        let table_no = data.table_no;

        // 显式 CREATE 语句，避免 restaurant 被序列化为字符串
        let mut response = self
            .base
            .db()
            .query(
                "CREATE dining_table SET table_no = $table_no, capacity = $capacity, \
                 cost_person = $cost_person, restaurant = $restaurant, \
                 booking_status = $booking_status, floor_type = $floor_type, \
                 position = $position, created_at = $created_at",
            )
            .bind(("table_no", data.table_no))
            .bind(("capacity", data.capacity))
            .bind(("cost_person", data.cost_person))
            .bind(("restaurant", data.restaurant))
            .bind(("booking_status", data.booking_status))
            .bind(("floor_type", data.floor_type))
            .bind(("position", data.position))
            .bind(("created_at", now_millis()))
            .await?;

        let created: Vec<DiningTable> = response
            .take(0)
            .map_err(|e| map_index_violation(e, table_no))?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create dining table".to_string()))
    }

    /// Update a dining table
    pub async fn update(&self, id: &str, data: DiningTableUpdate) -> RepoResult<DiningTable> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Dining table {} not found", id)))?;

        // 手动构建 UPDATE 语句，避免 restaurant 被序列化为字符串
        let table_no = data.table_no.unwrap_or(existing.table_no);
        let capacity = data.capacity.unwrap_or(existing.capacity);
        let cost_person = data.cost_person.unwrap_or(existing.cost_person);
        let restaurant = data.restaurant.unwrap_or(existing.restaurant);
        let booking_status = data.booking_status.unwrap_or(existing.booking_status);
        let floor_type = data.floor_type.unwrap_or(existing.floor_type);
        let position = data.position.unwrap_or(existing.position);

        let response = self
            .base
            .db()
            .query(
                "UPDATE $thing SET table_no = $table_no, capacity = $capacity, \
                 cost_person = $cost_person, restaurant = $restaurant, \
                 booking_status = $booking_status, floor_type = $floor_type, \
                 position = $position",
            )
            .bind(("thing", thing.clone()))
            .bind(("table_no", table_no))
            .bind(("capacity", capacity))
            .bind(("cost_person", cost_person))
            .bind(("restaurant", restaurant))
            .bind(("booking_status", booking_status))
            .bind(("floor_type", floor_type))
            .bind(("position", position))
            .await?;
        if let Err(e) = response.check() {
            return Err(map_index_violation(e, table_no));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Dining table {} not found", id)))
    }

    /// Hard delete a dining table, returning the deleted record
    pub async fn delete(&self, id: &str) -> RepoResult<DiningTable> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let deleted: Option<DiningTable> = self.base.db().delete(thing).await?;
        deleted.ok_or_else(|| RepoError::NotFound(format!("Dining table {} not found", id)))
    }
}

/// Map a unique-index rejection to `Duplicate`, anything else to `Database`
fn map_index_violation(err: surrealdb::Error, table_no: u32) -> RepoError {
    let message = err.to_string();
    if message.contains(UNIQUE_INDEX) {
        RepoError::Duplicate(format!(
            "Table {} already exists in this restaurant",
            table_no
        ))
    } else {
        RepoError::Database(message)
    }
}
