//! Event repository for database operations.

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use domain::models::{EventChanges, EventFilter, EventSort, NewEvent, SortKey};

use crate::entities::{EventCategoryEntity, EventEntity};
use crate::metrics::QueryTimer;

const EVENT_COLUMNS: &str = "id, title, body, status, author_id, event_date, event_time, \
                             location, capacity, created_at, modified_at";

/// Builds the dynamic WHERE clause for a catalog scan and keeps the values
/// to bind in placeholder order.
struct EventFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
    status: String,
    category_slug: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    location_pattern: Option<String>,
    search: Option<String>,
}

impl EventFilterBuilder {
    fn build(filter: &EventFilter) -> Self {
        let mut conditions = vec!["status = $1".to_string()];
        let mut param_count = 1;

        if filter.category_slug.is_some() {
            param_count += 1;
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM event_categories ec \
                 JOIN categories c ON c.id = ec.category_id \
                 WHERE ec.event_id = events.id AND c.slug = ${})",
                param_count
            ));
        }

        let (date_from, date_to) = filter
            .date_range
            .map(|r| (r.from, r.to))
            .unwrap_or((None, None));
        if filter.date_range.is_some() {
            conditions.push("event_date IS NOT NULL".to_string());
        }
        if date_from.is_some() {
            param_count += 1;
            conditions.push(format!("event_date >= ${}", param_count));
        }
        if date_to.is_some() {
            param_count += 1;
            conditions.push(format!("event_date <= ${}", param_count));
        }

        if filter.location_contains.is_some() {
            param_count += 1;
            conditions.push(format!("location ILIKE ${} ESCAPE '\\'", param_count));
        }

        if filter.search.is_some() {
            param_count += 1;
            conditions.push(format!(
                "to_tsvector('simple', title || ' ' || body) @@ plainto_tsquery('simple', ${})",
                param_count
            ));
        }

        Self {
            conditions,
            param_count,
            status: filter.status.as_str().to_string(),
            category_slug: filter.category_slug.clone(),
            date_from,
            date_to,
            location_pattern: filter.location_contains.as_deref().map(like_pattern),
            search: filter.search.clone(),
        }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }

    fn param_count(&self) -> i32 {
        self.param_count
    }
}

/// Binds the filter values in the order the builder numbered them.
macro_rules! bind_event_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder.bind(&$filter.status);
        if let Some(ref slug) = $filter.category_slug {
            b = b.bind(slug);
        }
        if let Some(from) = $filter.date_from {
            b = b.bind(from);
        }
        if let Some(to) = $filter.date_to {
            b = b.bind(to);
        }
        if let Some(ref pattern) = $filter.location_pattern {
            b = b.bind(pattern);
        }
        if let Some(ref search) = $filter.search {
            b = b.bind(search);
        }
        b
    }};
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Capacity as stored in the `INTEGER` column.
fn column_capacity(capacity: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(capacity).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// ORDER BY clause for a sort. Always ends with `id ASC` so ties are stable.
fn order_clause(sort: EventSort) -> String {
    let dir = sort.direction.as_sql();
    match sort.key {
        SortKey::CreatedDate => format!("created_at {dir}, id ASC"),
        SortKey::Title => format!("lower(title) COLLATE \"C\" {dir}, id ASC"),
        SortKey::EventDate => format!("event_date {dir} NULLS LAST, id ASC"),
    }
}

/// Repository for event-related database operations.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Creates a new EventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted window of events plus the total number of matches.
    pub async fn list(
        &self,
        filter: &EventFilter,
        sort: EventSort,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<EventEntity>, i64), sqlx::Error> {
        let builder = EventFilterBuilder::build(filter);
        let where_clause = builder.where_clause();
        let param_count = builder.param_count();

        let timer = QueryTimer::new("count_events");
        let count_query = format!("SELECT COUNT(*) FROM events WHERE {}", where_clause);
        let count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        let total = bind_event_filters!(count_builder, builder)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        let total = total?;

        let timer = QueryTimer::new("list_events");
        let list_query = format!(
            "SELECT {} FROM events WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            EVENT_COLUMNS,
            where_clause,
            order_clause(sort),
            param_count + 1,
            param_count + 2
        );
        let list_builder = sqlx::query_as::<_, EventEntity>(&list_query);
        let rows = bind_event_filters!(list_builder, builder)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        Ok((rows?, total))
    }

    /// Find event by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_by_id");
        let query = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let result = sqlx::query_as::<_, EventEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Categories attached to any of the given events, ordered by name.
    pub async fn categories_for(
        &self,
        event_ids: &[i64],
    ) -> Result<Vec<EventCategoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_categories");
        let result = sqlx::query_as::<_, EventCategoryEntity>(
            r#"
            SELECT ec.event_id, c.id, c.name, c.slug
            FROM event_categories ec
            JOIN categories c ON c.id = ec.category_id
            WHERE ec.event_id = ANY($1)
            ORDER BY c.name, c.id
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Create an event and link its categories in one transaction.
    pub async fn create(&self, input: &NewEvent) -> Result<EventEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_event");
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO events (title, body, status, author_id, event_date, event_time,
                                location, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );
        let capacity = column_capacity(input.capacity)?;
        let entity = sqlx::query_as::<_, EventEntity>(&query)
            .bind(&input.title)
            .bind(&input.body)
            .bind(input.status.as_str())
            .bind(input.author_id)
            .bind(input.date)
            .bind(&input.time)
            .bind(&input.location)
            .bind(capacity)
            .fetch_one(&mut *tx)
            .await?;

        let category_ids: Vec<i64> = input.category_ids.iter().map(|c| c.0).collect();
        link_categories(&mut tx, entity.id, &category_ids).await?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Apply a partial update. Returns `None` when the event does not exist.
    pub async fn update(
        &self,
        id: i64,
        changes: &EventChanges,
    ) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_event");
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            UPDATE events SET
                title       = COALESCE($2, title),
                body        = COALESCE($3, body),
                status      = COALESCE($4, status),
                event_date  = CASE WHEN $5 THEN $6 ELSE event_date END,
                event_time  = CASE WHEN $7::text IS NULL THEN event_time
                                   WHEN $7 = '' THEN NULL
                                   ELSE $7 END,
                location    = COALESCE($8, location),
                capacity    = COALESCE($9, capacity),
                modified_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );
        let capacity = changes.capacity.map(column_capacity).transpose()?;
        let entity = sqlx::query_as::<_, EventEntity>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.body)
            .bind(changes.status.map(|s| s.as_str()))
            .bind(changes.date.is_some())
            .bind(changes.date.flatten())
            .bind(&changes.time)
            .bind(&changes.location)
            .bind(capacity)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(entity) = entity else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        if let Some(category_ids) = &changes.category_ids {
            sqlx::query("DELETE FROM event_categories WHERE event_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            let ids: Vec<i64> = category_ids.iter().map(|c| c.0).collect();
            link_categories(&mut tx, id, &ids).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(Some(entity))
    }
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    event_id: i64,
    category_ids: &[i64],
) -> Result<(), sqlx::Error> {
    if category_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO event_categories (event_id, category_id)
        SELECT $1, UNNEST($2::bigint[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(event_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
