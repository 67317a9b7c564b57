//! Database operations for the `categories` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use streamnet_core::CategoryRecord;

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub first_seen: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
}

/// Records a category. A repeat observation refreshes `name` only;
/// `first_seen` and `last_scanned` are untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn observe_category(pool: &PgPool, category: &CategoryRecord) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO categories (id, name) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
    )
    .bind(&category.id)
    .bind(&category.name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Batch form of [`observe_category`] in one round-trip.
///
/// Returns the number of categories seen for the first time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn observe_categories(
    pool: &PgPool,
    categories: &[CategoryRecord],
) -> Result<u64, DbError> {
    if categories.is_empty() {
        return Ok(0);
    }

    // A duplicate id inside one batch would make ON CONFLICT touch the same
    // row twice, which Postgres rejects; keep the last name seen.
    let mut by_id = std::collections::BTreeMap::new();
    for c in categories {
        by_id.insert(c.id.as_str(), c.name.as_str());
    }
    let ids: Vec<&str> = by_id.keys().copied().collect();
    let names: Vec<&str> = by_id.values().copied().collect();

    let inserted: Vec<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO categories (id, name) \
         SELECT * FROM UNNEST($1::text[], $2::text[]) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name \
         RETURNING (xmax = 0) AS is_new",
    )
    .bind(&ids)
    .bind(&names)
    .fetch_all(pool)
    .await?;

    Ok(inserted.iter().filter(|&&is_new| is_new).count() as u64)
}

/// Stamps `last_scanned = NOW()` for a category selected for a scan pass.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no category has this id, or
/// [`DbError::Sqlx`] on query failure.
pub async fn observe_category_scanned(pool: &PgPool, category_id: &str) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE categories SET last_scanned = NOW() WHERE id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn get_category(pool: &PgPool, category_id: &str) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, first_seen, last_scanned FROM categories WHERE id = $1",
    )
    .bind(category_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
