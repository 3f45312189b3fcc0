//! The `businesses` table: append, full scan, clear, and atomic replace.
//!
//! `address_color` is not stored; it is derived from `address_type` on read.

use bizdb_core::{AddressType, Business, GeoPoint};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::DbError;

/// A row from the `businesses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub address_type: String,
    pub phone: String,
    pub rating: f64,
    pub review_count: i64,
    pub website: String,
    pub business_category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: String,
    pub external_id: String,
    /// JSON array text.
    pub categories: String,
    pub created_at: DateTime<Utc>,
}

impl BusinessRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] when a stored column cannot be mapped
    /// back onto the canonical record.
    pub fn into_business(self) -> Result<Business, DbError> {
        let invalid = |reason: String| DbError::InvalidRow {
            id: self.id,
            reason,
        };
        let address_type = self
            .address_type
            .parse::<AddressType>()
            .map_err(invalid)?;
        let review_count = u32::try_from(self.review_count)
            .map_err(|_| invalid(format!("review_count {} out of range", self.review_count)))?;
        let categories: Vec<String> = serde_json::from_str(&self.categories)
            .map_err(|e| invalid(format!("categories: {e}")))?;

        Ok(Business {
            name: self.name,
            address: self.address,
            address_type,
            phone: self.phone,
            rating: self.rating,
            review_count,
            website: self.website,
            business_category: self.business_category,
            location: GeoPoint::new(self.latitude, self.longitude),
            source: self.source,
            external_id: self.external_id,
            categories,
            created_at: Some(self.created_at),
        })
    }
}

async fn insert_business(
    tx: &mut Transaction<'_, Sqlite>,
    business: &Business,
    created_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let categories = serde_json::to_string(&business.categories).map_err(|e| {
        DbError::InvalidRow {
            id: 0,
            reason: format!("categories: {e}"),
        }
    })?;

    sqlx::query(
        "INSERT INTO businesses \
             (name, address, address_type, phone, rating, review_count, website, \
              business_category, latitude, longitude, source, external_id, categories, \
              created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&business.name)
    .bind(&business.address)
    .bind(business.address_type.as_str())
    .bind(&business.phone)
    .bind(business.rating)
    .bind(i64::from(business.review_count))
    .bind(&business.website)
    .bind(&business.business_category)
    .bind(business.location.lat)
    .bind(business.location.lng)
    .bind(&business.source)
    .bind(&business.external_id)
    .bind(categories)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Inserts every record it can inside `tx`; a record the database rejects is
/// logged and skipped.
async fn insert_all(tx: &mut Transaction<'_, Sqlite>, businesses: &[Business]) -> u64 {
    let created_at = Utc::now();
    let mut saved = 0u64;
    for (index, business) in businesses.iter().enumerate() {
        match insert_business(tx, business, created_at).await {
            Ok(()) => saved += 1,
            Err(e) => {
                tracing::warn!(
                    index,
                    name = %business.name,
                    error = %e,
                    "skipping business the store rejected"
                );
            }
        }
    }
    saved
}

/// Appends `businesses` in one transaction and returns how many were stored.
///
/// All `created_at` values in the batch are the same instant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the transaction cannot be opened or committed.
/// Individual rejected records do not fail the call.
pub async fn save_businesses(pool: &SqlitePool, businesses: &[Business]) -> Result<u64, DbError> {
    if businesses.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let saved = insert_all(&mut tx, businesses).await;
    tx.commit().await?;
    Ok(saved)
}

/// Deletes every stored business and inserts `businesses`, atomically.
///
/// Readers see either the old dataset or the new one. An empty slice leaves
/// the table empty.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails or the transaction cannot be
/// committed; the previous dataset is then left untouched.
pub async fn replace_businesses(
    pool: &SqlitePool,
    businesses: &[Business],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let removed = sqlx::query("DELETE FROM businesses")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let saved = insert_all(&mut tx, businesses).await;
    tx.commit().await?;
    tracing::info!(removed, saved, "replaced stored businesses");
    Ok(saved)
}

/// Returns every stored business in insertion order.
///
/// Rows that can no longer be mapped to a [`Business`] are logged and skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_all_businesses(pool: &SqlitePool) -> Result<Vec<Business>, DbError> {
    let rows = sqlx::query_as::<_, BusinessRow>(
        "SELECT id, name, address, address_type, phone, rating, review_count, website, \
                business_category, latitude, longitude, source, external_id, categories, \
                created_at \
         FROM businesses \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let mut businesses = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_business() {
            Ok(b) => businesses.push(b),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable business row"),
        }
    }
    Ok(businesses)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_businesses(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Deletes every stored business and returns how many were removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_businesses(pool: &SqlitePool) -> Result<u64, DbError> {
    let removed = sqlx::query("DELETE FROM businesses")
        .execute(pool)
        .await?
        .rows_affected();
    Ok(removed)
}
