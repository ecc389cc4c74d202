//! Geocode cache repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use foodcart_core::{Address, Coordinates};

use super::{GeoCacheStore, RepositoryError};
use crate::models::GeoCacheEntry;

/// `PostgreSQL` geocode cache.
#[derive(Debug, Clone)]
pub struct GeoCacheRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct GeoCacheRow {
    address: String,
    latitude: Decimal,
    longitude: Decimal,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GeoCacheRow> for GeoCacheEntry {
    type Error = RepositoryError;

    fn try_from(row: GeoCacheRow) -> Result<Self, Self::Error> {
        let address = Address::parse(&row.address).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid address in geocode cache: {e}"))
        })?;
        let coordinates = Coordinates::new(row.latitude, row.longitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coordinates in geocode cache: {e}"))
        })?;

        Ok(Self {
            address,
            coordinates,
            updated_at: row.updated_at,
        })
    }
}

impl GeoCacheRepository {
    /// Create a new geocode cache repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoCacheStore for GeoCacheRepository {
    async fn find(&self, address: &Address) -> Result<Option<GeoCacheEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, GeoCacheRow>(
            r"
            SELECT address, latitude, longitude, updated_at
            FROM foodcart.geocode_cache
            WHERE address = $1
            ",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(GeoCacheEntry::try_from).transpose()
    }

    async fn find_fresh(
        &self,
        address: &Address,
        not_before: DateTime<Utc>,
    ) -> Result<Option<GeoCacheEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, GeoCacheRow>(
            r"
            SELECT address, latitude, longitude, updated_at
            FROM foodcart.geocode_cache
            WHERE address = $1 AND updated_at >= $2
            ",
        )
        .bind(address.as_str())
        .bind(not_before)
        .fetch_optional(&self.pool)
        .await?;

        row.map(GeoCacheEntry::try_from).transpose()
    }

    async fn upsert(&self, entry: &GeoCacheEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO foodcart.geocode_cache (address, latitude, longitude, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (address) DO UPDATE
            SET latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(entry.address.as_str())
        .bind(entry.coordinates.latitude())
        .bind(entry.coordinates.longitude())
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
