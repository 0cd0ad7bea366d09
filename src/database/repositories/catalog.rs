//! Category and venue repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use crate::database::store::CatalogStore;
use crate::models::catalog::{Category, CreateCategoryRequest, Venue, CreateVenueRequest};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so a name is matched literally
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn find_category_matching(&self, fragment: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, active FROM categories WHERE name ILIKE $1 ORDER BY id ASC LIMIT 1"
        )
        .bind(like_pattern(fragment))
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create_category(&self, request: CreateCategoryRequest) -> Result<Category> {
        let inserted = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, active)
            VALUES ($1, $2, true)
            ON CONFLICT ((lower(name))) DO NOTHING
            RETURNING id, name, description, active
            "#
        )
        .bind(&request.name)
        .bind(&request.description)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(category) = inserted {
            return Ok(category);
        }

        let existing = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, active FROM categories WHERE lower(name) = lower($1)"
        )
        .bind(&request.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    async fn find_venue_matching(&self, fragment: &str) -> Result<Option<Venue>> {
        let venue = sqlx::query_as::<_, Venue>(
            "SELECT id, name, address, contact_phone FROM venues WHERE name ILIKE $1 ORDER BY id ASC LIMIT 1"
        )
        .bind(like_pattern(fragment))
        .fetch_optional(&self.pool)
        .await?;

        Ok(venue)
    }

    async fn create_venue(&self, request: CreateVenueRequest) -> Result<Venue> {
        let inserted = sqlx::query_as::<_, Venue>(
            r#"
            INSERT INTO venues (name, address, contact_phone)
            VALUES ($1, $2, $3)
            ON CONFLICT ((lower(name))) DO NOTHING
            RETURNING id, name, address, contact_phone
            "#
        )
        .bind(&request.name)
        .bind(&request.address)
        .bind(&request.contact_phone)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(venue) = inserted {
            return Ok(venue);
        }

        let existing = sqlx::query_as::<_, Venue>(
            "SELECT id, name, address, contact_phone FROM venues WHERE lower(name) = lower($1)"
        )
        .bind(&request.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("futbol"), "%futbol%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
