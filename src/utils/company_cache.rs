use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;
use std::time::Duration;

/// companyId -> display name. Company names change rarely; an hour of
/// staleness is acceptable for the profile header.
pub static COMPANY_NAME_CACHE: Lazy<Cache<String, String>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(3600))
        .build()
});

pub async fn company_name(pool: &SqlitePool, company_id: &str) -> Option<String> {
    if company_id.trim().is_empty() {
        return None;
    }

    if let Some(name) = COMPANY_NAME_CACHE.get(company_id).await {
        return Some(name);
    }

    let name: Option<String> = match sqlx::query_scalar("SELECT name FROM companies WHERE id = ?")
        .bind(company_id)
        .fetch_optional(pool)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, company_id = %company_id, "Company lookup failed");
            None
        }
    };

    if let Some(ref n) = name {
        COMPANY_NAME_CACHE
            .insert(company_id.to_string(), n.clone())
            .await;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;
    use chrono::Utc;

    #[tokio::test]
    async fn lookup_hits_the_cache_after_first_fetch() {
        let pool = init_memory_db().await;
        sqlx::query("INSERT INTO companies (id, name, created_at) VALUES ('acme-test', 'Acme', ?)")
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(company_name(&pool, "acme-test").await.as_deref(), Some("Acme"));

        // row gone, cached name still served
        sqlx::query("DELETE FROM companies WHERE id = 'acme-test'")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(company_name(&pool, "acme-test").await.as_deref(), Some("Acme"));

        assert!(company_name(&pool, "").await.is_none());
    }
}
