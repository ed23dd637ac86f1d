use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// true  => identifier is TAKEN
/// false => identifier is AVAILABLE (usually we store only taken)
pub static SIGNUP_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single identifier (username or email) as taken
pub async fn mark_taken(value: &str) {
    SIGNUP_CACHE.insert(value.to_lowercase(), true).await;
}

/// Check if an identifier is taken
pub async fn is_taken(value: &str) -> bool {
    SIGNUP_CACHE
        .get(&value.to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark identifiers as taken
async fn batch_mark(values: &[String]) {
    let futures: Vec<_> = values
        .iter()
        .map(|v| SIGNUP_CACHE.insert(v.to_lowercase(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load only RECENTLY registered identifiers into the in-memory cache (batched)
pub async fn warmup_signup_cache(
    pool: &MySqlPool,
    days: u32,
    batch_size: usize,
) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT username, email
        FROM users
        WHERE created_at >= NOW() - INTERVAL ? DAY
        ORDER BY created_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (username, email) = row?;
        batch.push(username);
        batch.push(email);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining identifiers
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "Signup cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_identifier_is_taken() {
        mark_taken("Cache-Test-User").await;
        assert!(is_taken("cache-test-user").await);
    }

    #[actix_web::test]
    async fn unknown_identifier_is_not_taken() {
        assert!(!is_taken("cache-test-never-marked").await);
    }
}
