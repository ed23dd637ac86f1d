use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Holds every taken signup identifier: usernames and emails alike.
static SIGNUP_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(
        FILTER_CAPACITY,
        FALSE_POSITIVE_RATE,
    ))
});

#[inline]
fn normalize(value: &str) -> String {
    value.to_lowercase()
}

/// Check if an identifier might be taken (false positives possible)
pub fn might_exist(value: &str) -> bool {
    let value = normalize(value);
    SIGNUP_FILTER
        .read()
        .expect("signup filter poisoned")
        .contains(&value)
}

/// Insert a single identifier into the filter
pub fn insert(value: &str) {
    let value = normalize(value);
    SIGNUP_FILTER
        .write()
        .expect("signup filter poisoned")
        .add(&value);
}

/// Warm up the signup filter using streaming + batching
pub async fn warmup_signup_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String, String)>("SELECT username, email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username, email) =
            row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&username));
        batch.push(normalize(&email));
        total += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Signup filter warmup complete: {} users", total);
    Ok(())
}

/// Insert a batch of normalized identifiers
fn insert_batch(values: &[String]) {
    let mut filter = SIGNUP_FILTER
        .write()
        .expect("signup filter poisoned");

    for value in values {
        filter.add(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_identifier_does_not_exist() {
        assert!(!might_exist("filter-test-never-inserted@example.com"));
    }

    #[test]
    fn inserted_identifier_might_exist_case_insensitively() {
        insert("Filter-Test-User");
        assert!(might_exist("filter-test-user"));
        assert!(might_exist("FILTER-TEST-USER"));
    }
}
