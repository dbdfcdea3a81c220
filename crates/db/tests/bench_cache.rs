//! Integration tests for the UNLOGGED bench cache tables.

use bench_db::repositories::BenchCacheRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_cache_has_no_version(pool: PgPool) {
    assert_eq!(BenchCacheRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(BenchCacheRepo::version(&pool).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_all_writes_records_and_version(pool: PgPool) {
    let record = json!({"owner": null, "line": []});
    BenchCacheRepo::replace_all(&pool, &[1, 2, 3], 7, &record)
        .await
        .unwrap();

    assert_eq!(BenchCacheRepo::count(&pool).await.unwrap(), 3);
    assert_eq!(BenchCacheRepo::version(&pool).await.unwrap(), Some(7));

    // A second rebuild discards stale rows.
    BenchCacheRepo::replace_all(&pool, &[2], 8, &record)
        .await
        .unwrap();
    let all = BenchCacheRepo::load_all(&pool).await.unwrap();
    assert_eq!(all, vec![(2, record)]);
    assert_eq!(BenchCacheRepo::version(&pool).await.unwrap(), Some(8));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_is_shallow_and_right_biased(pool: PgPool) {
    BenchCacheRepo::upsert(&pool, 5, &json!({"owner": 1, "pending": false, "line": [2, 3]}))
        .await
        .unwrap();

    let merged = BenchCacheRepo::merge(&pool, 5, &json!({"owner": null, "line": [3]}))
        .await
        .unwrap()
        .expect("record exists");

    assert_eq!(merged, json!({"owner": null, "pending": false, "line": [3]}));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn merge_without_record_creates_nothing(pool: PgPool) {
    let merged = BenchCacheRepo::merge(&pool, 99, &json!({"owner": 1}))
        .await
        .unwrap();

    assert!(merged.is_none());
    assert!(BenchCacheRepo::get(&pool, 99).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_removes_records_and_version(pool: PgPool) {
    BenchCacheRepo::replace_all(&pool, &[1], 1, &json!({}))
        .await
        .unwrap();
    assert!(BenchCacheRepo::delete(&pool, 1).await.unwrap());
    assert!(!BenchCacheRepo::delete(&pool, 1).await.unwrap());

    BenchCacheRepo::upsert(&pool, 2, &json!({})).await.unwrap();
    BenchCacheRepo::clear(&pool).await.unwrap();

    assert_eq!(BenchCacheRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(BenchCacheRepo::version(&pool).await.unwrap(), None);
}
