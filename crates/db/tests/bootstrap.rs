use bench_db::repositories::VersionRepo;
use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    bench_db::health_check(&pool).await.unwrap();

    let tables = [
        "versions",
        "users",
        "gsim_credentials",
        "benches",
        "bench_cache",
        "bench_cache_version",
    ];

    for table in tables {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("{table} lookup failed: {e}"));
        assert!(exists.0, "{table} should exist after migrations");
    }
}

/// The initial migration seeds version 1.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_initial_version_is_seeded(pool: PgPool) {
    let latest = VersionRepo::latest(&pool)
        .await
        .unwrap()
        .expect("a version row");
    assert_eq!(latest.version, 1);
}

/// A recorded version becomes the latest one.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inserted_version_becomes_latest(pool: PgPool) {
    let inserted = VersionRepo::insert(&pool, 2).await.unwrap();
    assert_eq!(inserted.version, 2);

    let latest = VersionRepo::latest(&pool).await.unwrap().expect("a version row");
    assert_eq!(latest.version, 2);
    assert_eq!(latest.id, inserted.id);
}

/// Cache tables are UNLOGGED (relpersistence = 'u').
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cache_tables_are_unlogged(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT relname::TEXT, relpersistence::TEXT FROM pg_class \
         WHERE relname IN ('bench_cache', 'bench_cache_version')",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    for (name, persistence) in rows {
        assert_eq!(persistence, "u", "{name} should be UNLOGGED");
    }
}
