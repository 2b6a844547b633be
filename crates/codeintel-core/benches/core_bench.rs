//! Criterion benchmarks for codeintel-core.
//!
//! ## Benchmark groups
//!
//! 1. **schema**: DDL init + migration overhead.
//! 2. **guards**: Limit clamping and query truncation.
//! 3. **cursor**: Opaque cursor encode/decode.
//! 4. **closest**: Ancestor walk and candidate ranking.
//! 5. **usage**: Usage ranking sort.
//! 6. **store**: Upload paging and nearest-dump lookup against SQLite.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/codeintel-core/Cargo.toml
//! # Run only the cursor group:
//! cargo bench --manifest-path crates/codeintel-core/Cargo.toml -- cursor
//! ```

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use rusqlite::Connection;
use tempfile::TempDir;

use codeintel_core::config::Config;
use codeintel_core::models::{Dump, NewUpload, RepoUsageStatistics, UploadFilter, UploadState};
use codeintel_core::query::closest::{ancestor_distances, find_closest_dumps, rank_candidates};
use codeintel_core::query::cursor::{decode_cursor, encode_cursor, CursorState};
use codeintel_core::query::guards::{clamp_limit, truncate_query, MAX_UPLOAD_PAGE_SIZE};
use codeintel_core::query::uploads::list_uploads;
use codeintel_core::query::usage::rank_usage;
use codeintel_core::store::database::Database;
use codeintel_core::store::schema::{migrate_schema, SCHEMA_STATEMENTS};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt).unwrap();
    }
    migrate_schema(&conn).unwrap();
    conn
}

/// Linear history `c0 <- c1 <- ... <- c{n-1}` with a merge parent every 7th
/// commit so the walk is not purely a chain.
fn linear_graph(n: usize) -> HashMap<(i64, String), Vec<String>> {
    let mut graph = HashMap::new();
    for i in 1..n {
        let mut parents = vec![format!("c{}", i - 1)];
        if i % 7 == 0 && i >= 3 {
            parents.push(format!("c{}", i - 3));
        }
        graph.insert((1, format!("c{i}")), parents);
    }
    graph
}

fn synthetic_dump(id: i64, commit: String, root: &str) -> Dump {
    Dump {
        id,
        repository_id: 1,
        commit,
        root: root.to_string(),
        indexer: "lsif-go".to_string(),
        is_latest_for_repo: id % 11 == 0,
        uploaded_at: String::new(),
        state: UploadState::Completed,
        failure_summary: None,
    }
}

/// Temp database with `n` completed uploads spread over a linear history and
/// three roots.
fn populated_database(n: usize) -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        db_path: dir.path().join("bench.db"),
        ..Config::default()
    };
    let db = Database::open(&config).unwrap();
    for i in 1..n {
        let parent = format!("c{}", i - 1);
        db.insert_commit_parents(1, &format!("c{i}"), &[parent.as_str()])
            .unwrap();
    }
    let roots = ["", "web", "cmd/server"];
    for i in 0..n {
        let upload = NewUpload::completed(1, &format!("c{}", i / 2), roots[i % roots.len()]);
        db.insert_upload(&upload).unwrap();
    }
    (dir, db)
}

// ---------------------------------------------------------------------------
// Benchmark: Schema initialization & migration
// ---------------------------------------------------------------------------

fn bench_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema");

    group.bench_function("init_and_migrate", |b| {
        b.iter(|| black_box(setup_conn()));
    });

    group.bench_function("migration_noop_on_current", |b| {
        let conn = setup_conn();
        b.iter(|| migrate_schema(black_box(&conn)).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Guards
// ---------------------------------------------------------------------------

fn bench_guards(c: &mut Criterion) {
    let mut group = c.benchmark_group("guards");

    group.bench_function("clamp_limit", |b| {
        b.iter(|| clamp_limit(black_box(5_000), black_box(MAX_UPLOAD_PAGE_SIZE)));
    });

    let long = "lsif-go ".repeat(100);
    group.bench_function("truncate_query_long", |b| {
        b.iter(|| truncate_query(black_box(&long)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Cursor codec
// ---------------------------------------------------------------------------

fn bench_cursor(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor");

    let state = CursorState::new(
        UploadFilter {
            repository_id: Some(50),
            query: Some("lsif-tsc".into()),
            state: Some(UploadState::Completed),
            is_latest_for_repo: Some(true),
        },
        123_456,
    );
    let token = encode_cursor(&state).unwrap();

    group.bench_function("encode", |b| {
        b.iter(|| encode_cursor(black_box(&state)).unwrap());
    });
    group.bench_function("decode", |b| {
        b.iter(|| decode_cursor(black_box(&token)).unwrap());
    });
    group.bench_function("decode_rejects_garbage", |b| {
        b.iter(|| decode_cursor(black_box("not-a-cursor")).is_err());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Ancestor walk and ranking
// ---------------------------------------------------------------------------

fn bench_closest(c: &mut Criterion) {
    let mut group = c.benchmark_group("closest");

    for size in [100usize, 1_000, 5_000] {
        let graph = linear_graph(size);
        let tip = format!("c{}", size - 1);
        group.bench_with_input(BenchmarkId::new("ancestor_distances", size), &size, |b, _| {
            b.iter(|| ancestor_distances(&graph, 1, black_box(&tip), 500).unwrap());
        });
    }

    let graph = linear_graph(1_000);
    let distances: IndexMap<String, u32> = ancestor_distances(&graph, 1, "c999", 500).unwrap();
    let roots = ["", "web/", "cmd/server/"];
    let candidates: Vec<Dump> = (0..2_000)
        .map(|i| synthetic_dump(i as i64, format!("c{}", 999 - (i / 4)), roots[i % roots.len()]))
        .collect();
    group.bench_function("rank_candidates_dedupe", |b| {
        b.iter(|| rank_candidates(black_box(candidates.clone()), &distances, true));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Usage ranking
// ---------------------------------------------------------------------------

fn bench_usage(c: &mut Criterion) {
    let mut group = c.benchmark_group("usage");

    for size in [100usize, 10_000] {
        let stats: Vec<RepoUsageStatistics> = (0..size)
            .map(|i| RepoUsageStatistics {
                repository_id: i as i64,
                search_count: ((i * 7919) % 97) as i64,
                precise_count: ((i * 104_729) % 13) as i64,
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("rank_usage", size), &stats, |b, stats| {
            b.iter(|| {
                let mut stats = stats.clone();
                rank_usage(&mut stats);
                black_box(stats)
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Store-backed queries
// ---------------------------------------------------------------------------

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let (_dir, db) = populated_database(600);
    let config = Config {
        db_path: db.db_path().to_path_buf(),
        ..Config::default()
    };

    group.bench_function("list_uploads_first_page", |b| {
        b.iter(|| list_uploads(&db, &config, &UploadFilter::default(), Some(50), None).unwrap());
    });

    let second = list_uploads(&db, &config, &UploadFilter::default(), Some(50), None)
        .unwrap()
        .next_cursor
        .unwrap();
    group.bench_function("list_uploads_from_cursor", |b| {
        b.iter(|| list_uploads(&db, &config, &UploadFilter::default(), Some(50), Some(black_box(&second))).unwrap());
    });

    let graph = db.commit_graph().unwrap();
    group.bench_function("find_closest_dumps", |b| {
        b.iter(|| find_closest_dumps(&db, &graph, &config, 1, black_box("c299"), "web/src/app.ts").unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_schema,
    bench_guards,
    bench_cursor,
    bench_closest,
    bench_usage,
    bench_store,
);
criterion_main!(benches);
