// Meta-commands end to end over an in-memory SQLite session

use sqlmeta::db::{drivers, DatabaseError, DriverRegistry};
use sqlmeta::metacmd::interrupt::InterruptScope;
use sqlmeta::metacmd::Handler;
use sqlmeta::session::SharedBuffer;
use sqlmeta::{dispatch, MetaError, Session};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

async fn session() -> (Session, SharedBuffer) {
    let registry = DriverRegistry::build(drivers::all()).unwrap();
    let mut session = Session::open(&registry, "sqlite::memory:").unwrap();
    let out = session.capture_output();
    let cancel = CancellationToken::new();
    for sql in [
        "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customers(id), total REAL)",
        "CREATE INDEX orders_customer ON orders (customer_id)",
        "CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100",
        "INSERT INTO customers (name, city) VALUES ('ann', 'oslo'), ('bob', 'oslo'), ('cy', NULL)",
        "INSERT INTO orders (customer_id, total) VALUES (1, 50.0), (1, 150.0), (2, 20.0)",
    ] {
        session.execute(sql, &cancel).await.unwrap();
    }
    (session, out)
}

async fn run(session: &mut Session, line: &str) -> Result<(), MetaError> {
    dispatch(session, line, &CancellationToken::new()).await
}

#[tokio::test]
async fn list_relations() {
    let (mut s, out) = session().await;
    run(&mut s, "\\d").await.unwrap();
    let text = out.contents();
    assert!(text.contains("List of relations"));
    for name in ["customers", "orders", "big_orders"] {
        assert!(text.contains(name), "{}", text);
    }

    out.clear();
    run(&mut s, "\\dv").await.unwrap();
    let text = out.contents();
    assert!(text.contains("big_orders"));
    assert!(!text.contains(" customers "));
    assert!(text.contains("(1 row)"));
}

#[tokio::test]
async fn list_with_pattern() {
    let (mut s, out) = session().await;
    run(&mut s, "\\dt cust*").await.unwrap();
    let text = out.contents();
    assert!(text.contains("customers"));
    assert!(!text.contains("orders"));

    out.clear();
    run(&mut s, "\\dt nothing_here").await.unwrap();
    assert_eq!(out.contents(), "Did not find any relation named \"nothing_here\".\n");
}

#[tokio::test]
async fn describe_table() {
    let (mut s, out) = session().await;
    run(&mut s, "\\d orders").await.unwrap();
    let text = out.contents();
    assert!(text.contains("\"orders\""), "{}", text);
    assert!(text.contains("customer_id"));
    assert!(text.contains("Indexes:"));
    assert!(text.contains("orders_customer"));
    assert!(text.contains("Foreign-key constraints:"));
    assert!(text.contains("REFERENCES customers(id)"));

    let err = run(&mut s, "\\d missing").await.unwrap_err();
    assert!(matches!(err, MetaError::Database(DatabaseError::NotFound(n)) if n == "missing"));
}

#[tokio::test]
async fn list_indexes_and_databases() {
    let (mut s, out) = session().await;
    run(&mut s, "\\di").await.unwrap();
    assert!(out.contents().contains("orders_customer"));

    out.clear();
    run(&mut s, "\\l").await.unwrap();
    let text = out.contents();
    assert!(text.contains("List of databases"));
    assert!(text.contains("main"));
}

#[tokio::test]
async fn functions_unsupported() {
    let (mut s, _out) = session().await;
    let err = run(&mut s, "\\df").await.unwrap_err();
    assert!(matches!(err, MetaError::Database(ref e) if e.is_unsupported()));
}

#[tokio::test]
async fn stats_for_table() {
    let (mut s, out) = session().await;
    run(&mut s, "\\ss customers").await.unwrap();
    let text = out.contents();
    assert!(text.contains("name"));
    assert!(text.contains("city"));
    assert!(!text.contains("Most common values"));

    out.clear();
    run(&mut s, "\\ss+ customers 2").await.unwrap();
    assert!(out.contents().contains("Most common values"));

    let err = run(&mut s, "\\ss customers many").await.unwrap_err();
    assert!(matches!(err, MetaError::InvalidNumber(v) if v == "many"));
}

#[tokio::test]
async fn transactions() {
    let (mut s, _out) = session().await;
    let err = run(&mut s, "\\commit").await.unwrap_err();
    assert!(matches!(err, MetaError::Database(DatabaseError::TransactionState(_))));

    run(&mut s, "\\begin").await.unwrap();
    assert!(s.in_transaction());
    s.execute("DELETE FROM orders", &CancellationToken::new()).await.unwrap();
    run(&mut s, "\\abort").await.unwrap();
    assert!(!s.in_transaction());

    let result = s
        .execute("SELECT COUNT(*) FROM orders", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.text(0, 0).as_deref(), Some("3"));

    run(&mut s, "\\begin -read-only").await.unwrap();
    assert!(s.execute("DELETE FROM orders", &CancellationToken::new()).await.is_err());
    run(&mut s, "\\rollback").await.unwrap();

    let err = run(&mut s, "\\begin bogus").await.unwrap_err();
    assert!(matches!(err, MetaError::InvalidIsolationLevel(_)));
    assert!(!s.in_transaction());
}

#[tokio::test]
async fn help_and_reset() {
    let (mut s, out) = session().await;
    run(&mut s, "\\?").await.unwrap();
    let text = out.contents();
    assert!(text.starts_with("Help\n"));
    assert!(text.contains("\\d[S+]"));
    assert!(text.contains("\\ss[+]"));

    s.push_line("SELECT");
    run(&mut s, "\\reset").await.unwrap();
    assert_eq!(s.buffer(), "");

    let err = run(&mut s, "\\nope").await.unwrap_err();
    assert!(matches!(err, MetaError::UnknownCommand(c) if c == "nope"));
}

#[tokio::test]
async fn cancelled_before_start() {
    let (mut s, _out) = session().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = dispatch(&mut s, "\\dt", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(s.url().is_some());
}

const ENDLESS: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c LIMIT 500000000) SELECT x FROM c";

fn cancel_after(ms: u64) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        trigger.cancel();
    });
    cancel
}

async fn assert_connection_free(s: &Session) {
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(2), s.execute("SELECT 1", &CancellationToken::new()))
        .await
        .expect("connection still busy after cancel")
        .unwrap();
    assert_eq!(result.text(0, 0).as_deref(), Some("1"));
    assert!(started.elapsed() < Duration::from_millis(500), "{:?}", started.elapsed());
}

#[tokio::test]
async fn stats_cancelled_mid_query() {
    let (mut s, out) = session().await;
    let cancel = cancel_after(100);
    let started = Instant::now();
    let err = dispatch(&mut s, &format!("\\ss '{}'", ENDLESS), &cancel).await.unwrap_err();
    assert!(err.is_cancelled(), "{}", err);
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    assert_eq!(out.contents(), "");
    assert_connection_free(&s).await;
}

#[tokio::test]
async fn statement_cancelled_mid_query() {
    let (s, _out) = session().await;
    let parent = cancel_after(100);
    let scope = InterruptScope::new(&parent);
    let token = scope.token();
    let stmt = format!("SELECT COUNT(*) FROM ({});", ENDLESS);
    let err = scope.run(s.execute(&stmt, &token)).await.unwrap_err();
    assert!(err.is_cancelled(), "{}", err);
    assert_connection_free(&s).await;
}
