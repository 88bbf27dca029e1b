mod common;

use common::{date, registry};
use forecast_serve::store::{ConnectionPool, CsvStore, SourceQuery, SqliteStore};
use forecast_serve::{DataAssembler, ErrorKind, HistoricalStore, StoreConfig};
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn create_sqlite(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales_daily (category TEXT, timestamp TEXT, units REAL);
         CREATE TABLE weather (timestamp TEXT, temp_c REAL);
         CREATE TABLE price_index (timestamp TEXT, cpi REAL);",
    )
    .unwrap();
    for day in 2..=8 {
        let ts = format!("2024-01-{:02}", day);
        conn.execute(
            "INSERT INTO sales_daily VALUES ('ELEC', ?1, 5.0)",
            [&ts],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO sales_daily VALUES ('GARD', ?1, 1.0)",
            [&ts],
        )
        .unwrap();
        conn.execute("INSERT INTO weather VALUES (?1, 12.0)", [&ts]).unwrap();
    }
    conn.execute("INSERT INTO sales_daily VALUES ('ELEC', '2024-01-09 00:00:00', NULL)", [])
        .unwrap();
    conn.execute("INSERT INTO price_index VALUES ('2024-01-01', 101.0)", [])
        .unwrap();
}

#[test]
fn test_sqlite_fetch_filters_item_and_dates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    create_sqlite(&path);

    let store = SqliteStore::new(ConnectionPool::open(&path, 2).unwrap());
    let config = registry().lookup("electronics").unwrap().clone();

    let all = store.fetch(&SourceQuery::sales(&config).unwrap()).unwrap();
    assert_eq!(all.len(), 8);
    assert_eq!(all[0].date, date("2024-01-02"));
    assert_eq!(all[0].values, vec![Some(5.0)]);
    assert_eq!(all[7].date, date("2024-01-09"));
    assert_eq!(all[7].values, vec![None]);

    let window = store
        .fetch(&SourceQuery::sales(&config).unwrap().between(date("2024-01-04"), date("2024-01-05")))
        .unwrap();
    assert_eq!(window.len(), 2);
}

#[test]
fn test_sqlite_feeds_assembler() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    create_sqlite(&path);

    let store: Arc<dyn HistoricalStore> =
        Arc::new(SqliteStore::new(ConnectionPool::open(&path, 2).unwrap()));
    let registry = Arc::new(registry());
    let assembler = DataAssembler::new(store, registry.clone());

    let frame = assembler.assemble(registry.lookup("electronics").unwrap()).unwrap();
    assert_eq!(frame.column("units").unwrap(), &[35.0, 0.0]);

    let mut garden = registry.lookup("garden").unwrap().clone();
    garden.features = None;
    let frame = assembler.assemble(&garden).unwrap();
    assert_eq!(frame.column("temperature").unwrap(), &[12.0]);
    assert_eq!(frame.column("cpi").unwrap(), &[101.0]);
}

#[test]
fn test_sqlite_pool_shared_across_threads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    create_sqlite(&path);

    let store = SqliteStore::new(ConnectionPool::open(&path, 2).unwrap());
    let config = registry().lookup("garden").unwrap().clone();
    let query = SourceQuery::sales(&config).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..10 {
                    assert_eq!(store.fetch(&query).unwrap().len(), 7);
                }
            });
        }
    });
    assert!(store.pool().idle_count() <= 2);
    assert!(store.pool().idle_count() >= 1);
}

#[test]
fn test_pool_size_caps_idle_not_open_connections() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.db");
    create_sqlite(&path);
    let pool = ConnectionPool::open(&path, 1).unwrap();

    // a second connection is opened while the first is checked out
    let nested = pool
        .with_connection(|_| pool.with_connection(|conn| Ok(conn.is_autocommit())))
        .unwrap();
    assert!(nested);
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_sqlite_errors() {
    let dir = tempdir().unwrap();
    assert!(ConnectionPool::open(dir.path().join("missing.db"), 1).is_err());

    let path = dir.path().join("empty.db");
    Connection::open(&path).unwrap();
    let store = SqliteStore::new(ConnectionPool::open(&path, 1).unwrap());
    let config = registry().lookup("electronics").unwrap().clone();
    let err = store.fetch(&SourceQuery::sales(&config).unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn test_csv_store() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("sales_daily.csv"),
        "category,timestamp,units\n\
         ELEC,2024-01-02,5\n\
         GARD,2024-01-02,1\n\
         ELEC,20240103,5\n\
         ELEC,2024-01-04,\n\
         ELEC,2024-01-10,7\n",
    )
    .unwrap();

    let store = CsvStore::new(dir.path()).unwrap();
    let config = registry().lookup("electronics").unwrap().clone();
    let records = store.fetch(&SourceQuery::sales(&config).unwrap()).unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[1].date, date("2024-01-03"));
    assert_eq!(records[2].values, vec![None]);

    let assembler = DataAssembler::new(Arc::new(store), Arc::new(registry()));
    let frame = assembler.assemble(&config).unwrap();
    assert_eq!(frame.timestamps(), &[date("2024-01-08"), date("2024-01-15")]);
    assert_eq!(frame.column("units").unwrap(), &[10.0, 7.0]);

    let missing_table = CsvStore::new(dir.path())
        .unwrap()
        .fetch(&SourceQuery::covariate(registry().covariate("cpi").unwrap()).unwrap());
    assert!(missing_table.is_err());
}

#[test]
fn test_store_config_opens_backends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.db");
    create_sqlite(&path);

    let sqlite: StoreConfig = format!("sqlite:{}", path.display()).parse().unwrap();
    assert!(sqlite.open(2).is_ok());

    let csv: StoreConfig = format!("csv:{}", dir.path().display()).parse().unwrap();
    assert!(csv.open(2).is_ok());

    let missing: StoreConfig = "csv:/no/such/dir".parse().unwrap();
    assert_eq!(missing.open(1).unwrap_err().kind(), ErrorKind::Configuration);
}
