/// Integration tests for the PostgreSQL rain store
///
/// Tests verify:
/// 1. The grouping query buckets by local day and weekday (Sunday = 0)
/// 2. Daytime-only runs zero night measurements but keep the day
/// 3. SQL grouping and in-memory grouping agree on the same measurements
///
/// Prerequisites:
/// - PostgreSQL reachable through DATABASE_URL (a .env file is honoured)
/// - Permission to create and drop tables
///
/// Run with: cargo test --test postgres_rain_store -- --ignored --test-threads=1

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Europe::Brussels;
use postgres::{Client, NoTls};

use sunrain_service::config;
use sunrain_service::model::{BucketRow, DayWindow, DaytimeHours, RainMeasurement};
use sunrain_service::store::{MeasurementFile, PostgresRainStore, RainSource};

const TEST_TABLE: &str = "rain_store_test";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn connect() -> Client {
    let url = config::database_url().expect("DATABASE_URL must be set");
    Client::connect(&url, NoTls).expect("Failed to connect to test database")
}

fn measurements() -> Vec<RainMeasurement> {
    let at = |y, m, d, h, min, value_mm| RainMeasurement {
        timestamp: Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap(),
        value_mm,
    };
    vec![
        at(2020, 1, 4, 10, 0, 0.5),   // Sat 11:00 local
        at(2020, 1, 5, 5, 30, 0.4),   // Sun 06:30 local
        at(2020, 1, 6, 12, 0, 0.1),   // Mon 13:00 local
        at(2020, 1, 6, 22, 30, 0.05), // Mon 23:30 local
        at(2021, 6, 15, 10, 0, 2.0),  // Tue 12:00 local
    ]
}

fn setup_table(client: &mut Client) {
    client
        .batch_execute(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (\"timestamp\" timestamptz NOT NULL, value double precision);",
            table = TEST_TABLE
        ))
        .expect("Failed to create test table");

    let insert = format!("INSERT INTO {} (\"timestamp\", value) VALUES ($1, $2)", TEST_TABLE);
    for m in measurements() {
        let timestamp: DateTime<Utc> = m.timestamp;
        client
            .execute(&insert, &[&timestamp, &m.value_mm])
            .expect("Failed to insert measurement");
    }
}

fn teardown_table(client: &mut Client) {
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {}", TEST_TABLE))
        .expect("Failed to drop test table");
}

fn bucket(key: &str, rained: bool, number_of_days: i64) -> BucketRow {
    BucketRow {
        year_weekday: key.to_string(),
        rained,
        number_of_days,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore] // requires PostgreSQL
fn test_postgres_buckets_both_windows() {
    let mut client = connect();
    setup_table(&mut client);

    let mut store = PostgresRainStore::with_client(connect(), TEST_TABLE, Brussels);
    let hours = DaytimeHours::default();

    let whole = store.day_buckets(DayWindow::WholeDay, hours, 0.1).unwrap();
    let daytime = store.day_buckets(DayWindow::Daytime, hours, 0.1).unwrap();
    teardown_table(&mut client);

    assert_eq!(
        whole,
        vec![
            bucket("2020-0", true, 1),
            bucket("2020-1", true, 1),
            bucket("2020-6", true, 1),
            bucket("2021-2", true, 1),
        ]
    );
    assert_eq!(
        daytime,
        vec![
            bucket("2020-0", false, 1),
            bucket("2020-1", false, 1),
            bucket("2020-6", true, 1),
            bucket("2021-2", true, 1),
        ]
    );
}

#[test]
#[ignore] // requires PostgreSQL
fn test_postgres_matches_in_memory_grouping() {
    let mut client = connect();
    setup_table(&mut client);

    let mut store = PostgresRainStore::with_client(connect(), TEST_TABLE, Brussels);
    let mut file = MeasurementFile::from_measurements(measurements(), Brussels);
    let hours = DaytimeHours::default();

    for window in DayWindow::ALL {
        let mut from_sql = store.day_buckets(window, hours, 0.1).unwrap();
        let mut from_memory = file.day_buckets(window, hours, 0.1).unwrap();
        from_sql.sort();
        from_memory.sort();
        assert_eq!(from_sql, from_memory, "{} buckets differ", window);
    }

    teardown_table(&mut client);
}
