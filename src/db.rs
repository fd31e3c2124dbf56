use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub async fn init_db(database_url: &str) -> SqlitePool {
    let options = SqliteConnectOptions::from_str(database_url)
        .expect("Invalid DATABASE_URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to connect to database");

    create_schema(&pool)
        .await
        .expect("Failed to create database schema");

    pool
}

/// In-memory database with the full schema. Capped at one connection so
/// every statement sees the same memory store.
pub async fn init_memory_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    create_schema(&pool)
        .await
        .expect("Failed to create database schema");

    pool
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

// Timestamp columns are TEXT and always bound from chrono values; `periods`
// and `active_attendance` are JSON so the marker + ledger pair stays one
// aggregate per row.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                      TEXT PRIMARY KEY,
        company_id              TEXT NOT NULL,
        full_name               TEXT NOT NULL,
        email                   TEXT,
        role                    TEXT NOT NULL DEFAULT 'employee',
        direct_manager_id       TEXT,
        join_date               TEXT,
        vacation_days_per_month REAL NOT NULL DEFAULT 0,
        vacation_balance        REAL NOT NULL DEFAULT 0,
        last_accrual_date       TEXT,
        active_attendance       TEXT,
        created_at              TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id          TEXT PRIMARY KEY,
        company_id  TEXT NOT NULL,
        user_id     TEXT NOT NULL,
        date_key    TEXT NOT NULL,
        periods     TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        expires_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_attendance_user_company
        ON attendance (user_id, company_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vacation_requests (
        id              TEXT PRIMARY KEY,
        employee_id     TEXT NOT NULL,
        manager_id      TEXT,
        start_date      TEXT NOT NULL,
        end_date        TEXT NOT NULL,
        reason          TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'PENDING',
        days_requested  INTEGER NOT NULL,
        created_at      TEXT NOT NULL,
        decision_at     TEXT,
        manager_comment TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_vacation_manager_status
        ON vacation_requests (manager_id, status)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_vacation_employee
        ON vacation_requests (employee_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL,
        kind        TEXT NOT NULL,
        title       TEXT NOT NULL,
        body        TEXT NOT NULL,
        data        TEXT NOT NULL,
        read        INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payslips (
        employee_id TEXT NOT NULL,
        period_key  TEXT NOT NULL,
        company_id  TEXT NOT NULL,
        year        INTEGER NOT NULL,
        month       INTEGER NOT NULL,
        file_name   TEXT NOT NULL,
        payload     TEXT NOT NULL,
        uploaded_by TEXT NOT NULL,
        uploaded_at TEXT NOT NULL,
        PRIMARY KEY (employee_id, period_key)
    )
    "#,
];
