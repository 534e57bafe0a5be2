//! SQLite-backed customer and ticket store.
//!
//! Every public operation runs inside its own transaction and either commits
//! completely or leaves the database untouched. The connection sits behind a
//! `std::sync::Mutex`; callers on an async runtime should hop onto a blocking
//! thread (see [`LocalGateway`](crate::LocalGateway)).

use crate::error::{GatewayError, GatewayResult};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use concierge_core::{
    Customer, CustomerStatus, CustomerUpdate, Priority, Ticket, TicketStatus, ToolError,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, Transaction, params, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Default cap on `list_records` when the caller gives none
pub const DEFAULT_LIST_LIMIT: u32 = 100;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    phone       TEXT,
    status      TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'disabled')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    issue       TEXT NOT NULL,
    status      TEXT NOT NULL CHECK (status IN ('open', 'in_progress', 'resolved')),
    priority    TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tickets_customer ON tickets (customer_id, created_at);
"#;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, status, created_at, updated_at";
const TICKET_COLUMNS: &str = "id, customer_id, issue, status, priority, created_at";

/// Demo customers: (id, name, email, phone, status)
const SEED_CUSTOMERS: [(i64, &str, &str, &str, CustomerStatus); 6] = [
    (1, "Alice Premium", "alice@example.com", "111-111-1111", CustomerStatus::Active),
    (2, "Bob Standard", "bob@example.com", "222-222-2222", CustomerStatus::Active),
    (3, "Charlie Disabled", "charlie@example.com", "333-333-3333", CustomerStatus::Disabled),
    (4, "Diana Premium", "diana@example.com", "444-444-4444", CustomerStatus::Active),
    (5, "Eve Standard", "eve@example.com", "555-555-5555", CustomerStatus::Active),
    (12345, "Priya Patel (Premium)", "priya@example.com", "555-0999", CustomerStatus::Active),
];

/// Demo tickets: (customer_id, issue, status, priority)
const SEED_TICKETS: [(i64, &str, TicketStatus, Priority); 7] = [
    (1, "Billing duplicate charge", TicketStatus::Open, Priority::High),
    (1, "Unable to login", TicketStatus::InProgress, Priority::Medium),
    (2, "Request upgrade", TicketStatus::Open, Priority::Low),
    (4, "Critical outage", TicketStatus::Open, Priority::High),
    (5, "Password reset", TicketStatus::Open, Priority::Low),
    (12345, "Account upgrade assistance", TicketStatus::Open, Priority::Medium),
    (12345, "High priority refund review", TicketStatus::Open, Priority::High),
];

/// Summary of a seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub customers: usize,
    pub tickets: usize,
}

pub struct Store {
    conn: Mutex<Connection>,
    list_limit: u32,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

impl Store {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;\nPRAGMA synchronous = NORMAL;\nPRAGMA busy_timeout = 5000;",
        )?;
        info!(path = %path.display(), "Opened customer store");
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests and demos
    pub fn open_in_memory() -> GatewayResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> GatewayResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            list_limit: DEFAULT_LIST_LIMIT,
        })
    }

    #[must_use]
    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit;
        self
    }

    fn lock(&self) -> GatewayResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GatewayError::LockPoisoned)
    }

    /// Load the demo data set.
    ///
    /// Customers are inserted by fixed id and skipped when present; tickets are
    /// only inserted into an empty ticket table, so seeding twice is harmless.
    pub fn seed(&self) -> GatewayResult<SeedReport> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let base = seed_epoch();

        let mut customers = 0;
        for (offset, (id, name, email, phone, status)) in SEED_CUSTOMERS.iter().enumerate() {
            let created = timestamp(base + Duration::minutes(offset as i64));
            customers += tx.execute(
                "INSERT OR IGNORE INTO customers (id, name, email, phone, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, name, email, phone, status.as_str(), created],
            )?;
        }

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
        let mut tickets = 0;
        if existing == 0 {
            for (offset, (customer_id, issue, status, priority)) in SEED_TICKETS.iter().enumerate()
            {
                let created = timestamp(base + Duration::hours(1 + offset as i64));
                tickets += tx.execute(
                    "INSERT INTO tickets (customer_id, issue, status, priority, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![customer_id, issue, status.as_str(), priority.as_str(), created],
                )?;
            }
        }

        tx.commit()?;
        info!(customers, tickets, "Seeded customer store");
        Ok(SeedReport { customers, tickets })
    }

    // ========================================================================
    // Tool operations
    // ========================================================================

    pub fn fetch_record(&self, customer_id: i64) -> GatewayResult<Customer> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let customer = find_customer(&tx, customer_id)?
            .ok_or_else(|| ToolError::not_found(format!("customer {customer_id}")))?;
        tx.commit()?;
        Ok(customer)
    }

    /// Customers ordered by id, optionally filtered by status
    pub fn list_records(
        &self,
        status: Option<CustomerStatus>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Customer>> {
        let limit = limit.unwrap_or(self.list_limit);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let customers = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY id ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status.map(|s| s.as_str()), limit], customer_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;
        debug!(count = customers.len(), status = ?status, "Listed customers");
        Ok(customers)
    }

    /// Partial update; untouched fields keep their values, `updated_at` is refreshed
    pub fn update_record(&self, customer_id: i64, changes: &CustomerUpdate) -> GatewayResult<Customer> {
        validate_update(changes)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if find_customer(&tx, customer_id)?.is_none() {
            return Err(ToolError::not_found(format!("customer {customer_id}")).into());
        }

        let mut assignments = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(name) = &changes.name {
            assignments.push("name = ?");
            values.push(Box::new(name.trim().to_string()));
        }
        if let Some(email) = &changes.email {
            assignments.push("email = ?");
            values.push(Box::new(email.trim().to_string()));
        }
        if let Some(phone) = &changes.phone {
            assignments.push("phone = ?");
            values.push(Box::new(phone.trim().to_string()));
        }
        if let Some(status) = changes.status {
            assignments.push("status = ?");
            values.push(Box::new(status.as_str()));
        }
        assignments.push("updated_at = ?");
        values.push(Box::new(timestamp(Utc::now())));
        values.push(Box::new(customer_id));

        let sql = format!(
            "UPDATE customers SET {} WHERE id = ?",
            assignments.join(", ")
        );
        tx.execute(&sql, params_from_iter(values.iter()))?;

        let updated = find_customer(&tx, customer_id)?
            .ok_or_else(|| ToolError::internal(format!("customer {customer_id} vanished during update")))?;
        tx.commit()?;

        info!(customer_id, fields = ?changes.fields(), "Updated customer");
        Ok(updated)
    }

    /// New `open` ticket; the customer must exist or nothing is written
    pub fn create_ticket(
        &self,
        customer_id: i64,
        issue: &str,
        priority: Option<Priority>,
    ) -> GatewayResult<Ticket> {
        let issue = issue.trim();
        if issue.is_empty() {
            return Err(ToolError::validation("issue must not be empty").into());
        }
        let priority = priority.unwrap_or_default();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if find_customer(&tx, customer_id)?.is_none() {
            return Err(ToolError::not_found(format!("customer {customer_id}")).into());
        }

        tx.execute(
            "INSERT INTO tickets (customer_id, issue, status, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                customer_id,
                issue,
                TicketStatus::Open.as_str(),
                priority.as_str(),
                timestamp(Utc::now())
            ],
        )?;
        let ticket_id = tx.last_insert_rowid();
        let ticket = tx.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
            params![ticket_id],
            ticket_from_row,
        )?;
        tx.commit()?;

        info!(ticket_id, customer_id, priority = %priority, "Created ticket");
        Ok(ticket)
    }

    /// Tickets of one customer, oldest first
    pub fn fetch_history(&self, customer_id: i64) -> GatewayResult<Vec<Ticket>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let tickets = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets
                 WHERE customer_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![customer_id], ticket_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        tx.commit()?;
        Ok(tickets)
    }

    /// Number of tickets stored for a customer
    pub fn ticket_count(&self, customer_id: i64) -> GatewayResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_update(changes: &CustomerUpdate) -> GatewayResult<()> {
    if changes.is_empty() {
        return Err(ToolError::validation("no valid fields to update").into());
    }
    if changes.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ToolError::validation("name must not be empty").into());
    }
    if let Some(email) = &changes.email {
        let email = email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
            && !email.contains(char::is_whitespace);
        if !well_formed {
            return Err(ToolError::validation(format!("invalid email address '{email}'")).into());
        }
    }
    if changes.phone.as_deref().is_some_and(|phone| phone.trim().is_empty()) {
        return Err(ToolError::validation("phone must not be empty").into());
    }
    Ok(())
}

fn find_customer(tx: &Transaction<'_>, customer_id: i64) -> GatewayResult<Option<Customer>> {
    let customer = tx
        .query_row(
            &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
            params![customer_id],
            customer_from_row,
        )
        .optional()?;
    Ok(customer)
}

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        status: parse_column(row, 4)?,
        created_at: time_column(row, 5)?,
        updated_at: time_column(row, 6)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        issue: row.get(2)?,
        status: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        created_at: time_column(row, 5)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Fixed-width RFC 3339 so lexical order equals chronological order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn seed_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
