//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    Classification, CreateTicketRequest, Ticket, TicketAction, TicketError, TicketFilter,
    TicketOrder, TicketStatus, TicketStore, TransitionFn,
};

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const TICKET_COLUMNS: &str = "id, requester, line, machine, machine_type, machine_id, problem, \
     description, status, created_at, closed_at, busy_started_at, hold_started_at, busy_seconds, \
     hold_seconds, current_actor, last_action, hold_reason, solution, done_by, cancel_reason, \
     canceled_by, updated_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        let _journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| TicketError::Database(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                requester TEXT NOT NULL,
                line TEXT NOT NULL,
                machine TEXT,
                machine_type TEXT,
                machine_id TEXT,
                problem TEXT,
                description TEXT,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                closed_at TEXT,
                busy_started_at TEXT,
                hold_started_at TEXT,
                busy_seconds INTEGER NOT NULL DEFAULT 0,
                hold_seconds INTEGER NOT NULL DEFAULT 0,
                current_actor TEXT,
                last_action TEXT,
                hold_reason TEXT,
                solution TEXT,
                done_by TEXT,
                cancel_reason TEXT,
                canceled_by TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);
            CREATE INDEX IF NOT EXISTS idx_tickets_closed_at ON tickets(closed_at);
            CREATE INDEX IF NOT EXISTS idx_tickets_line ON tickets(line);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("ticket store lock poisoned".to_string()))
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            conditions.push(format!("status IN ({})", placeholders));
            for status in &filter.statuses {
                params.push(Box::new(status.as_str()));
            }
        }

        if let Some(ref requester) = filter.requester {
            conditions.push("requester = ?".to_string());
            params.push(Box::new(requester.clone()));
        }

        if let Some(ref line) = filter.line {
            conditions.push("line = ?".to_string());
            params.push(Box::new(line.clone()));
        }

        if let Some(ref machine) = filter.machine {
            conditions.push("machine = ?".to_string());
            params.push(Box::new(machine.clone()));
        }

        if let Some(from) = filter.created_from {
            conditions.push("created_at >= ?".to_string());
            params.push(Box::new(format_timestamp(from)));
        }

        if let Some(to) = filter.created_to {
            conditions.push("created_at <= ?".to_string());
            params.push(Box::new(format_timestamp(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn order_clause(order: TicketOrder) -> &'static str {
        match order {
            TicketOrder::CreatedDesc => "ORDER BY created_at DESC, id ASC",
            TicketOrder::ClosedDesc => "ORDER BY closed_at DESC, created_at DESC, id ASC",
        }
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let status_str: String = row.get(8)?;
        let status = status_str
            .parse::<TicketStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

        let last_action = row
            .get::<_, Option<String>>(16)?
            .map(|s| {
                s.parse::<TicketAction>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(e))
                })
            })
            .transpose()?;

        Ok(Ticket {
            id: row.get(0)?,
            requester: row.get(1)?,
            classification: Classification {
                line: row.get(2)?,
                machine: row.get(3)?,
                machine_type: row.get(4)?,
                machine_id: row.get(5)?,
                problem: row.get(6)?,
                description: row.get(7)?,
            },
            status,
            created_at: timestamp_at(row, 9)?,
            closed_at: optional_timestamp_at(row, 10)?,
            busy_started_at: optional_timestamp_at(row, 11)?,
            hold_started_at: optional_timestamp_at(row, 12)?,
            busy_seconds: seconds_at(row, 13)?,
            hold_seconds: seconds_at(row, 14)?,
            current_actor: row.get(15)?,
            last_action,
            hold_reason: row.get(17)?,
            solution: row.get(18)?,
            done_by: row.get(19)?,
            cancel_reason: row.get(20)?,
            canceled_by: row.get(21)?,
            updated_at: timestamp_at(row, 22)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(|e| TicketError::Database(e.to_string()))
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => timestamp_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn seconds_at(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn seconds_to_sql(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}

impl TicketStore for SqliteTicketStore {
    fn create(
        &self,
        request: CreateTicketRequest,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let conn = self.lock()?;

        let id = uuid::Uuid::new_v4().to_string();
        let ticket = Ticket::create(id, request.requester, request.classification, now);
        let c = &ticket.classification;

        conn.execute(
            &format!(
                "INSERT INTO tickets ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                TICKET_COLUMNS
            ),
            params![
                ticket.id,
                ticket.requester,
                c.line,
                c.machine,
                c.machine_type,
                c.machine_id,
                c.problem,
                c.description,
                ticket.status.as_str(),
                format_timestamp(ticket.created_at),
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                0i64,
                0i64,
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                Option::<String>::None,
                format_timestamp(ticket.updated_at),
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(ticket)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} {} LIMIT ? OFFSET ?",
            TICKET_COLUMNS,
            where_clause,
            Self::order_clause(filter.order)
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            let ticket = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(count)
    }

    fn transition(&self, id: &str, apply: TransitionFn<'_>) -> Result<Ticket, TicketError> {
        let mut conn = self.lock()?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let current = Self::fetch(&tx, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        // Dropping `tx` on the error path rolls back.
        let next = apply(&current)?;

        tx.execute(
            "UPDATE tickets SET status = ?, closed_at = ?, busy_started_at = ?, hold_started_at = ?, \
             busy_seconds = ?, hold_seconds = ?, current_actor = ?, last_action = ?, hold_reason = ?, \
             solution = ?, done_by = ?, cancel_reason = ?, canceled_by = ?, updated_at = ? WHERE id = ?",
            params![
                next.status.as_str(),
                next.closed_at.map(format_timestamp),
                next.busy_started_at.map(format_timestamp),
                next.hold_started_at.map(format_timestamp),
                seconds_to_sql(next.busy_seconds),
                seconds_to_sql(next.hold_seconds),
                next.current_actor,
                next.last_action.map(|a| a.as_str()),
                next.hold_reason,
                next.solution,
                next.done_by,
                next.cancel_reason,
                next.canceled_by,
                format_timestamp(next.updated_at),
                id,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(next)
    }
}
