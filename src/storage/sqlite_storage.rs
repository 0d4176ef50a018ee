use crate::{
    domain::{
        Board, Contact, ContactId, Lane, LaneId, Money, Pipeline, PipelineId, Tag, TagId,
        TenantId, Ticket, TicketId, UserId,
    },
    error::{PipelineError, Result},
    storage::{BoardMutation, Storage, TicketLocation},
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::{path::Path, str::FromStr, sync::Mutex, sync::MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pipelines (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS pipelines_tenant ON pipelines(tenant_id);

CREATE TABLE IF NOT EXISTS lanes (
    id           TEXT PRIMARY KEY,
    pipeline_id  TEXT NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
    name         TEXT NOT NULL,
    "order"      INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (pipeline_id, "order")
);

CREATE TABLE IF NOT EXISTS tags (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    name        TEXT NOT NULL,
    color       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS tags_tenant_name ON tags(tenant_id, name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS contacts (
    id          TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    id                TEXT PRIMARY KEY,
    lane_id           TEXT NOT NULL REFERENCES lanes(id) ON DELETE CASCADE,
    name              TEXT NOT NULL,
    description       TEXT,
    value             INTEGER,
    "order"           INTEGER NOT NULL,
    customer_id       TEXT REFERENCES contacts(id) ON DELETE SET NULL,
    assigned_user_id  TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (lane_id, "order")
);

CREATE TABLE IF NOT EXISTS ticket_tags (
    ticket_id  TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    tag_id     TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    position   INTEGER NOT NULL,
    PRIMARY KEY (ticket_id, tag_id)
);
"#;

/// SQLite-based storage backend.
///
/// Board commits run inside one `BEGIN IMMEDIATE` transaction that replaces
/// the pipeline's lane and ticket rows, so the per-parent `UNIQUE` order
/// constraints only ever see the final state. Unlike the document backends,
/// duplicate orders are refused here even when the caller trusts its batch.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path).map_err(store_err)?)
    }

    /// Opens a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(store_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::TransientStoreFailure("connection lock poisoned".into()))
    }

    fn read_pipeline(
        conn: &Connection,
        tenant_id: &TenantId,
        id: &PipelineId,
    ) -> Result<Option<Pipeline>> {
        let row = conn
            .query_row(
                "SELECT id, tenant_id, name, created_at, updated_at
                 FROM pipelines WHERE id = ?1 AND tenant_id = ?2",
                params![id.to_string(), tenant_id.as_str()],
                PipelineRow::from_row,
            )
            .optional()
            .map_err(store_err)?;
        row.map(PipelineRow::into_pipeline).transpose()
    }

    fn read_board(conn: &Connection, tenant_id: &TenantId, id: &PipelineId) -> Result<Board> {
        let pipeline = Self::read_pipeline(conn, tenant_id, id)?
            .ok_or_else(|| PipelineError::NotFound(format!("pipeline {}", id)))?;

        let mut stmt = conn
            .prepare(
                r#"SELECT id, pipeline_id, name, "order", created_at, updated_at
                   FROM lanes WHERE pipeline_id = ?1 ORDER BY "order" ASC"#,
            )
            .map_err(store_err)?;
        let lanes = stmt
            .query_map(params![id.to_string()], LaneRow::from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?
            .into_iter()
            .map(LaneRow::into_lane)
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn
            .prepare(
                r#"SELECT t.id, t.lane_id, t.name, t.description, t.value, t."order",
                          t.customer_id, t.assigned_user_id, t.created_at, t.updated_at
                   FROM tickets t JOIN lanes l ON l.id = t.lane_id
                   WHERE l.pipeline_id = ?1
                   ORDER BY l."order" ASC, t."order" ASC"#,
            )
            .map_err(store_err)?;
        let mut tickets = stmt
            .query_map(params![id.to_string()], TicketRow::from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?
            .into_iter()
            .map(TicketRow::into_ticket)
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn
            .prepare(
                "SELECT tt.ticket_id, tt.tag_id
                 FROM ticket_tags tt
                 JOIN tickets t ON t.id = tt.ticket_id
                 JOIN lanes l ON l.id = t.lane_id
                 WHERE l.pipeline_id = ?1
                 ORDER BY tt.position ASC",
            )
            .map_err(store_err)?;
        let links = stmt
            .query_map(params![id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        for (ticket_id, tag_id) in links {
            let ticket_id = TicketId::from_str(&ticket_id)?;
            let tag_id = TagId::from_str(&tag_id)?;
            if let Some(ticket) = tickets.iter_mut().find(|t| t.id == ticket_id) {
                ticket.tag_ids.push(tag_id);
            }
        }

        Ok(Board {
            pipeline,
            lanes,
            tickets,
            tags: Self::read_tags(conn, tenant_id)?,
            contacts: Self::read_contacts(conn, tenant_id)?,
        })
    }

    fn read_tags(conn: &Connection, tenant_id: &TenantId) -> Result<Vec<Tag>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, name, color, created_at
                 FROM tags WHERE tenant_id = ?1 ORDER BY name COLLATE NOCASE ASC",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![tenant_id.as_str()], TagRow::from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        rows.into_iter().map(TagRow::into_tag).collect()
    }

    fn read_contacts(conn: &Connection, tenant_id: &TenantId) -> Result<Vec<Contact>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, name, email, created_at
                 FROM contacts WHERE tenant_id = ?1",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![tenant_id.as_str()], ContactRow::from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        rows.into_iter().map(ContactRow::into_contact).collect()
    }

    /// Replaces the pipeline's lane and ticket rows with the board's
    fn write_board(conn: &Connection, board: &Board) -> Result<()> {
        let pipeline_id = board.pipeline.id.to_string();

        conn.execute(
            "UPDATE pipelines SET name = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                pipeline_id,
                board.pipeline.name,
                timestamp(&board.pipeline.updated_at)
            ],
        )
        .map_err(store_err)?;

        conn.execute(
            "DELETE FROM ticket_tags WHERE ticket_id IN (
                 SELECT t.id FROM tickets t JOIN lanes l ON l.id = t.lane_id
                 WHERE l.pipeline_id = ?1)",
            params![pipeline_id],
        )
        .map_err(store_err)?;
        conn.execute(
            "DELETE FROM tickets WHERE lane_id IN (SELECT id FROM lanes WHERE pipeline_id = ?1)",
            params![pipeline_id],
        )
        .map_err(store_err)?;
        conn.execute(
            "DELETE FROM lanes WHERE pipeline_id = ?1",
            params![pipeline_id],
        )
        .map_err(store_err)?;

        let mut insert_lane = conn
            .prepare(
                r#"INSERT INTO lanes (id, pipeline_id, name, "order", created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )
            .map_err(store_err)?;
        for lane in &board.lanes {
            insert_lane
                .execute(params![
                    lane.id.to_string(),
                    pipeline_id,
                    lane.name,
                    lane.order,
                    timestamp(&lane.created_at),
                    timestamp(&lane.updated_at),
                ])
                .map_err(store_err)?;
        }

        let mut insert_ticket = conn
            .prepare(
                r#"INSERT INTO tickets (id, lane_id, name, description, value, "order",
                                        customer_id, assigned_user_id, created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            )
            .map_err(store_err)?;
        let mut insert_link = conn
            .prepare("INSERT INTO ticket_tags (ticket_id, tag_id, position) VALUES (?1, ?2, ?3)")
            .map_err(store_err)?;
        for ticket in &board.tickets {
            let value = ticket
                .value
                .map(|v| i64::try_from(v.cents()))
                .transpose()
                .map_err(|_| PipelineError::Validation(format!("value of {} too large", ticket.id)))?;
            insert_ticket
                .execute(params![
                    ticket.id.to_string(),
                    ticket.lane_id.to_string(),
                    ticket.name,
                    ticket.description,
                    value,
                    ticket.order,
                    ticket.customer_id.map(|c| c.to_string()),
                    ticket.assigned_user_id.as_ref().map(|u| u.as_str().to_string()),
                    timestamp(&ticket.created_at),
                    timestamp(&ticket.updated_at),
                ])
                .map_err(store_err)?;
            for (position, tag_id) in ticket.tag_ids.iter().enumerate() {
                insert_link
                    .execute(params![ticket.id.to_string(), tag_id.to_string(), position as i64])
                    .map_err(store_err)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.lock()?.execute_batch(SCHEMA).map_err(store_err)
    }

    async fn is_initialized(&self) -> bool {
        let Ok(conn) = self.lock() else {
            return false;
        };
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'pipelines'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }

    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO pipelines (id, tenant_id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at
                 WHERE pipelines.tenant_id = excluded.tenant_id",
                params![
                    pipeline.id.to_string(),
                    pipeline.tenant_id.as_str(),
                    pipeline.name,
                    timestamp(&pipeline.created_at),
                    timestamp(&pipeline.updated_at),
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    async fn load_pipeline(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
    ) -> Result<Option<Pipeline>> {
        let conn = self.lock()?;
        Self::read_pipeline(&conn, tenant_id, id)
    }

    async fn list_pipelines(&self, tenant_id: &TenantId) -> Result<Vec<Pipeline>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, name, created_at, updated_at
                 FROM pipelines WHERE tenant_id = ?1 ORDER BY created_at ASC, name ASC",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![tenant_id.as_str()], PipelineRow::from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?;
        rows.into_iter().map(PipelineRow::into_pipeline).collect()
    }

    async fn delete_pipeline(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;
        if Self::read_pipeline(&tx, tenant_id, id)?.is_none() {
            return Err(PipelineError::NotFound(format!("pipeline {}", id)));
        }
        // Cascades to lanes, tickets and their tag links
        tx.execute("DELETE FROM pipelines WHERE id = ?1", params![id.to_string()])
            .map_err(store_err)?;
        tx.commit().map_err(store_err)
    }

    async fn load_board(&self, tenant_id: &TenantId, id: &PipelineId) -> Result<Board> {
        let conn = self.lock()?;
        Self::read_board(&conn, tenant_id, id)
    }

    async fn update_board(
        &self,
        tenant_id: &TenantId,
        id: &PipelineId,
        mutation: BoardMutation<'_>,
    ) -> Result<Board> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;

        let mut board = Self::read_board(&tx, tenant_id, id)?;
        let expected = board.pipeline.clone();
        mutation(&mut board)?;
        board.check_integrity(&expected)?;

        Self::write_board(&tx, &board)?;
        tx.commit().map_err(store_err)?;
        Ok(board)
    }

    async fn locate_tickets(&self, ids: &[TicketId]) -> Result<Vec<TicketLocation>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id, p.tenant_id, p.id, l.id
                 FROM tickets t
                 JOIN lanes l ON l.id = t.lane_id
                 JOIN pipelines p ON p.id = l.pipeline_id
                 WHERE t.id = ?1",
            )
            .map_err(store_err)?;

        let mut found = Vec::new();
        for id in ids {
            let row = stmt
                .query_row(params![id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .optional()
                .map_err(store_err)?;
            if let Some((ticket_id, tenant_id, pipeline_id, lane_id)) = row {
                found.push(TicketLocation {
                    ticket_id: TicketId::from_str(&ticket_id)?,
                    tenant_id: TenantId::new(tenant_id),
                    pipeline_id: PipelineId::from_str(&pipeline_id)?,
                    lane_id: LaneId::from_str(&lane_id)?,
                });
            }
        }
        Ok(found)
    }

    async fn upsert_tag(&self, tag: Tag) -> Result<Tag> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_err)?;

        let existing = tx
            .query_row(
                "SELECT id, tenant_id, name, color, created_at
                 FROM tags WHERE tenant_id = ?1 AND name = ?2 COLLATE NOCASE",
                params![tag.tenant_id.as_str(), tag.name],
                TagRow::from_row,
            )
            .optional()
            .map_err(store_err)?;
        if let Some(row) = existing {
            return row.into_tag();
        }

        tx.execute(
            "INSERT INTO tags (id, tenant_id, name, color, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tag.id.to_string(),
                tag.tenant_id.as_str(),
                tag.name,
                tag.color,
                timestamp(&tag.created_at),
            ],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;
        Ok(tag)
    }

    async fn list_tags(&self, tenant_id: &TenantId) -> Result<Vec<Tag>> {
        let conn = self.lock()?;
        Self::read_tags(&conn, tenant_id)
    }

    async fn save_contact(&self, contact: &Contact) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO contacts (id, tenant_id, name, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email
                 WHERE contacts.tenant_id = excluded.tenant_id",
                params![
                    contact.id.to_string(),
                    contact.tenant_id.as_str(),
                    contact.name,
                    contact.email,
                    timestamp(&contact.created_at),
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    async fn load_contact(&self, tenant_id: &TenantId, id: &ContactId) -> Result<Option<Contact>> {
        let row = self
            .lock()?
            .query_row(
                "SELECT id, tenant_id, name, email, created_at
                 FROM contacts WHERE id = ?1 AND tenant_id = ?2",
                params![id.to_string(), tenant_id.as_str()],
                ContactRow::from_row,
            )
            .optional()
            .map_err(store_err)?;
        row.map(ContactRow::into_contact).transpose()
    }
}

/// Constraint failures mean the submitted state was inconsistent; anything
/// else is treated as the store being unavailable.
fn store_err(err: rusqlite::Error) -> PipelineError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            PipelineError::ConsistencyViolation(err.to_string())
        }
        _ => PipelineError::TransientStoreFailure(err.to_string()),
    }
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PipelineError::ConsistencyViolation(format!("bad timestamp {}: {}", value, e)))
}

fn parse_order(value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| PipelineError::ConsistencyViolation(format!("stored order {} out of range", value)))
}

struct PipelineRow {
    id: String,
    tenant_id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl PipelineRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_pipeline(self) -> Result<Pipeline> {
        Ok(Pipeline {
            id: PipelineId::from_str(&self.id)?,
            tenant_id: TenantId::new(self.tenant_id),
            name: self.name,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct LaneRow {
    id: String,
    pipeline_id: String,
    name: String,
    order: i64,
    created_at: String,
    updated_at: String,
}

impl LaneRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            pipeline_id: row.get(1)?,
            name: row.get(2)?,
            order: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_lane(self) -> Result<Lane> {
        Ok(Lane {
            id: LaneId::from_str(&self.id)?,
            pipeline_id: PipelineId::from_str(&self.pipeline_id)?,
            name: self.name,
            order: parse_order(self.order)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct TicketRow {
    id: String,
    lane_id: String,
    name: String,
    description: Option<String>,
    value: Option<i64>,
    order: i64,
    customer_id: Option<String>,
    assigned_user_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TicketRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lane_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            value: row.get(4)?,
            order: row.get(5)?,
            customer_id: row.get(6)?,
            assigned_user_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_ticket(self) -> Result<Ticket> {
        let value = self
            .value
            .map(|v| {
                u64::try_from(v).map(Money::from_cents).map_err(|_| {
                    PipelineError::ConsistencyViolation(format!("negative value on {}", self.id))
                })
            })
            .transpose()?;
        Ok(Ticket {
            id: TicketId::from_str(&self.id)?,
            lane_id: LaneId::from_str(&self.lane_id)?,
            name: self.name,
            description: self.description,
            value,
            order: parse_order(self.order)?,
            tag_ids: Vec::new(),
            customer_id: self
                .customer_id
                .as_deref()
                .map(ContactId::from_str)
                .transpose()?,
            assigned_user_id: self.assigned_user_id.map(UserId::new),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct TagRow {
    id: String,
    tenant_id: String,
    name: String,
    color: String,
    created_at: String,
}

impl TagRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_tag(self) -> Result<Tag> {
        Ok(Tag {
            id: TagId::from_str(&self.id)?,
            tenant_id: TenantId::new(self.tenant_id),
            name: self.name,
            color: self.color,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct ContactRow {
    id: String,
    tenant_id: String,
    name: String,
    email: String,
    created_at: String,
}

impl ContactRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_contact(self) -> Result<Contact> {
        Ok(Contact {
            id: ContactId::from_str(&self.id)?,
            tenant_id: TenantId::new(self.tenant_id),
            name: self.name,
            email: self.email,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
