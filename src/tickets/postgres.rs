//! Postgres ticket store.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{Page, Ticket, TicketError, TicketFilter, TicketStore, TicketSummary, TicketUpdate};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const TICKET_COLUMNS: &str = r"
    id, ticket_number, title, description, category, priority, source, status,
    assigned_team, assigned_to, tags, requester_email, requester_name, department,
    contact_number, related_assets, resolution_notes, created_at, updated_at,
    resolved_at, sla_due_date, ai_classification_confidence,
    suggested_knowledge_base_articles, is_self_service_resolved, chat_history
";

#[derive(Clone, Debug)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply `sql/schema.sql`; every statement in it is idempotent.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for (index, statement) in schema_statements(SCHEMA_SQL).iter().enumerate() {
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "DDL",
                db.statement = statement.as_str()
            );
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(span)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn schema_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

/// Escape `LIKE` wildcards so the keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, TicketError> {
    let category: String = row.try_get("category").context("category column")?;
    let priority: String = row.try_get("priority").context("priority column")?;
    let source: String = row.try_get("source").context("source column")?;
    let status: String = row.try_get("status").context("status column")?;
    let chat_history: serde_json::Value =
        row.try_get("chat_history").context("chat_history column")?;

    Ok(Ticket {
        id: row.try_get("id").context("id column")?,
        ticket_number: row.try_get("ticket_number").context("ticket_number column")?,
        title: row.try_get("title").context("title column")?,
        description: row.try_get("description").context("description column")?,
        category: category.parse()?,
        priority: priority.parse()?,
        source: source.parse()?,
        status: status.parse()?,
        assigned_team: row.try_get("assigned_team").context("assigned_team column")?,
        assigned_to: row.try_get("assigned_to").context("assigned_to column")?,
        tags: row.try_get("tags").context("tags column")?,
        requester_email: row.try_get("requester_email").context("requester_email column")?,
        requester_name: row.try_get("requester_name").context("requester_name column")?,
        department: row.try_get("department").context("department column")?,
        contact_number: row.try_get("contact_number").context("contact_number column")?,
        related_assets: row.try_get("related_assets").context("related_assets column")?,
        resolution_notes: row
            .try_get("resolution_notes")
            .context("resolution_notes column")?,
        created_at: row.try_get("created_at").context("created_at column")?,
        updated_at: row.try_get("updated_at").context("updated_at column")?,
        resolved_at: row.try_get("resolved_at").context("resolved_at column")?,
        sla_due_date: row.try_get("sla_due_date").context("sla_due_date column")?,
        ai_classification_confidence: row
            .try_get("ai_classification_confidence")
            .context("ai_classification_confidence column")?,
        suggested_knowledge_base_articles: row
            .try_get("suggested_knowledge_base_articles")
            .context("suggested_knowledge_base_articles column")?,
        is_self_service_resolved: row
            .try_get("is_self_service_resolved")
            .context("is_self_service_resolved column")?,
        chat_history: match chat_history {
            serde_json::Value::Array(items) => items,
            _ => Vec::new(),
        },
    })
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert(&self, ticket: &Ticket) -> Result<(), TicketError> {
        let query = r"
            INSERT INTO tickets (
                id, ticket_number, title, description, category, priority, source, status,
                assigned_team, assigned_to, tags, requester_email, requester_name, department,
                contact_number, related_assets, resolution_notes, created_at, updated_at,
                resolved_at, sla_due_date, ai_classification_confidence,
                suggested_knowledge_base_articles, is_self_service_resolved, chat_history
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(ticket.id)
            .bind(&ticket.ticket_number)
            .bind(&ticket.title)
            .bind(&ticket.description)
            .bind(ticket.category.as_str())
            .bind(ticket.priority.as_str())
            .bind(ticket.source.as_str())
            .bind(ticket.status.as_str())
            .bind(&ticket.assigned_team)
            .bind(&ticket.assigned_to)
            .bind(&ticket.tags)
            .bind(&ticket.requester_email)
            .bind(&ticket.requester_name)
            .bind(&ticket.department)
            .bind(&ticket.contact_number)
            .bind(&ticket.related_assets)
            .bind(&ticket.resolution_notes)
            .bind(ticket.created_at)
            .bind(ticket.updated_at)
            .bind(ticket.resolved_at)
            .bind(ticket.sla_due_date)
            .bind(ticket.ai_classification_confidence)
            .bind(&ticket.suggested_knowledge_base_articles)
            .bind(ticket.is_self_service_resolved)
            .bind(serde_json::Value::Array(ticket.chat_history.clone()))
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(TicketError::DuplicateNumber(ticket.ticket_number.clone()))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert ticket")
                .into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>, TicketError> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch ticket")?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn get_by_number(&self, ticket_number: &str) -> Result<Option<Ticket>, TicketError> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_number = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(ticket_number)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch ticket by number")?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, TicketError> {
        // Lock the row so concurrent updates apply one after the other.
        let mut tx = self.pool.begin().await.context("begin update transaction")?;

        let select = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = select.as_str()
        );
        let row = sqlx::query(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .instrument(span)
            .await
            .context("failed to lock ticket")?;

        let Some(row) = row else {
            let _ = tx.rollback().await;
            return Ok(None);
        };
        let mut ticket = ticket_from_row(&row)?;
        ticket.apply(update, now);

        let query = r"
            UPDATE tickets
            SET status = $2,
                priority = $3,
                assigned_team = $4,
                assigned_to = $5,
                resolution_notes = $6,
                tags = $7,
                updated_at = $8,
                resolved_at = $9,
                sla_due_date = $10
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(ticket.id)
            .bind(ticket.status.as_str())
            .bind(ticket.priority.as_str())
            .bind(&ticket.assigned_team)
            .bind(&ticket.assigned_to)
            .bind(&ticket.resolution_notes)
            .bind(&ticket.tags)
            .bind(ticket.updated_at)
            .bind(ticket.resolved_at)
            .bind(ticket.sla_due_date)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to update ticket")?;

        tx.commit().await.context("commit update transaction")?;

        Ok(Some(ticket))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, TicketError> {
        let query = "DELETE FROM tickets WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete ticket")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &TicketFilter, page: Page) -> Result<Vec<Ticket>, TicketError> {
        let query = format!(
            r"
            SELECT {TICKET_COLUMNS} FROM tickets
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR priority = $2)
              AND ($3::text IS NULL OR category = $3)
              AND ($4::text IS NULL OR assigned_to = $4)
            ORDER BY created_at DESC, ticket_number DESC
            LIMIT $5 OFFSET $6
            "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.priority.map(|priority| priority.as_str()))
            .bind(filter.category.map(|category| category.as_str()))
            .bind(filter.assigned_to.as_deref())
            .bind(i64::from(page.limit()))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list tickets")?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn search(&self, keyword: &str, page: Page) -> Result<Vec<Ticket>, TicketError> {
        let query = format!(
            r"
            SELECT {TICKET_COLUMNS} FROM tickets
            WHERE title ILIKE $1 OR description ILIKE $1
            ORDER BY created_at DESC, ticket_number DESC
            LIMIT $2 OFFSET $3
            "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .bind(like_pattern(keyword))
            .bind(i64::from(page.limit()))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to search tickets")?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn summary(&self) -> Result<TicketSummary, TicketError> {
        let query = r"
            SELECT
                COUNT(*) AS total_tickets,
                COUNT(*) FILTER (WHERE status = 'open') AS open_tickets,
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress_tickets,
                COUNT(*) FILTER (WHERE status = 'resolved') AS resolved_tickets,
                COUNT(*) FILTER (WHERE priority = 'high') AS high_priority_tickets,
                COUNT(*) FILTER (WHERE priority = 'critical') AS critical_tickets
            FROM tickets
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to compute ticket summary")?;

        Ok(TicketSummary {
            total_tickets: row.try_get("total_tickets").context("total_tickets")?,
            open_tickets: row.try_get("open_tickets").context("open_tickets")?,
            in_progress_tickets: row
                .try_get("in_progress_tickets")
                .context("in_progress_tickets")?,
            resolved_tickets: row.try_get("resolved_tickets").context("resolved_tickets")?,
            high_priority_tickets: row
                .try_get("high_priority_tickets")
                .context("high_priority_tickets")?,
            critical_tickets: row.try_get("critical_tickets").context("critical_tickets")?,
        })
    }

    async fn ping(&self) -> Result<(), TicketError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgresql"
    }
}
