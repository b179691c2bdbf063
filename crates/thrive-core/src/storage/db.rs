//! SQLite program store.
//!
//! One database holds users, content, email templates and the delivery
//! log, and implements every collaborator trait the engine needs. Hosts
//! with their own account or CMS backends implement the traits instead.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use super::{data_dir, migrations};
use crate::content::{ContentDose, ContentKey, ContentPack, ContentStore, DoItem};
use crate::email::{DeliveryLog, DeliveryRecord, DeliveryStatus, EmailTemplate, TemplateStore};
use crate::error::{CoreError, StoreError};
use crate::users::{User, UserDirectory};

const USER_COLUMNS: &str =
    "id, email, display_name, program_start_date, timezone, labels, email_opt_in";
const DOSE_COLUMNS: &str =
    "id, title, message, key_kind, key_day, key_theme, target_labels, active";
const DO_ITEM_COLUMNS: &str =
    "id, title, description, key_kind, key_day, key_theme, target_labels, active";
const DELIVERY_COLUMNS: &str = "id, date_key, user_id, email, program_day, dose_id, status, \
     provider_id, error, attempted_at";

/// SQLite-backed store for users, content, templates and deliveries.
pub struct ProgramDb {
    conn: Mutex<Connection>,
}

impl ProgramDb {
    /// Open the database at `~/.config/thrive/thrive.db`.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("thrive.db");
        Ok(Self::open_path(&path)?)
    }

    /// Open (or create) a database file and migrate it.
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        info!(path = %path.display(), "program db opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))?;
        f(&conn)
    }

    // ── users ────────────────────────────────────────────────────────

    /// Insert or replace a user.
    pub fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let labels = encode_labels(user.labels.iter())?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, display_name, program_start_date, timezone, labels, email_opt_in)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    display_name = excluded.display_name,
                    program_start_date = excluded.program_start_date,
                    timezone = excluded.timezone,
                    labels = excluded.labels,
                    email_opt_in = excluded.email_opt_in",
                params![
                    user.id,
                    user.email,
                    user.display_name,
                    user.program_start_date.map(|d| d.to_rfc3339()),
                    user.timezone,
                    labels,
                    user.email_opt_in,
                ],
            )?;
            Ok(())
        })
    }

    /// All users, by id.
    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        self.query_users(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"), [])
    }

    /// Flip the email opt-in flag, e.g. after a verified unsubscribe.
    pub fn set_email_opt_in(&self, id: &str, opt_in: bool) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET email_opt_in = ?1 WHERE id = ?2",
                params![opt_in, id],
            )?)
        })?;
        if changed == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }

    fn query_users<P: rusqlite::Params>(&self, sql: &str, p: P) -> Result<Vec<User>, StoreError> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(p, RawUser::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        raw.into_iter().map(RawUser::into_user).collect()
    }

    // ── content ──────────────────────────────────────────────────────

    /// Insert or update a dose. New doses go to the end of their pool.
    pub fn insert_dose(&self, dose: &ContentDose) -> Result<(), StoreError> {
        self.with_conn(|conn| insert_dose(conn, dose))
    }

    /// Insert or update a do-item. New items go to the end of their pool.
    pub fn insert_do_item(&self, item: &DoItem) -> Result<(), StoreError> {
        self.with_conn(|conn| insert_do_item(conn, item))
    }

    /// Import a content pack in one transaction.
    ///
    /// Returns the number of doses and do-items written.
    pub fn import_pack(&self, pack: &ContentPack) -> Result<(usize, usize), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for dose in &pack.doses {
                insert_dose(&tx, dose)?;
            }
            for item in &pack.do_items {
                insert_do_item(&tx, item)?;
            }
            tx.commit()?;
            Ok(())
        })?;
        info!(
            doses = pack.doses.len(),
            do_items = pack.do_items.len(),
            "content pack imported"
        );
        Ok((pack.doses.len(), pack.do_items.len()))
    }

    /// Import a content pack from a JSON file.
    pub fn import_pack_file(&self, path: &Path) -> Result<(usize, usize), CoreError> {
        let content = std::fs::read_to_string(path)?;
        let pack: ContentPack = serde_json::from_str(&content)?;
        Ok(self.import_pack(&pack)?)
    }

    fn query_content<P: rusqlite::Params>(
        &self,
        sql: &str,
        p: P,
    ) -> Result<Vec<RawContent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(p, RawContent::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn doses_where<P: rusqlite::Params>(
        &self,
        filter: &str,
        p: P,
    ) -> Result<Vec<ContentDose>, StoreError> {
        let sql = format!("SELECT {DOSE_COLUMNS} FROM doses WHERE {filter} ORDER BY sort_order, id");
        self.query_content(&sql, p)?
            .into_iter()
            .map(RawContent::into_dose)
            .collect()
    }

    fn do_items_where<P: rusqlite::Params>(
        &self,
        filter: &str,
        p: P,
    ) -> Result<Vec<DoItem>, StoreError> {
        let sql =
            format!("SELECT {DO_ITEM_COLUMNS} FROM do_items WHERE {filter} ORDER BY sort_order, id");
        self.query_content(&sql, p)?
            .into_iter()
            .map(RawContent::into_do_item)
            .collect()
    }

    // ── templates ────────────────────────────────────────────────────

    /// Insert or replace an email template.
    pub fn upsert_template(&self, template: &EmailTemplate) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_templates (id, subject, html_body, text_body, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    subject = excluded.subject,
                    html_body = excluded.html_body,
                    text_body = excluded.text_body,
                    is_active = excluded.is_active",
                params![
                    template.id,
                    template.subject,
                    template.html_body,
                    template.text_body,
                    template.is_active,
                ],
            )?;
            Ok(())
        })
    }

    // ── deliveries ───────────────────────────────────────────────────

    /// Delivery records for a UTC day, oldest first.
    pub fn deliveries_on(&self, date_key: &str) -> Result<Vec<DeliveryRecord>, StoreError> {
        let raw = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE date_key = ?1
                 ORDER BY attempted_at, id"
            ))?;
            let rows = stmt
                .query_map([date_key], RawDelivery::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        raw.into_iter().map(RawDelivery::into_record).collect()
    }
}

impl UserDirectory for ProgramDb {
    fn list_email_eligible_users(&self) -> Result<Vec<User>, StoreError> {
        self.query_users(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email_opt_in = 1 ORDER BY id"),
            [],
        )
    }

    fn get_user(&self, id: &str) -> Result<User, StoreError> {
        let raw = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id],
                    RawUser::from_row,
                )
                .optional()?)
        })?;
        raw.ok_or_else(|| not_found("user", id))?.into_user()
    }

    fn save_onboarding(
        &self,
        id: &str,
        labels: &BTreeSet<String>,
        program_start_date: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let labels = encode_labels(labels.iter())?;
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET labels = ?1, program_start_date = ?2 WHERE id = ?3",
                params![labels, program_start_date.to_rfc3339(), id],
            )?)
        })?;
        if changed == 0 {
            return Err(not_found("user", id));
        }
        Ok(())
    }
}

impl ContentStore for ProgramDb {
    fn dose_by_day(&self, day: u8) -> Result<Option<ContentDose>, StoreError> {
        let sql = format!(
            "SELECT {DOSE_COLUMNS} FROM doses WHERE key_kind = 'day' AND key_day = ?1
             ORDER BY active DESC, sort_order, id LIMIT 1"
        );
        self.query_content(&sql, [day])?
            .into_iter()
            .next()
            .map(RawContent::into_dose)
            .transpose()
    }

    fn doses_by_theme(&self, theme_id: &str) -> Result<Vec<ContentDose>, StoreError> {
        self.doses_where("key_kind = 'theme' AND key_theme = ?1", [theme_id])
    }

    fn rotating_doses(&self) -> Result<Vec<ContentDose>, StoreError> {
        self.doses_where("key_kind = 'rotating'", [])
    }

    fn do_items_by_day(&self, day: u8) -> Result<Vec<DoItem>, StoreError> {
        self.do_items_where("key_kind = 'day' AND key_day = ?1", [day])
    }

    fn do_items_by_theme(&self, theme_id: &str) -> Result<Vec<DoItem>, StoreError> {
        self.do_items_where("key_kind = 'theme' AND key_theme = ?1", [theme_id])
    }

    fn rotating_do_items(&self) -> Result<Vec<DoItem>, StoreError> {
        self.do_items_where("key_kind = 'rotating'", [])
    }
}

impl TemplateStore for ProgramDb {
    fn email_template(&self, id: &str) -> Result<Option<EmailTemplate>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, subject, html_body, text_body, is_active
                     FROM email_templates WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(EmailTemplate {
                            id: row.get(0)?,
                            subject: row.get(1)?,
                            html_body: row.get(2)?,
                            text_body: row.get(3)?,
                            is_active: row.get(4)?,
                        })
                    },
                )
                .optional()?)
        })
    }
}

impl DeliveryLog for ProgramDb {
    fn record(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO deliveries ({DELIVERY_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    record.id,
                    record.date_key,
                    record.user_id,
                    record.email,
                    record.program_day,
                    record.dose_id,
                    record.status.as_str(),
                    record.provider_id,
                    record.error,
                    record.attempted_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }
}

// ── row mapping ──────────────────────────────────────────────────────

struct RawUser {
    id: String,
    email: String,
    display_name: String,
    program_start_date: Option<String>,
    timezone: Option<String>,
    labels: String,
    email_opt_in: bool,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            program_start_date: row.get(3)?,
            timezone: row.get(4)?,
            labels: row.get(5)?,
            email_opt_in: row.get(6)?,
        })
    }

    fn into_user(self) -> Result<User, StoreError> {
        let program_start_date = self
            .program_start_date
            .as_deref()
            .map(|s| parse_timestamp("program_start_date", s))
            .transpose()?;
        let labels: Vec<String> = decode_json("labels", &self.labels)?;
        Ok(User {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            program_start_date,
            timezone: self.timezone,
            labels: labels.into_iter().collect(),
            email_opt_in: self.email_opt_in,
        })
    }
}

struct RawContent {
    id: String,
    title: String,
    body: String,
    key_kind: String,
    key_day: Option<i64>,
    key_theme: Option<String>,
    target_labels: String,
    active: bool,
}

impl RawContent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            key_kind: row.get(3)?,
            key_day: row.get(4)?,
            key_theme: row.get(5)?,
            target_labels: row.get(6)?,
            active: row.get(7)?,
        })
    }

    fn key(&self) -> Result<ContentKey, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            field: "content key",
            message,
        };
        match (self.key_kind.as_str(), self.key_day, &self.key_theme) {
            ("day", Some(day), _) => u8::try_from(day)
                .map(ContentKey::Day)
                .map_err(|_| corrupt(format!("day {day} out of range for '{}'", self.id))),
            ("theme", _, Some(theme)) => Ok(ContentKey::Theme(theme.clone())),
            ("rotating", _, _) => Ok(ContentKey::Rotating),
            (kind, _, _) => Err(corrupt(format!("bad key '{kind}' for '{}'", self.id))),
        }
    }

    fn into_dose(self) -> Result<ContentDose, StoreError> {
        Ok(ContentDose {
            key: self.key()?,
            target_labels: decode_json("target_labels", &self.target_labels)?,
            id: self.id,
            title: self.title,
            message: self.body,
            active: self.active,
        })
    }

    fn into_do_item(self) -> Result<DoItem, StoreError> {
        Ok(DoItem {
            key: self.key()?,
            target_labels: decode_json("target_labels", &self.target_labels)?,
            id: self.id,
            title: self.title,
            description: self.body,
            active: self.active,
        })
    }
}

struct RawDelivery {
    id: String,
    date_key: String,
    user_id: String,
    email: String,
    program_day: i64,
    dose_id: Option<String>,
    status: String,
    provider_id: Option<String>,
    error: Option<String>,
    attempted_at: String,
}

impl RawDelivery {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date_key: row.get(1)?,
            user_id: row.get(2)?,
            email: row.get(3)?,
            program_day: row.get(4)?,
            dose_id: row.get(5)?,
            status: row.get(6)?,
            provider_id: row.get(7)?,
            error: row.get(8)?,
            attempted_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<DeliveryRecord, StoreError> {
        let status = DeliveryStatus::parse(&self.status).ok_or_else(|| StoreError::Corrupt {
            field: "status",
            message: format!("unknown delivery status '{}'", self.status),
        })?;
        Ok(DeliveryRecord {
            attempted_at: parse_timestamp("attempted_at", &self.attempted_at)?,
            id: self.id,
            date_key: self.date_key,
            user_id: self.user_id,
            email: self.email,
            program_day: self.program_day,
            dose_id: self.dose_id,
            status,
            provider_id: self.provider_id,
            error: self.error,
        })
    }
}

fn key_columns(key: &ContentKey) -> (&'static str, Option<u8>, Option<&str>) {
    match key {
        ContentKey::Day(day) => ("day", Some(*day), None),
        ContentKey::Theme(theme) => ("theme", None, Some(theme.as_str())),
        ContentKey::Rotating => ("rotating", None, None),
    }
}

fn insert_dose(conn: &Connection, dose: &ContentDose) -> Result<(), StoreError> {
    let (kind, day, theme) = key_columns(&dose.key);
    conn.execute(
        "INSERT INTO doses (id, title, message, key_kind, key_day, key_theme, target_labels, active, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                 (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM doses))
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            message = excluded.message,
            key_kind = excluded.key_kind,
            key_day = excluded.key_day,
            key_theme = excluded.key_theme,
            target_labels = excluded.target_labels,
            active = excluded.active",
        params![
            dose.id,
            dose.title,
            dose.message,
            kind,
            day,
            theme,
            encode_labels(dose.target_labels.iter())?,
            dose.active,
        ],
    )?;
    Ok(())
}

fn insert_do_item(conn: &Connection, item: &DoItem) -> Result<(), StoreError> {
    let (kind, day, theme) = key_columns(&item.key);
    conn.execute(
        "INSERT INTO do_items (id, title, description, key_kind, key_day, key_theme, target_labels, active, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                 (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM do_items))
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            key_kind = excluded.key_kind,
            key_day = excluded.key_day,
            key_theme = excluded.key_theme,
            target_labels = excluded.target_labels,
            active = excluded.active",
        params![
            item.id,
            item.title,
            item.description,
            kind,
            day,
            theme,
            encode_labels(item.target_labels.iter())?,
            item.active,
        ],
    )?;
    Ok(())
}

fn encode_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Result<String, StoreError> {
    let labels: Vec<&String> = labels.collect();
    serde_json::to_string(&labels).map_err(|e| StoreError::Corrupt {
        field: "labels",
        message: e.to_string(),
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    raw: &str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        field,
        message: e.to_string(),
    })
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            field,
            message: format!("'{raw}': {e}"),
        })
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}
