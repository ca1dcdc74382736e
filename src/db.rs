#![allow(dead_code)]
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::contact::{InteractionSignals, Person, PersonAttributes, RelationshipRecord};
use crate::pathfinder::DataProvider;
use crate::strength::{self, StrengthWeights};

/// The contact store. One database holds many tenants; every read and write
/// is tenant-keyed, and cross-tenant isolation is enforced here, not in the
/// pathfinding core.
pub struct Rolodex {
    conn: Connection,
}

pub struct Stats {
    pub person_count: usize,
    pub relationship_count: usize,
    pub tenant_count: usize,
    pub db_size: String,
}

/// One stored relationship row. The pair is canonicalized so `a_id < b_id`;
/// sent/received counts are relative to `a_id`.
#[derive(Debug, Clone)]
struct RelationshipRow {
    a_id: i64,
    b_id: i64,
    weight: Option<f64>,
    channels: Vec<String>,
    first_seen: Option<NaiveDateTime>,
    last_seen: Option<NaiveDateTime>,
    interaction_count: u64,
    sent_count: u64,
    received_count: u64,
}

impl RelationshipRow {
    fn signals(&self) -> InteractionSignals {
        InteractionSignals {
            first_seen_at: self.first_seen,
            last_seen_at: self.last_seen,
            interaction_count: self.interaction_count,
            sent_count: self.sent_count,
            received_count: self.received_count,
            channels: self.channels.clone(),
        }
    }
}

impl Rolodex {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Rolodex { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Rolodex { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS persons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant TEXT NOT NULL,
                display_name TEXT NOT NULL,
                organization TEXT,
                is_self INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                UNIQUE(tenant, display_name)
            );
            CREATE TABLE IF NOT EXISTS person_names (
                person_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY(person_id) REFERENCES persons(id),
                UNIQUE(person_id, name)
            );
            CREATE TABLE IF NOT EXISTS person_emails (
                person_id INTEGER NOT NULL,
                email TEXT NOT NULL,
                FOREIGN KEY(person_id) REFERENCES persons(id),
                UNIQUE(person_id, email)
            );
            CREATE TABLE IF NOT EXISTS person_phones (
                person_id INTEGER NOT NULL,
                phone TEXT NOT NULL,
                FOREIGN KEY(person_id) REFERENCES persons(id),
                UNIQUE(person_id, phone)
            );
            CREATE TABLE IF NOT EXISTS person_handles (
                person_id INTEGER NOT NULL,
                platform TEXT NOT NULL,
                value TEXT NOT NULL,
                FOREIGN KEY(person_id) REFERENCES persons(id),
                UNIQUE(person_id, platform)
            );
            CREATE TABLE IF NOT EXISTS relationships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant TEXT NOT NULL,
                a_id INTEGER NOT NULL,
                b_id INTEGER NOT NULL,
                weight REAL,
                channels TEXT NOT NULL DEFAULT '[]',
                first_seen TEXT,
                last_seen TEXT,
                interaction_count INTEGER NOT NULL DEFAULT 0,
                sent_count INTEGER NOT NULL DEFAULT 0,
                received_count INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(a_id) REFERENCES persons(id),
                FOREIGN KEY(b_id) REFERENCES persons(id),
                UNIQUE(tenant, a_id, b_id)
            );
            CREATE INDEX IF NOT EXISTS idx_persons_tenant ON persons(tenant);
            CREATE INDEX IF NOT EXISTS idx_relationships_tenant ON relationships(tenant);
            CREATE INDEX IF NOT EXISTS idx_relationships_a ON relationships(a_id);
            CREATE INDEX IF NOT EXISTS idx_relationships_b ON relationships(b_id);
            ",
        )
    }

    /// Insert a person or update their organization, returning the id.
    /// The display name is also registered as a name variant.
    pub fn upsert_person(
        &self,
        tenant: &str,
        display_name: &str,
        organization: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO persons (tenant, display_name, organization)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(tenant, display_name) DO UPDATE SET
                organization = COALESCE(?3, organization)",
            params![tenant, display_name, organization],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM persons WHERE tenant = ?1 AND display_name = ?2",
            params![tenant, display_name],
            |row| row.get(0),
        )?;
        self.add_alias(id, display_name)?;
        Ok(id)
    }

    pub fn add_alias(&self, person_id: i64, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO person_names (person_id, name) VALUES (?1, ?2)",
            params![person_id, name],
        )?;
        Ok(())
    }

    pub fn add_email(&self, person_id: i64, email: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO person_emails (person_id, email) VALUES (?1, ?2)",
            params![person_id, email.trim().to_lowercase()],
        )?;
        Ok(())
    }

    pub fn add_phone(&self, person_id: i64, phone: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO person_phones (person_id, phone) VALUES (?1, ?2)",
            params![person_id, phone.trim()],
        )?;
        Ok(())
    }

    pub fn add_handle(&self, person_id: i64, platform: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO person_handles (person_id, platform, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(person_id, platform) DO UPDATE SET value = ?3",
            params![person_id, platform.to_lowercase(), value.trim()],
        )?;
        Ok(())
    }

    pub fn mark_self(&self, person_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE persons SET is_self = 1 WHERE id = ?1",
            params![person_id],
        )?;
        Ok(())
    }

    pub fn soft_delete(&self, person_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE persons SET deleted = 1 WHERE id = ?1",
            params![person_id],
        )?;
        Ok(())
    }

    /// The tenant's own node, if one has been marked.
    pub fn self_person(&self, tenant: &str) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM persons WHERE tenant = ?1 AND is_self = 1 AND deleted = 0 LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![tenant], |row| row.get(0))?;
        match rows.next() {
            Some(Ok(id)) => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    /// Get or create the tenant's self node.
    pub fn ensure_self(&self, tenant: &str, display_name: &str) -> Result<i64> {
        if let Some(id) = self.self_person(tenant)? {
            return Ok(id);
        }
        let id = self.upsert_person(tenant, display_name, None)?;
        self.mark_self(id)?;
        Ok(id)
    }

    /// Record one interaction between two persons. Aggregates are updated
    /// and the stored edge weight is recomputed from them immediately — the
    /// weight column is always derived, never raw.
    ///
    /// `sent` means `from_id` initiated the interaction.
    pub fn record_interaction(
        &self,
        tenant: &str,
        from_id: i64,
        to_id: i64,
        channel: &str,
        sent: bool,
        at: NaiveDateTime,
        weights: &StrengthWeights,
    ) -> Result<()> {
        let (a, b, a_sent) = if from_id <= to_id {
            (from_id, to_id, sent)
        } else {
            (to_id, from_id, !sent)
        };

        let mut row = self
            .relationship_row(tenant, a, b)?
            .unwrap_or(RelationshipRow {
                a_id: a,
                b_id: b,
                weight: None,
                channels: Vec::new(),
                first_seen: None,
                last_seen: None,
                interaction_count: 0,
                sent_count: 0,
                received_count: 0,
            });

        row.first_seen = Some(row.first_seen.map_or(at, |f| f.min(at)));
        row.last_seen = Some(row.last_seen.map_or(at, |l| l.max(at)));
        row.interaction_count += 1;
        if a_sent {
            row.sent_count += 1;
        } else {
            row.received_count += 1;
        }
        let channel = channel.to_lowercase();
        if !row.channels.contains(&channel) {
            row.channels.push(channel);
        }
        row.weight = Some(strength::score_signals(
            &row.signals(),
            weights,
            Utc::now().naive_utc(),
        ));

        self.write_relationship_row(tenant, &row)
    }

    /// Recompute every stored weight for a tenant from its aggregates,
    /// e.g. after changing factor weights in config. Returns rows updated.
    pub fn rescore_tenant(&self, tenant: &str, weights: &StrengthWeights) -> Result<usize> {
        let now = Utc::now().naive_utc();
        let rows = self.relationship_rows(tenant)?;
        let count = rows.len();
        for mut row in rows {
            row.weight = Some(strength::score_signals(&row.signals(), weights, now));
            self.write_relationship_row(tenant, &row)?;
        }
        Ok(count)
    }

    fn relationship_row(&self, tenant: &str, a: i64, b: i64) -> Result<Option<RelationshipRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT a_id, b_id, weight, channels, first_seen, last_seen,
                    interaction_count, sent_count, received_count
             FROM relationships WHERE tenant = ?1 AND a_id = ?2 AND b_id = ?3",
        )?;
        let mut rows = stmt.query_map(params![tenant, a, b], map_relationship_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            _ => Ok(None),
        }
    }

    fn relationship_rows(&self, tenant: &str) -> Result<Vec<RelationshipRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT a_id, b_id, weight, channels, first_seen, last_seen,
                    interaction_count, sent_count, received_count
             FROM relationships WHERE tenant = ?1",
        )?;
        let rows = stmt.query_map(params![tenant], map_relationship_row)?;
        rows.collect()
    }

    fn write_relationship_row(&self, tenant: &str, row: &RelationshipRow) -> Result<()> {
        let channels =
            serde_json::to_string(&row.channels).unwrap_or_else(|_| "[]".to_string());
        self.conn.execute(
            "INSERT INTO relationships
                (tenant, a_id, b_id, weight, channels, first_seen, last_seen,
                 interaction_count, sent_count, received_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(tenant, a_id, b_id) DO UPDATE SET
                weight = ?4, channels = ?5, first_seen = ?6, last_seen = ?7,
                interaction_count = ?8, sent_count = ?9, received_count = ?10",
            params![
                tenant,
                row.a_id,
                row.b_id,
                row.weight,
                channels,
                row.first_seen.map(fmt_dt),
                row.last_seen.map(fmt_dt),
                row.interaction_count,
                row.sent_count,
                row.received_count,
            ],
        )?;
        Ok(())
    }

    /// All non-deleted persons for a tenant, with their contact attributes
    /// assembled from the side tables.
    pub fn list_persons(&self, tenant: &str) -> Result<Vec<Person>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, display_name, organization, is_self, deleted
             FROM persons WHERE tenant = ?1 AND deleted = 0
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![tenant], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut persons = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            let (id, display_name, organization, is_self, deleted) = row?;
            index.insert(id, persons.len());
            persons.push(Person {
                id,
                display_names: vec![display_name],
                attributes: PersonAttributes {
                    is_self,
                    organization,
                    deleted,
                    ..PersonAttributes::default()
                },
            });
        }

        // Attach variants from the side tables in one pass each.
        let mut stmt = self.conn.prepare(
            "SELECT n.person_id, n.name FROM person_names n
             JOIN persons p ON p.id = n.person_id WHERE p.tenant = ?1",
        )?;
        let names = stmt.query_map(params![tenant], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in names {
            let (id, name) = row?;
            if let Some(&i) = index.get(&id) {
                if !persons[i].display_names.contains(&name) {
                    persons[i].display_names.push(name);
                }
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT e.person_id, e.email FROM person_emails e
             JOIN persons p ON p.id = e.person_id WHERE p.tenant = ?1",
        )?;
        let emails = stmt.query_map(params![tenant], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in emails {
            let (id, email) = row?;
            if let Some(&i) = index.get(&id) {
                persons[i].attributes.emails.push(email);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT ph.person_id, ph.phone FROM person_phones ph
             JOIN persons p ON p.id = ph.person_id WHERE p.tenant = ?1",
        )?;
        let phones = stmt.query_map(params![tenant], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in phones {
            let (id, phone) = row?;
            if let Some(&i) = index.get(&id) {
                persons[i].attributes.phones.push(phone);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT h.person_id, h.platform, h.value FROM person_handles h
             JOIN persons p ON p.id = h.person_id WHERE p.tenant = ?1",
        )?;
        let handles = stmt.query_map(params![tenant], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in handles {
            let (id, platform, value) = row?;
            if let Some(&i) = index.get(&id) {
                persons[i].attributes.social_handles.insert(platform, value);
            }
        }

        Ok(persons)
    }

    /// All relationships for a tenant, one record per stored pair. The graph
    /// builder mirrors them into both directions.
    pub fn list_relationships(&self, tenant: &str) -> Result<Vec<RelationshipRecord>> {
        let rows = self.relationship_rows(tenant)?;
        Ok(rows
            .into_iter()
            .map(|row| RelationshipRecord {
                from_id: row.a_id,
                to_id: row.b_id,
                weight: row.weight,
                channels: row.channels,
                last_interaction: row.last_seen,
            })
            .collect())
    }

    /// Look a person up by display name or any known alias, case-insensitive.
    pub fn person_by_name(&self, tenant: &str, name: &str) -> Result<Option<Person>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT p.id FROM persons p
             LEFT JOIN person_names n ON n.person_id = p.id
             WHERE p.tenant = ?1 AND p.deleted = 0
               AND (LOWER(p.display_name) = LOWER(?2) OR LOWER(n.name) = LOWER(?2))
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![tenant, name], |row| row.get::<_, i64>(0))?;
        let id = match rows.next() {
            Some(Ok(id)) => id,
            _ => return Ok(None),
        };
        Ok(self.list_persons(tenant)?.into_iter().find(|p| p.id == id))
    }

    /// Fold a duplicate person into a keeper: contact data and name variants
    /// move over, relationships are re-keyed (merging aggregates where both
    /// already knew the same counterpart), and the duplicate is soft-deleted.
    pub fn merge_persons(
        &self,
        tenant: &str,
        keep_id: i64,
        dup_id: i64,
        weights: &StrengthWeights,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO person_names (person_id, name)
             SELECT ?1, name FROM person_names WHERE person_id = ?2",
            params![keep_id, dup_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO person_names (person_id, name)
             SELECT ?1, display_name FROM persons WHERE id = ?2",
            params![keep_id, dup_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO person_emails (person_id, email)
             SELECT ?1, email FROM person_emails WHERE person_id = ?2",
            params![keep_id, dup_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO person_phones (person_id, phone)
             SELECT ?1, phone FROM person_phones WHERE person_id = ?2",
            params![keep_id, dup_id],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO person_handles (person_id, platform, value)
             SELECT ?1, platform, value FROM person_handles WHERE person_id = ?2",
            params![keep_id, dup_id],
        )?;

        let now = Utc::now().naive_utc();
        for row in self.relationship_rows(tenant)? {
            if row.a_id != dup_id && row.b_id != dup_id {
                continue;
            }
            let other = if row.a_id == dup_id { row.b_id } else { row.a_id };
            self.conn.execute(
                "DELETE FROM relationships WHERE tenant = ?1 AND a_id = ?2 AND b_id = ?3",
                params![tenant, row.a_id, row.b_id],
            )?;
            if other == keep_id {
                continue;
            }
            let (a, b) = if keep_id <= other {
                (keep_id, other)
            } else {
                (other, keep_id)
            };
            let mut merged = self
                .relationship_row(tenant, a, b)?
                .unwrap_or(RelationshipRow {
                    a_id: a,
                    b_id: b,
                    weight: None,
                    channels: Vec::new(),
                    first_seen: None,
                    last_seen: None,
                    interaction_count: 0,
                    sent_count: 0,
                    received_count: 0,
                });
            merged.interaction_count += row.interaction_count;
            merged.sent_count += row.sent_count;
            merged.received_count += row.received_count;
            merged.first_seen = match (merged.first_seen, row.first_seen) {
                (Some(x), Some(y)) => Some(x.min(y)),
                (x, y) => x.or(y),
            };
            merged.last_seen = match (merged.last_seen, row.last_seen) {
                (Some(x), Some(y)) => Some(x.max(y)),
                (x, y) => x.or(y),
            };
            for ch in row.channels {
                if !merged.channels.contains(&ch) {
                    merged.channels.push(ch);
                }
            }
            merged.weight = Some(strength::score_signals(&merged.signals(), weights, now));
            self.write_relationship_row(tenant, &merged)?;
        }

        self.soft_delete(dup_id)
    }

    pub fn stats(&self) -> Result<Stats> {
        let person_count: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM persons WHERE deleted = 0", [], |r| {
                    r.get(0)
                })?;
        let relationship_count: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))?;
        let tenant_count: usize = self.conn.query_row(
            "SELECT COUNT(DISTINCT tenant) FROM persons",
            [],
            |r| r.get(0),
        )?;
        let page_size: i64 = self.conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
        let page_count: i64 = self.conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
        let bytes = page_size * page_count;
        let db_size = if bytes > 1_048_576 {
            format!("{:.1} MB", bytes as f64 / 1_048_576.0)
        } else {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        };
        Ok(Stats {
            person_count,
            relationship_count,
            tenant_count,
            db_size,
        })
    }

    /// A tenant-scoped handle implementing the core's `DataProvider`. The
    /// connection is owned here and passed in explicitly — no globals.
    pub fn scoped<'a>(&'a self, tenant: &str) -> TenantScoped<'a> {
        TenantScoped {
            store: self,
            tenant: tenant.to_string(),
        }
    }
}

pub struct TenantScoped<'a> {
    store: &'a Rolodex,
    tenant: String,
}

impl DataProvider for TenantScoped<'_> {
    fn list_persons(&self) -> anyhow::Result<Vec<Person>> {
        Ok(self.store.list_persons(&self.tenant)?)
    }

    fn list_relationships(&self) -> anyhow::Result<Vec<RelationshipRecord>> {
        Ok(self.store.list_relationships(&self.tenant)?)
    }
}

fn map_relationship_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationshipRow> {
    let channels: String = row.get(3)?;
    Ok(RelationshipRow {
        a_id: row.get(0)?,
        b_id: row.get(1)?,
        weight: row.get(2)?,
        channels: serde_json::from_str(&channels).unwrap_or_default(),
        first_seen: row.get::<_, Option<String>>(4)?.map(|s| parse_dt(&s)),
        last_seen: row.get::<_, Option<String>>(5)?.map(|s| parse_dt(&s)),
        interaction_count: row.get(6)?,
        sent_count: row.get(7)?,
        received_count: row.get(8)?,
    })
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap_or_else(|_| Utc::now().naive_utc())
}
