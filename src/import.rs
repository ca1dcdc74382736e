//! Import adapters: LinkedIn connection exports and interaction-log CSVs.
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::db::Rolodex;
use crate::strength::StrengthWeights;

/// Split one CSV line into fields, honoring double quotes and `""` escapes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

fn column_index(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
}

/// Ingest a file, picking the adapter by its header row. Returns
/// (persons, relationships/interactions) touched.
pub fn ingest_file(
    store: &Rolodex,
    tenant: &str,
    path: &Path,
    weights: &StrengthWeights,
) -> anyhow::Result<(usize, usize)> {
    let content = std::fs::read_to_string(path)?;
    if content
        .lines()
        .take(5)
        .any(|l| l.to_lowercase().contains("first name"))
    {
        ingest_connections(store, tenant, &content, weights)
    } else {
        ingest_interactions(store, tenant, &content, weights)
    }
}

/// LinkedIn Connections.csv: First Name / Last Name / URL / Email Address /
/// Company / Position / Connected On. Exports prepend a few "Notes:" lines,
/// so the header row is located by scanning. Each row becomes a person plus
/// a `linkedin` relationship to the tenant's self node, timestamped with the
/// connection date.
pub fn ingest_connections(
    store: &Rolodex,
    tenant: &str,
    content: &str,
    weights: &StrengthWeights,
) -> anyhow::Result<(usize, usize)> {
    let mut lines = content.lines();
    let header = loop {
        match lines.next() {
            Some(l) if l.to_lowercase().contains("first name") => break parse_csv_line(l),
            Some(_) => continue,
            None => anyhow::bail!("no header row found (expected a 'First Name' column)"),
        }
    };

    let first = column_index(&header, "First Name");
    let last = column_index(&header, "Last Name");
    let url = column_index(&header, "URL");
    let email = column_index(&header, "Email Address");
    let company = column_index(&header, "Company");
    let connected = column_index(&header, "Connected On");

    let me = store.ensure_self(tenant, "Me")?;
    let mut persons = 0;
    let mut relationships = 0;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(line);
        let get = |i: Option<usize>| -> &str {
            i.and_then(|i| fields.get(i)).map(|s| s.as_str()).unwrap_or("")
        };

        let name = format!("{} {}", get(first), get(last)).trim().to_string();
        if name.is_empty() {
            eprintln!("   Warning: skipping row without a name: {line}");
            continue;
        }

        let org = Some(get(company)).filter(|s| !s.is_empty());
        let id = store.upsert_person(tenant, &name, org)?;
        persons += 1;

        let email_value = get(email);
        if !email_value.is_empty() {
            store.add_email(id, email_value)?;
        }
        if let Some(handle) = linkedin_handle(get(url)) {
            store.add_handle(id, "linkedin", &handle)?;
        }

        let at = parse_connected_on(get(connected)).unwrap_or_else(|| Utc::now().naive_utc());
        store.record_interaction(tenant, me, id, "linkedin", true, at, weights)?;
        relationships += 1;
    }

    Ok((persons, relationships))
}

/// Interaction log CSV: contact, channel, direction (sent|received),
/// timestamp. Each row is one interaction between the tenant's self node
/// and the named contact; unknown contacts are created on the fly.
pub fn ingest_interactions(
    store: &Rolodex,
    tenant: &str,
    content: &str,
    weights: &StrengthWeights,
) -> anyhow::Result<(usize, usize)> {
    let mut lines = content.lines();
    let header = match lines.next() {
        Some(l) => parse_csv_line(l),
        None => anyhow::bail!("empty interaction log"),
    };
    let contact = column_index(&header, "contact")
        .ok_or_else(|| anyhow::anyhow!("missing 'contact' column"))?;
    let channel = column_index(&header, "channel")
        .ok_or_else(|| anyhow::anyhow!("missing 'channel' column"))?;
    let direction = column_index(&header, "direction");
    let timestamp = column_index(&header, "timestamp");

    let me = store.ensure_self(tenant, "Me")?;
    let mut persons = 0;
    let mut interactions = 0;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(line);
        let name = fields.get(contact).map(|s| s.as_str()).unwrap_or("");
        let channel_value = fields.get(channel).map(|s| s.as_str()).unwrap_or("");
        if name.is_empty() || channel_value.is_empty() {
            eprintln!("   Warning: skipping malformed interaction row: {line}");
            continue;
        }

        let id = match store.person_by_name(tenant, name)? {
            Some(p) => p.id,
            None => {
                persons += 1;
                store.upsert_person(tenant, name, None)?
            }
        };

        let sent = direction
            .and_then(|i| fields.get(i))
            .map(|d| !d.eq_ignore_ascii_case("received"))
            .unwrap_or(true);
        let at = timestamp
            .and_then(|i| fields.get(i))
            .and_then(|s| parse_timestamp(s))
            .unwrap_or_else(|| Utc::now().naive_utc());

        store.record_interaction(tenant, me, id, channel_value, sent, at, weights)?;
        interactions += 1;
    }

    Ok((persons, interactions))
}

/// "https://www.linkedin.com/in/jane-doe" → "jane-doe".
fn linkedin_handle(url: &str) -> Option<String> {
    let rest = url.split("/in/").nth(1)?;
    let handle = rest.trim_end_matches('/').trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

/// LinkedIn's "Connected On" format, e.g. "12 Mar 2021".
fn parse_connected_on(s: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(s.trim(), "%d %b %Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
