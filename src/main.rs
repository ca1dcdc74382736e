mod config;
mod contact;
mod db;
mod fuzzy;
mod graph;
mod import;
mod pathfinder;
mod paths;
mod resolve;
mod strength;

use clap::{Parser, Subcommand};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::contact::Person;
use crate::pathfinder::PathQuery;
use crate::resolve::Recommendation;

#[derive(Parser)]
#[command(
    name = "rolo",
    version,
    about = "Your rolodex, with pathfinding: who you know, and who can introduce you."
)]
struct Cli {
    /// Path to the contact database
    #[arg(long, default_value = "rolo.db")]
    db: PathBuf,

    /// Tenant to operate on (defaults to the configured tenant)
    #[arg(long)]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a LinkedIn connections export or an interaction-log CSV
    Import { file: PathBuf },
    /// Find warm introduction paths to a person
    Path {
        /// Target person (name or alias)
        to: String,
        /// Start person; defaults to your own node
        #[arg(long)]
        from: Option<String>,
        /// Maximum chain length in hops
        #[arg(long)]
        max_hops: Option<usize>,
        /// Number of paths to return
        #[arg(long)]
        max_results: Option<usize>,
        /// Ignore edges weaker than this
        #[arg(long)]
        min_strength: Option<f64>,
    },
    /// Show everything known about a person
    About { person: String },
    /// Record contact details for a person, creating them if needed
    Add {
        person: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Social handle as platform=value, e.g. linkedin=jane-doe
        #[arg(long)]
        handle: Option<String>,
        /// Alternate name this person also goes by
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        org: Option<String>,
    },
    /// Find likely duplicate person records
    Dupes {
        /// Check one person against all others; omit to scan everyone
        person: Option<String>,
        /// Merge the auto-merge recommendations
        #[arg(long)]
        apply: bool,
    },
    /// Recompute all relationship strengths from stored interaction data
    Rescore,
    /// Show database statistics
    Stats,
    /// Generate default config at ~/.rolo/config.toml
    Init,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle init before loading config (it creates the config file).
    if matches!(cli.command, Commands::Init) {
        let path = config::Config::write_default()?;
        println!("✅ Default config written to {}", path.display());
        return Ok(());
    }

    let cfg = config::Config::load()?;
    let db_path = if cli.db == std::path::Path::new("rolo.db") {
        PathBuf::from(&cfg.db_path)
    } else {
        cli.db.clone()
    };
    let tenant = cli.tenant.clone().unwrap_or_else(|| cfg.default_tenant.clone());
    let store = db::Rolodex::open(&db_path)?;
    let weights = cfg.strength.to_weights();

    match cli.command {
        Commands::Import { file } => {
            println!("📥 Importing: {}", file.display());
            let (persons, interactions) = import::ingest_file(&store, &tenant, &file, &weights)?;
            println!("   Touched {persons} persons, {interactions} interactions");
        }
        Commands::Path {
            to,
            from,
            max_hops,
            max_results,
            min_strength,
        } => {
            let mut query: PathQuery = cfg.search.to_query();
            if let Some(h) = max_hops {
                query.max_hops = h;
            }
            if let Some(r) = max_results {
                query.max_results = r;
            }
            if let Some(s) = min_strength {
                query.min_strength = s;
            }

            let from_id = match from {
                Some(name) => match store.person_by_name(&tenant, &name)? {
                    Some(p) => p.id,
                    None => {
                        println!("🤷 I don't know \"{name}\".");
                        return Ok(());
                    }
                },
                None => match store.self_person(&tenant)? {
                    Some(id) => id,
                    None => {
                        println!(
                            "🤷 No self node yet. Import some data first, or pass --from."
                        );
                        return Ok(());
                    }
                },
            };
            let target = match store.person_by_name(&tenant, &to)? {
                Some(p) => p,
                None => {
                    println!("🤷 I don't know \"{to}\".");
                    return Ok(());
                }
            };

            let provider = store.scoped(&tenant);
            let ranked = pathfinder::find_warm_paths(&provider, from_id, target.id, &query)?;
            if ranked.is_empty() {
                println!("🤷 No warm path to \"{}\" within {} hops.", to, query.max_hops);
            } else {
                let names = name_lookup(&store.list_persons(&tenant)?);
                println!("🧭 Paths to {}:\n", target.name());
                for r in &ranked {
                    println!("  {}. [{:.0}%] {}", r.rank, r.score * 100.0, r.explanation);
                    let chain: Vec<String> = r
                        .path
                        .nodes
                        .iter()
                        .map(|id| names.get(id).cloned().unwrap_or_else(|| format!("person {id}")))
                        .collect();
                    println!("     {}", chain.join(" → "));
                }
            }
        }
        Commands::About { person } => {
            let p = match store.person_by_name(&tenant, &person)? {
                Some(p) => p,
                None => {
                    println!("🤷 I don't know \"{person}\".");
                    return Ok(());
                }
            };
            println!("📇 {}:\n", p.name());
            if p.display_names.len() > 1 {
                println!("  Also known as: {}", p.display_names[1..].join(", "));
            }
            if let Some(org) = &p.attributes.organization {
                println!("  Organization:  {org}");
            }
            for email in &p.attributes.emails {
                println!("  Email:         {email}");
            }
            for phone in &p.attributes.phones {
                println!("  Phone:         {phone}");
            }
            for (platform, value) in &p.attributes.social_handles {
                println!("  {platform}:      {value}");
            }
            let names = name_lookup(&store.list_persons(&tenant)?);
            let mut rels: Vec<_> = store
                .list_relationships(&tenant)?
                .into_iter()
                .filter(|r| r.from_id == p.id || r.to_id == p.id)
                .collect();
            rels.sort_by(|a, b| {
                b.weight
                    .partial_cmp(&a.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            if !rels.is_empty() {
                println!("\n  Relationships:");
                for r in rels {
                    let other = if r.from_id == p.id { r.to_id } else { r.from_id };
                    let other_name = names
                        .get(&other)
                        .cloned()
                        .unwrap_or_else(|| format!("person {other}"));
                    println!(
                        "    [{:.0}%] {} ({})",
                        r.weight.unwrap_or(0.5) * 100.0,
                        other_name,
                        r.channels.join(", ")
                    );
                }
            }
        }
        Commands::Add {
            person,
            email,
            phone,
            handle,
            alias,
            org,
        } => {
            let id = store.upsert_person(&tenant, &person, org.as_deref())?;
            if let Some(e) = &email {
                store.add_email(id, e)?;
            }
            if let Some(p) = &phone {
                store.add_phone(id, p)?;
            }
            if let Some(h) = &handle {
                match h.split_once('=') {
                    Some((platform, value)) if !platform.is_empty() && !value.is_empty() => {
                        store.add_handle(id, platform, value)?;
                    }
                    _ => {
                        println!("🤷 Handles look like platform=value, e.g. linkedin=jane-doe.");
                        return Ok(());
                    }
                }
            }
            if let Some(a) = &alias {
                store.add_alias(id, a)?;
            }
            println!("✅ Updated {person}");
        }
        Commands::Dupes { person, apply } => {
            let persons = store.list_persons(&tenant)?;
            let matches = match person {
                Some(name) => match store.person_by_name(&tenant, &name)? {
                    Some(target) => resolve::find_matches(&target, &persons),
                    None => {
                        println!("🤷 I don't know \"{name}\".");
                        return Ok(());
                    }
                },
                None => {
                    // Full scan; keep each unordered pair once.
                    let mut all = Vec::new();
                    for target in &persons {
                        for m in resolve::find_matches(target, &persons) {
                            if m.target_id < m.candidate_id {
                                all.push(m);
                            }
                        }
                    }
                    all.sort_by(|a, b| {
                        b.score
                            .partial_cmp(&a.score)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    all
                }
            };

            if matches.is_empty() {
                println!("✨ No likely duplicates found.");
                return Ok(());
            }

            let names = name_lookup(&persons);
            println!("👥 Possible duplicates:\n");
            for m in &matches {
                let t = names.get(&m.target_id).cloned().unwrap_or_default();
                let c = names.get(&m.candidate_id).cloned().unwrap_or_default();
                println!(
                    "  [{:.0}%] {} ↔ {} ({}, {})",
                    m.score * 100.0,
                    t,
                    c,
                    m.method.as_str(),
                    m.recommendation.as_str()
                );
                for e in &m.evidence {
                    println!(
                        "         {}: \"{}\" vs \"{}\" [{:.0}%]",
                        e.field,
                        e.target_value,
                        e.candidate_value,
                        e.similarity * 100.0
                    );
                }
            }

            if apply {
                let mut merged: HashSet<i64> = HashSet::new();
                let mut count = 0;
                for m in &matches {
                    if m.recommendation != Recommendation::AutoMerge {
                        continue;
                    }
                    if merged.contains(&m.target_id) || merged.contains(&m.candidate_id) {
                        continue;
                    }
                    store.merge_persons(&tenant, m.target_id, m.candidate_id, &weights)?;
                    merged.insert(m.candidate_id);
                    count += 1;
                }
                println!("\n🧹 Merged {count} duplicate records");
            }
        }
        Commands::Rescore => {
            let updated = store.rescore_tenant(&tenant, &weights)?;
            println!("⚖️  Rescored {updated} relationships");
        }
        Commands::Stats => {
            let stats = store.stats()?;
            println!("📊 Database statistics:\n");
            println!("  Persons:       {}", stats.person_count);
            println!("  Relationships: {}", stats.relationship_count);
            println!("  Tenants:       {}", stats.tenant_count);
            println!("  DB size:       {}", stats.db_size);
        }
        Commands::Init => unreachable!(),
    }
    Ok(())
}

fn name_lookup(persons: &[Person]) -> HashMap<i64, String> {
    persons
        .iter()
        .map(|p| (p.id, p.name().to_string()))
        .collect()
}
