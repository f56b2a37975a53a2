use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `i` upgrades `user_version` i to i + 1.
const MIGRATIONS: &[(&str, &str)] = &[
    // Base tables for the three telemetry streams.
    ("schema_v1.sql", include_str!("schemas/schema_v1.sql")),
    // Delivery timestamp plus indexes backing the due-reminder and latest-vitals queries.
    ("schema_v2.sql", include_str!("schemas/schema_v2.sql")),
];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("cannot read user_version")?;

    if version < 0 {
        bail!("database reports invalid schema version {version}");
    }
    if version > CURRENT_SCHEMA_VERSION {
        bail!("database version ({version}) is newer than supported schema ({CURRENT_SCHEMA_VERSION})");
    }
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (name, script) in &MIGRATIONS[version as usize..] {
        tx.execute_batch(script)
            .with_context(|| format!("{name} failed"))?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit().context("cannot commit schema upgrade")?;

    Ok(())
}
