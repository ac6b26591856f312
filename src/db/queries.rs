//! Database query implementations
//!
//! Contains functions for storing and reading scans and cached releases

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension};

use super::DbError;
use crate::deprecation::ScanSummary;
use crate::models::scan::{ScanDiff, ScanPackageRecord, ScanRecord};
use crate::registry::ReleaseInfo;

/// Store a scan and its package rows, returning the new scan id
pub fn insert_scan(
    conn: &Connection,
    source: &str,
    summary: &ScanSummary,
    packages: &[ScanPackageRecord],
) -> Result<i64, DbError> {
    let tx = conn.unchecked_transaction()?;
    let created_at = chrono::Utc::now().to_rfc3339();

    tx.execute(
        r#"
        INSERT INTO scans (created_at, source, total, deprecated, warnings, healthy)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            created_at,
            source,
            summary.total,
            summary.deprecated,
            summary.warnings,
            summary.healthy
        ],
    )?;
    let scan_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            r#"
            INSERT OR REPLACE INTO scan_packages (
                scan_id, name, version, state, reason, warnings,
                target_version, risk_level, risk_score
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )?;

        let mut seen = HashSet::new();
        for package in packages {
            if !seen.insert(package.name.as_str()) {
                tracing::warn!(
                    "Scan {} lists {} more than once; keeping {}",
                    scan_id,
                    package.name,
                    package.version
                );
            }
            stmt.execute(params![
                scan_id,
                package.name,
                package.version,
                package.state,
                package.reason,
                serde_json::to_string(&package.warnings)?,
                package.target_version,
                package.risk_level,
                package.risk_score
            ])?;
        }
    }

    tx.commit()?;
    tracing::info!("Stored scan {} ({} packages)", scan_id, packages.len());
    Ok(scan_id)
}

fn scan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanRecord> {
    Ok(ScanRecord {
        id: row.get(0)?,
        created_at: row.get(1)?,
        source: row.get(2)?,
        total: row.get(3)?,
        deprecated: row.get(4)?,
        warnings: row.get(5)?,
        healthy: row.get(6)?,
    })
}

/// Most recent scans first
pub fn get_scans(conn: &Connection, limit: Option<u32>) -> Result<Vec<ScanRecord>, DbError> {
    let limit = limit.unwrap_or(20);

    let mut stmt = conn.prepare(
        r#"
        SELECT id, created_at, source, total, deprecated, warnings, healthy
        FROM scans
        ORDER BY id DESC
        LIMIT ?1
        "#,
    )?;

    let scans = stmt
        .query_map(params![limit], scan_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(scans)
}

/// Get a single scan by id
pub fn get_scan(conn: &Connection, scan_id: i64) -> Result<Option<ScanRecord>, DbError> {
    let scan = conn
        .query_row(
            r#"
            SELECT id, created_at, source, total, deprecated, warnings, healthy
            FROM scans
            WHERE id = ?1
            "#,
            params![scan_id],
            scan_from_row,
        )
        .optional()?;

    Ok(scan)
}

/// Package rows of a scan, ordered by name
pub fn get_scan_packages(conn: &Connection, scan_id: i64) -> Result<Vec<ScanPackageRecord>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT scan_id, name, version, state, reason, warnings,
               target_version, risk_level, risk_score
        FROM scan_packages
        WHERE scan_id = ?1
        ORDER BY name
        "#,
    )?;

    let rows = stmt
        .query_map(params![scan_id], |row| {
            Ok((
                ScanPackageRecord {
                    scan_id: row.get(0)?,
                    name: row.get(1)?,
                    version: row.get(2)?,
                    state: row.get(3)?,
                    reason: row.get(4)?,
                    warnings: Vec::new(),
                    target_version: row.get(6)?,
                    risk_level: row.get(7)?,
                    risk_score: row.get(8)?,
                },
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(mut package, warnings)| {
            package.warnings = serde_json::from_str(&warnings)?;
            Ok(package)
        })
        .collect()
}

/// Compare two stored scans
pub fn compare_scans(conn: &Connection, older_id: i64, newer_id: i64) -> Result<ScanDiff, DbError> {
    for id in [older_id, newer_id] {
        if get_scan(conn, id)?.is_none() {
            return Err(DbError::ScanNotFound(id));
        }
    }

    let older: HashMap<String, ScanPackageRecord> = get_scan_packages(conn, older_id)?
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();
    let newer = get_scan_packages(conn, newer_id)?;

    let mut diff = ScanDiff {
        older_scan_id: older_id,
        newer_scan_id: newer_id,
        ..Default::default()
    };

    for package in &newer {
        let now_deprecated = package.state == "deprecated";
        match older.get(&package.name) {
            Some(previous) => {
                let was_deprecated = previous.state == "deprecated";
                if now_deprecated && !was_deprecated {
                    diff.newly_deprecated.push(package.name.clone());
                } else if was_deprecated && !now_deprecated {
                    diff.resolved.push(package.name.clone());
                }
                if previous.version != package.version {
                    diff.version_changes.push((
                        package.name.clone(),
                        previous.version.clone(),
                        package.version.clone(),
                    ));
                }
            }
            None => {
                diff.added.push(package.name.clone());
                if now_deprecated {
                    diff.newly_deprecated.push(package.name.clone());
                }
            }
        }
    }

    let newer_names: std::collections::HashSet<&str> =
        newer.iter().map(|p| p.name.as_str()).collect();
    for previous in older.values() {
        if newer_names.contains(previous.name.as_str()) {
            continue;
        }
        if previous.state == "deprecated" {
            diff.resolved.push(previous.name.clone());
        }
        diff.removed.push(previous.name.clone());
    }

    diff.removed.sort();
    diff.resolved.sort();

    Ok(diff)
}

/// Compare the two most recent scans, `None` with fewer than two scans
pub fn compare_latest_scans(conn: &Connection) -> Result<Option<ScanDiff>, DbError> {
    let latest = get_scans(conn, Some(2))?;
    match latest.as_slice() {
        [newer, older] => compare_scans(conn, older.id, newer.id).map(Some),
        _ => Ok(None),
    }
}

/// Cached index data for a package if younger than `ttl_secs`
pub fn get_cached_release(
    conn: &Connection,
    name: &str,
    ttl_secs: u64,
) -> Result<Option<ReleaseInfo>, DbError> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT fetched_at, data FROM release_cache WHERE name = ?1",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((fetched_at, data)) = row else {
        return Ok(None);
    };

    let age = chrono::Utc::now().timestamp() - fetched_at;
    if age < 0 || age as u64 >= ttl_secs {
        return Ok(None);
    }

    match serde_json::from_str(&data) {
        Ok(info) => Ok(Some(info)),
        Err(e) => {
            tracing::warn!("Discarding unreadable cache entry for {}: {}", name, e);
            Ok(None)
        }
    }
}

/// Store index data for a package
pub fn put_cached_release(conn: &Connection, name: &str, info: &ReleaseInfo) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO release_cache (name, fetched_at, data)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(name) DO UPDATE SET
            fetched_at = excluded.fetched_at,
            data = excluded.data
        "#,
        params![name, chrono::Utc::now().timestamp(), serde_json::to_string(info)?],
    )?;
    Ok(())
}

/// Delete cache entries older than `ttl_secs`, returning how many were removed
pub fn prune_release_cache(conn: &Connection, ttl_secs: u64) -> Result<usize, DbError> {
    let cutoff = chrono::Utc::now().timestamp() - ttl_secs as i64;
    let removed = conn.execute(
        "DELETE FROM release_cache WHERE fetched_at <= ?1",
        params![cutoff],
    )?;
    Ok(removed)
}
