//! Table writer: one CSV file per normalized table.
//!
//! Tables are staged as `<table>.csv.tmp` next to their final names. Only
//! once every table of the run is staged are they renamed into place, so a
//! failed run leaves the previous set of tables untouched.

use std::fs;
use std::path::{Path, PathBuf};

use schema::Table;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::NormalizedTables;

/// A table written under its temporary name, waiting to be renamed.
#[derive(Debug)]
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

fn tmp_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!("{}.tmp", file_name))
}

fn stage<T>(dir: &Path, rows: &[T]) -> Result<Staged>
where
    T: Table + Serialize,
{
    let path = dir.join(T::file_name());
    let tmp = tmp_path(dir, &T::file_name());

    if let Err(err) = write_rows(&tmp, rows) {
        remove_staged(&tmp);
        return Err(err);
    }

    tracing::debug!(table = T::NAME, rows = rows.len(), tmp = %tmp.display(), "staged table");
    Ok(Staged { tmp, path })
}

fn write_rows<T>(tmp: &Path, rows: &[T]) -> Result<()>
where
    T: Table + Serialize,
{
    let mut writer = csv::Writer::from_path(tmp)?;
    if rows.is_empty() {
        // serde writes the header with the first row only
        writer.write_record(T::COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn remove_staged(tmp: &Path) {
    if tmp.is_file() {
        if let Err(err) = fs::remove_file(tmp) {
            tracing::warn!(path = %tmp.display(), %err, "could not remove staged file");
        }
    }
}

fn stage_all(dir: &Path, tables: &NormalizedTables, staged: &mut Vec<Staged>) -> Result<()> {
    staged.push(stage(dir, tables.players.rows())?);
    staged.push(stage(dir, tables.maps.rows())?);
    staged.push(stage(dir, tables.weapons.rows())?);
    staged.push(stage(dir, tables.matches.rows())?);
    staged.push(stage(dir, tables.rounds.rows())?);
    staged.push(stage(dir, tables.events.rows())?);
    Ok(())
}

fn commit(staged: &[Staged]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(staged.len());
    for table in staged {
        fs::rename(&table.tmp, &table.path)?;
        tracing::info!(path = %table.path.display(), "wrote table");
        paths.push(table.path.clone());
    }
    Ok(paths)
}

/// Write a single table and rename it into place.
pub fn write_table<T>(dir: &Path, rows: &[T]) -> Result<PathBuf>
where
    T: Table + Serialize,
{
    let staged = stage(dir, rows)?;
    fs::rename(&staged.tmp, &staged.path)?;
    Ok(staged.path)
}

/// Write every table in load order, all or nothing. Returns the written paths.
///
/// If any table fails to stage, the tables already staged are removed and the
/// files from the previous run stay as they were.
pub fn write_all(dir: &Path, tables: &NormalizedTables) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut staged = Vec::with_capacity(6);
    if let Err(err) = stage_all(dir, tables, &mut staged) {
        tracing::warn!(staged = staged.len(), "table write failed, previous tables kept");
        for table in &staged {
            remove_staged(&table.tmp);
        }
        return Err(err);
    }

    commit(&staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{event, scenario, A, B};
    use crate::pipeline::run;
    use pretty_assertions::assert_eq;
    use schema::{DamageEvent, Map, Player, LOAD_ORDER};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("etl-writer-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_write_all_in_load_order() {
        let dir = scratch_dir("order");
        let tables = run(&scenario()).unwrap();

        let paths = write_all(&dir, &tables).unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, LOAD_ORDER);
        for path in &paths {
            assert!(path.exists());
        }
        assert!(!dir.join("players.csv.tmp").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_player_file_contents() {
        let dir = scratch_dir("players");
        let tables = run(&scenario()).unwrap();
        write_all(&dir, &tables).unwrap();

        let text = fs::read_to_string(dir.join(Player::file_name())).unwrap();
        assert_eq!(
            text,
            format!("player_id,steam_id,rank\n1,{B},4\n2,{A},5\n")
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_null_reference_written_empty() {
        let dir = scratch_dir("nulls");
        let mut raw = scenario();
        raw.rows.push(event("m1", 2, (A, 5), (B, 4), ""));
        write_all(&dir, &run(&raw).unwrap()).unwrap();

        let mut reader = csv::Reader::from_path(dir.join(DamageEvent::file_name())).unwrap();
        let events: Vec<DamageEvent> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].weapon_id, None);
        assert_eq!(events[3].round_id, Some(2));
        assert_eq!(events[0].bomb_planted, false);

        let text = fs::read_to_string(dir.join(DamageEvent::file_name())).unwrap();
        let line = text.lines().nth(4).unwrap();
        assert!(line.starts_with("4,2,1,2,,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let dir = scratch_dir("empty");
        fs::create_dir_all(&dir).unwrap();

        let rows: Vec<Map> = Vec::new();
        let path = write_table(&dir, &rows).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "map_id,name\n");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_rewrite_replaces_previous_run() {
        let dir = scratch_dir("rewrite");
        let mut raw = scenario();
        raw.rows.push(event("m2", 1, (A, 5), (B, 4), "AWP"));
        write_all(&dir, &run(&raw).unwrap()).unwrap();
        write_all(&dir, &run(&scenario()).unwrap()).unwrap();

        let mut reader = csv::Reader::from_path(dir.join(DamageEvent::file_name())).unwrap();
        assert_eq!(reader.records().count(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_failed_run_keeps_previous_tables() {
        let dir = scratch_dir("atomic");
        let mut raw = scenario();
        raw.rows.push(event("m2", 1, (A, 5), (333, 2), "AWP"));
        write_all(&dir, &run(&raw).unwrap()).unwrap();
        let players_before = fs::read_to_string(dir.join(Player::file_name())).unwrap();
        let events_before = fs::read_to_string(dir.join(DamageEvent::file_name())).unwrap();

        // The last table cannot be staged: its temp name is taken by a directory.
        let blocked = dir.join(format!("{}.tmp", DamageEvent::file_name()));
        fs::create_dir_all(&blocked).unwrap();

        let err = write_all(&dir, &run(&scenario()).unwrap());
        assert!(err.is_err());

        assert_eq!(fs::read_to_string(dir.join(Player::file_name())).unwrap(), players_before);
        assert_eq!(
            fs::read_to_string(dir.join(DamageEvent::file_name())).unwrap(),
            events_before
        );
        for table in LOAD_ORDER.iter().take(5) {
            assert!(!dir.join(format!("{table}.csv.tmp")).exists(), "{table} left staged");
        }

        fs::remove_dir_all(&dir).unwrap();
    }
}
