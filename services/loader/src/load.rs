//! Chunked bulk insert of the normalized table files.
//!
//! A table is read completely, then inserted with multi-row `INSERT`s inside
//! one transaction. Any failing chunk rolls the whole table back.

use std::path::Path;

use schema::{DamageEvent, Map, Match, Player, Round, Table, Weapon};
use serde::de::DeserializeOwned;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::LoadError;

/// PostgreSQL caps a statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// A table row that can be bound into a multi-row `INSERT`.
/// Binds must follow `Table::COLUMNS` order.
pub trait Insertable: Table + DeserializeOwned + Send + Sync {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

impl Insertable for Player {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.player_id)
            .push_bind(self.steam_id)
            .push_bind(self.rank);
    }
}

impl Insertable for Map {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.map_id).push_bind(self.name.as_str());
    }
}

impl Insertable for Weapon {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.weapon_id)
            .push_bind(self.name.as_str())
            .push_bind(self.category.as_deref());
    }
}

impl Insertable for Match {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.match_id)
            .push_bind(self.demo_file.as_str())
            .push_bind(self.map_id)
            .push_bind(self.played_at)
            .push_bind(self.avg_rank);
    }
}

impl Insertable for Round {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.round_id)
            .push_bind(self.match_id)
            .push_bind(self.round_number)
            .push_bind(self.round_type.as_deref())
            .push_bind(self.winner_side.as_deref())
            .push_bind(self.ct_equipment_value)
            .push_bind(self.t_equipment_value);
    }
}

impl Insertable for DamageEvent {
    fn push_binds<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.event_id)
            .push_bind(self.round_id)
            .push_bind(self.attacker_id)
            .push_bind(self.victim_id)
            .push_bind(self.weapon_id)
            .push_bind(self.tick)
            .push_bind(self.seconds)
            .push_bind(self.hp_damage)
            .push_bind(self.armor_damage)
            .push_bind(self.hitbox.as_deref())
            .push_bind(self.bomb_planted)
            .push_bind(self.award)
            .push_bind(self.attacker_x)
            .push_bind(self.attacker_y)
            .push_bind(self.victim_x)
            .push_bind(self.victim_y);
    }
}

/// Rows per statement: the requested batch size, capped by the bind limit.
pub fn chunk_rows(batch_size: usize, columns: usize) -> usize {
    batch_size.min(MAX_BIND_PARAMS / columns.max(1)).max(1)
}

pub fn insert_prefix<T: Table>() -> String {
    format!("INSERT INTO {} ({}) ", T::NAME, T::COLUMNS.join(", "))
}

pub fn read_rows<T: Insertable>(path: &Path) -> Result<Vec<T>, LoadError> {
    let read_err = |source| LoadError::Read {
        table: T::NAME,
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(read_err)
}

pub async fn insert_rows<T: Insertable>(
    pool: &PgPool,
    rows: &[T],
    batch_size: usize,
) -> Result<u64, LoadError> {
    let chunk = chunk_rows(batch_size, T::COLUMNS.len());
    let prefix = insert_prefix::<T>();
    let fail = |e| LoadError::from_insert(T::NAME, e);

    let mut tx = pool.begin().await.map_err(fail)?;
    let mut inserted: u64 = 0;

    for batch in rows.chunks(chunk) {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(prefix.as_str());
        qb.push_values(batch, |mut b, row| row.push_binds(&mut b));

        let done = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        inserted += done.rows_affected();

        tracing::debug!(
            table = T::NAME,
            inserted,
            total = rows.len(),
            "chunk inserted"
        );
    }

    tx.commit().await.map_err(fail)?;
    Ok(inserted)
}

/// Read `<dir>/<table>.csv` and insert it.
pub async fn load_table<T: Insertable>(
    pool: &PgPool,
    dir: &Path,
    batch_size: usize,
) -> Result<u64, LoadError> {
    let path = dir.join(T::file_name());
    tracing::info!(table = T::NAME, path = %path.display(), "loading table");

    let rows: Vec<T> = read_rows(&path)?;
    let inserted = insert_rows(pool, &rows, batch_size).await?;

    tracing::info!(table = T::NAME, rows = inserted, "table loaded");
    Ok(inserted)
}

/// Load every table in foreign-key order. Stops at the first failing table;
/// tables already committed stay loaded.
pub async fn load_all(
    pool: &PgPool,
    dir: &Path,
    batch_size: usize,
) -> Result<Vec<(&'static str, u64)>, LoadError> {
    Ok(vec![
        (Player::NAME, load_table::<Player>(pool, dir, batch_size).await?),
        (Map::NAME, load_table::<Map>(pool, dir, batch_size).await?),
        (Weapon::NAME, load_table::<Weapon>(pool, dir, batch_size).await?),
        (Match::NAME, load_table::<Match>(pool, dir, batch_size).await?),
        (Round::NAME, load_table::<Round>(pool, dir, batch_size).await?),
        (
            DamageEvent::NAME,
            load_table::<DamageEvent>(pool, dir, batch_size).await?,
        ),
    ])
}
