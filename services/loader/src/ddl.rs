//! Database schema. Recreated from scratch on every load.

use sqlx::PgPool;

use crate::error::LoadError;

/// Drops children before parents, then creates parents before children.
/// Foreign keys on damage_events and matches.map_id are nullable: rows whose
/// natural key could not be resolved are loaded with a null reference.
pub const SCHEMA_DDL: &str = r#"
DROP TABLE IF EXISTS damage_events CASCADE;
DROP TABLE IF EXISTS rounds CASCADE;
DROP TABLE IF EXISTS matches CASCADE;
DROP TABLE IF EXISTS weapons CASCADE;
DROP TABLE IF EXISTS maps CASCADE;
DROP TABLE IF EXISTS players CASCADE;

CREATE TABLE players (
    player_id INTEGER PRIMARY KEY,
    steam_id BIGINT NOT NULL UNIQUE,
    rank INTEGER CHECK (rank BETWEEN 0 AND 18)
);

CREATE TABLE maps (
    map_id INTEGER PRIMARY KEY,
    name VARCHAR(50) NOT NULL UNIQUE
);

CREATE TABLE weapons (
    weapon_id INTEGER PRIMARY KEY,
    name VARCHAR(50) NOT NULL UNIQUE,
    category VARCHAR(20)
);

CREATE TABLE matches (
    match_id INTEGER PRIMARY KEY,
    demo_file VARCHAR(100) NOT NULL UNIQUE,
    map_id INTEGER REFERENCES maps(map_id),
    played_at TIMESTAMP,
    avg_rank DOUBLE PRECISION
);

CREATE TABLE rounds (
    round_id INTEGER PRIMARY KEY,
    match_id INTEGER NOT NULL REFERENCES matches(match_id),
    round_number INTEGER NOT NULL CHECK (round_number > 0),
    round_type VARCHAR(20),
    winner_side VARCHAR(20),
    ct_equipment_value INTEGER,
    t_equipment_value INTEGER,
    UNIQUE (match_id, round_number)
);

CREATE TABLE damage_events (
    event_id INTEGER PRIMARY KEY,
    round_id INTEGER REFERENCES rounds(round_id),
    attacker_id INTEGER REFERENCES players(player_id),
    victim_id INTEGER REFERENCES players(player_id),
    weapon_id INTEGER REFERENCES weapons(weapon_id),
    tick INTEGER,
    seconds DOUBLE PRECISION,
    hp_damage INTEGER CHECK (hp_damage >= 0),
    armor_damage INTEGER CHECK (armor_damage >= 0),
    hitbox VARCHAR(20),
    bomb_planted BOOLEAN NOT NULL DEFAULT FALSE,
    award INTEGER,
    attacker_x DOUBLE PRECISION,
    attacker_y DOUBLE PRECISION,
    victim_x DOUBLE PRECISION,
    victim_y DOUBLE PRECISION
);

CREATE INDEX idx_matches_map ON matches(map_id);
CREATE INDEX idx_rounds_match ON rounds(match_id);
CREATE INDEX idx_events_round ON damage_events(round_id);
CREATE INDEX idx_events_attacker ON damage_events(attacker_id);
CREATE INDEX idx_events_victim ON damage_events(victim_id);
CREATE INDEX idx_events_weapon ON damage_events(weapon_id);
"#;

pub async fn create_schema(pool: &PgPool) -> Result<(), LoadError> {
    let mut tx = pool.begin().await.map_err(LoadError::from_schema)?;
    sqlx::raw_sql(SCHEMA_DDL)
        .execute(&mut *tx)
        .await
        .map_err(LoadError::from_schema)?;
    tx.commit().await.map_err(LoadError::from_schema)?;

    tracing::info!("schema created");
    Ok(())
}
