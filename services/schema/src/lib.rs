//! Normalized CS:GO matchmaking schema
//!
//! Row types shared by the ETL writer and the bulk loader. Field order is
//! column order: the CSV header written by the ETL and the column list used by
//! the loader both come from here, so the two stages cannot drift apart.
//!
//! Load order follows the foreign keys:
//!   players, maps, weapons -> matches -> rounds -> damage_events

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod timestamp;

/// Surrogate key. Dense, starts at 1, assigned during extraction.
pub type Id = i32;

/// A normalized table: its SQL/file name and column order.
pub trait Table {
    const NAME: &'static str;
    const COLUMNS: &'static [&'static str];

    fn file_name() -> String {
        format!("{}.csv", Self::NAME)
    }
}

/// Table names in foreign-key dependency order.
pub const LOAD_ORDER: &[&str] = &[
    Player::NAME,
    Map::NAME,
    Weapon::NAME,
    Match::NAME,
    Round::NAME,
    DamageEvent::NAME,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: Id,
    pub steam_id: i64,
    /// Last observed skill rank (0..=18)
    pub rank: Option<i32>,
}

impl Table for Player {
    const NAME: &'static str = "players";
    const COLUMNS: &'static [&'static str] = &["player_id", "steam_id", "rank"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub map_id: Id,
    pub name: String,
}

impl Table for Map {
    const NAME: &'static str = "maps";
    const COLUMNS: &'static [&'static str] = &["map_id", "name"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub weapon_id: Id,
    pub name: String,
    pub category: Option<String>,
}

impl Table for Weapon {
    const NAME: &'static str = "weapons";
    const COLUMNS: &'static [&'static str] = &["weapon_id", "name", "category"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: Id,
    /// Demo file the match was recorded in (natural key)
    pub demo_file: String,
    pub map_id: Option<Id>,
    #[serde(with = "timestamp::option")]
    pub played_at: Option<NaiveDateTime>,
    pub avg_rank: Option<f64>,
}

impl Table for Match {
    const NAME: &'static str = "matches";
    const COLUMNS: &'static [&'static str] =
        &["match_id", "demo_file", "map_id", "played_at", "avg_rank"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: Id,
    pub match_id: Id,
    pub round_number: i32,
    pub round_type: Option<String>,
    pub winner_side: Option<String>,
    pub ct_equipment_value: Option<i32>,
    pub t_equipment_value: Option<i32>,
}

impl Table for Round {
    const NAME: &'static str = "rounds";
    const COLUMNS: &'static [&'static str] = &[
        "round_id",
        "match_id",
        "round_number",
        "round_type",
        "winner_side",
        "ct_equipment_value",
        "t_equipment_value",
    ];
}

/// Fact row: one damage event. References are null when the natural key
/// could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub event_id: Id,
    pub round_id: Option<Id>,
    pub attacker_id: Option<Id>,
    pub victim_id: Option<Id>,
    pub weapon_id: Option<Id>,
    pub tick: Option<i32>,
    pub seconds: Option<f64>,
    pub hp_damage: Option<i32>,
    pub armor_damage: Option<i32>,
    pub hitbox: Option<String>,
    pub bomb_planted: bool,
    pub award: Option<i32>,
    pub attacker_x: Option<f64>,
    pub attacker_y: Option<f64>,
    pub victim_x: Option<f64>,
    pub victim_y: Option<f64>,
}

impl Table for DamageEvent {
    const NAME: &'static str = "damage_events";
    const COLUMNS: &'static [&'static str] = &[
        "event_id",
        "round_id",
        "attacker_id",
        "victim_id",
        "weapon_id",
        "tick",
        "seconds",
        "hp_damage",
        "armor_damage",
        "hitbox",
        "bomb_planted",
        "award",
        "attacker_x",
        "attacker_y",
        "victim_x",
        "victim_y",
    ];
}
