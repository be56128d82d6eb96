//! Event normalization: one fact row per source row.
//!
//! References are resolved through the upstream key maps. A reference that
//! cannot be resolved is written as null and counted; the row itself is kept.

use schema::{DamageEvent, Id, Table};

use crate::error::{EtlError, Result};
use crate::extract::{Matches, Players, Rounds, Weapons};
use crate::raw::{RawDataset, RawEvent};

/// Null references written into the fact table, per kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedRefs {
    pub round: usize,
    pub attacker: usize,
    pub victim: usize,
    pub weapon: usize,
    /// Negative hp/armor damage values replaced by null
    pub negative_damage: usize,
}

impl UnresolvedRefs {
    pub fn total(&self) -> usize {
        self.round + self.attacker + self.victim + self.weapon
    }
}

#[derive(Debug, Clone)]
pub struct Events {
    rows: Vec<DamageEvent>,
    unresolved: UnresolvedRefs,
}

impl Events {
    pub fn rows(&self) -> &[DamageEvent] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<DamageEvent> {
        self.rows
    }

    pub fn unresolved(&self) -> UnresolvedRefs {
        self.unresolved
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Upstream tables the fact rows point into.
#[derive(Debug, Clone, Copy)]
pub struct Dimensions<'a> {
    pub matches: &'a Matches,
    pub rounds: &'a Rounds,
    pub players: &'a Players,
    pub weapons: &'a Weapons,
}

impl Dimensions<'_> {
    /// demo file -> match id -> (match id, round number) -> round id
    fn round_of(&self, row: &RawEvent) -> Option<Id> {
        let match_id = self.matches.id_of(row.file.as_deref()?)?;
        self.rounds.id_of(&(match_id, row.round?))
    }

    fn player_of(&self, steam_id: Option<i64>) -> Option<Id> {
        self.players.id_of(&steam_id?)
    }

    fn weapon_of(&self, row: &RawEvent) -> Option<Id> {
        self.weapons.id_of(row.wp.as_deref()?)
    }
}

pub fn normalize_events(raw: &RawDataset, dims: Dimensions<'_>) -> Result<Events> {
    let mut unresolved = UnresolvedRefs::default();
    let mut rows = Vec::with_capacity(raw.len());

    for (idx, row) in raw.rows.iter().enumerate() {
        let event_id = Id::try_from(idx + 1).map_err(|_| EtlError::IdOverflow {
            table: DamageEvent::NAME,
        })?;

        let round_id = resolved(dims.round_of(row), &mut unresolved.round);
        let attacker_id = resolved(dims.player_of(row.att_id), &mut unresolved.attacker);
        let victim_id = resolved(dims.player_of(row.vic_id), &mut unresolved.victim);
        let weapon_id = resolved(dims.weapon_of(row), &mut unresolved.weapon);

        if round_id.is_none() {
            tracing::debug!(event_id, file = ?row.file, round = ?row.round, "round unresolved");
        }

        rows.push(DamageEvent {
            event_id,
            round_id,
            attacker_id,
            victim_id,
            weapon_id,
            tick: row.tick,
            seconds: row.seconds,
            hp_damage: non_negative(row.hp_dmg, &mut unresolved.negative_damage),
            armor_damage: non_negative(row.arm_dmg, &mut unresolved.negative_damage),
            hitbox: row.hitbox.clone(),
            bomb_planted: row.is_bomb_planted.unwrap_or(false),
            award: row.award,
            attacker_x: row.att_pos_x,
            attacker_y: row.att_pos_y,
            victim_x: row.vic_pos_x,
            victim_y: row.vic_pos_y,
        });
    }

    if unresolved.total() > 0 || unresolved.negative_damage > 0 {
        tracing::warn!(
            round = unresolved.round,
            attacker = unresolved.attacker,
            victim = unresolved.victim,
            weapon = unresolved.weapon,
            negative_damage = unresolved.negative_damage,
            "damage events written with null values"
        );
    }
    tracing::info!(count = rows.len(), "normalized damage events");

    Ok(Events { rows, unresolved })
}

fn resolved(id: Option<Id>, misses: &mut usize) -> Option<Id> {
    if id.is_none() {
        *misses += 1;
    }
    id
}

fn non_negative(value: Option<i32>, rejected: &mut usize) -> Option<i32> {
    match value {
        Some(v) if v < 0 => {
            *rejected += 1;
            None
        }
        other => other,
    }
}
