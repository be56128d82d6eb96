//! Entity extraction: players, maps, weapons, matches, rounds.
//!
//! Each table is deduplicated on its natural key and numbered 1..N by the
//! table's [`KeyMap`]. Tables that reference another one take it as a
//! parameter, so `matches` cannot be built before `maps`, nor `rounds` before
//! `matches`.

use std::collections::HashSet;
use std::hash::Hash;

use schema::{timestamp, Id, Map, Match, Player, Round, Table, Weapon};

use crate::error::Result;
use crate::keymap::KeyMap;
use crate::raw::RawDataset;

/// Valid matchmaking skill groups (0 = unranked, 18 = Global Elite)
pub const RANK_RANGE: std::ops::RangeInclusive<i32> = 0..=18;

/// Round identity: (match id, round number)
pub type RoundKey = (Id, i32);

/// Extracted rows plus the key map that numbered them.
#[derive(Debug, Clone)]
pub struct EntityTable<K, R> {
    rows: Vec<R>,
    keys: KeyMap<K>,
}

pub type Players = EntityTable<i64, Player>;
pub type Maps = EntityTable<String, Map>;
pub type Weapons = EntityTable<String, Weapon>;
pub type Matches = EntityTable<String, Match>;
pub type Rounds = EntityTable<RoundKey, Round>;

impl<K, R> EntityTable<K, R>
where
    K: Eq + Hash + Clone,
    R: Table,
{
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            keys: KeyMap::new(R::NAME),
        }
    }

    /// Allocate an id for a key not seen before and store the row built for it.
    fn push(&mut self, key: K, build: impl FnOnce(Id) -> R) -> Result<Id> {
        let (id, _) = self.keys.get_or_insert(key)?;
        self.rows.push(build(id));
        Ok(id)
    }
}

impl<K, R> EntityTable<K, R>
where
    K: Eq + Hash + Clone,
{
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn keys(&self) -> &KeyMap<K> {
        &self.keys
    }

    pub fn id_of<Q>(&self, key: &Q) -> Option<Id>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.keys.id_of(key)
    }

    pub fn row(&self, id: Id) -> Option<&R> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Players seen as attacker or victim, one row per steam id.
///
/// Sightings are taken row by row (attacker, then victim) and the last one
/// wins, so `rank` is the most recently observed rank. Ids follow the order of
/// those last sightings.
///
/// The interleaving is deliberate. Walking every attacker column first and
/// then every victim column gives a different answer when a player's rank
/// changes: with `A(5) -> B(3)` twice followed by `B(4) -> A(5)`, B must end on
/// rank 4 (its latest row), not on 3 (its latest victim sighting).
pub fn extract_players(raw: &RawDataset) -> Result<Players> {
    let sightings = raw
        .rows
        .iter()
        .flat_map(|row| [(row.att_id, row.att_rank), (row.vic_id, row.vic_rank)])
        .filter_map(|(steam_id, rank)| steam_id.map(|id| (id, rank)));

    let mut seen = HashSet::new();
    let mut last: Vec<(i64, Option<i32>)> = sightings
        .rev()
        .filter(|(steam_id, _)| seen.insert(*steam_id))
        .collect();
    last.reverse();

    let mut players = Players::new();
    let mut out_of_range = 0usize;

    for (steam_id, rank) in last {
        let rank = match rank {
            Some(r) if !RANK_RANGE.contains(&r) => {
                tracing::warn!(steam_id, rank = r, "rank out of range, stored as null");
                out_of_range += 1;
                None
            }
            other => other,
        };
        players.push(steam_id, |player_id| Player {
            player_id,
            steam_id,
            rank,
        })?;
    }

    tracing::info!(count = players.len(), out_of_range, "extracted players");
    Ok(players)
}

/// Distinct map names in first-appearance order.
pub fn extract_maps(raw: &RawDataset) -> Result<Maps> {
    let mut maps = Maps::new();

    for name in raw.rows.iter().filter_map(|row| row.map.as_deref()) {
        if maps.id_of(name).is_some() {
            continue;
        }
        maps.push(name.to_string(), |map_id| Map {
            map_id,
            name: name.to_string(),
        })?;
    }

    tracing::info!(count = maps.len(), "extracted maps");
    Ok(maps)
}

/// Distinct (name, category) weapons in first-appearance order.
///
/// Names are unique in the weapon table; if a name shows up later with a
/// different category, the first pair is kept and the conflict is logged.
pub fn extract_weapons(raw: &RawDataset) -> Result<Weapons> {
    let mut weapons = Weapons::new();
    let mut conflicts: HashSet<(&str, Option<&str>)> = HashSet::new();

    for row in &raw.rows {
        let Some(name) = row.wp.as_deref() else {
            continue;
        };
        let category = row.wp_type.as_deref();

        if let Some(id) = weapons.id_of(name) {
            let known = weapons.row(id).and_then(|w| w.category.as_deref());
            if known != category && conflicts.insert((name, category)) {
                tracing::warn!(
                    weapon = name,
                    kept = ?known,
                    ignored = ?category,
                    "weapon seen with a second category"
                );
            }
            continue;
        }

        weapons.push(name.to_string(), |weapon_id| Weapon {
            weapon_id,
            name: name.to_string(),
            category: category.map(str::to_string),
        })?;
    }

    tracing::info!(
        count = weapons.len(),
        category_conflicts = conflicts.len(),
        "extracted weapons"
    );
    Ok(weapons)
}

/// One match per demo file, map resolved through `maps`.
pub fn extract_matches(raw: &RawDataset, maps: &Maps) -> Result<Matches> {
    let mut matches = Matches::new();
    let mut unresolved_maps = 0usize;
    let mut bad_dates = 0usize;

    for row in &raw.rows {
        let Some(file) = row.file.as_deref() else {
            continue;
        };
        if matches.id_of(file).is_some() {
            continue;
        }

        let map_id = row.map.as_deref().and_then(|name| maps.id_of(name));
        if map_id.is_none() {
            tracing::warn!(demo_file = file, map = ?row.map, "match map unresolved");
            unresolved_maps += 1;
        }

        let played_at = row.date.as_deref().and_then(|text| {
            let parsed = timestamp::parse(text);
            if parsed.is_none() {
                tracing::warn!(demo_file = file, date = text, "unrecognised match date");
                bad_dates += 1;
            }
            parsed
        });

        matches.push(file.to_string(), |match_id| Match {
            match_id,
            demo_file: file.to_string(),
            map_id,
            played_at,
            avg_rank: row.avg_match_rank,
        })?;
    }

    tracing::info!(
        count = matches.len(),
        unresolved_maps,
        bad_dates,
        "extracted matches"
    );
    Ok(matches)
}

/// One round per (demo file, round number), match resolved through `matches`.
///
/// Round identity includes its match, so a row whose match cannot be resolved,
/// or whose round number is missing or not positive, produces no round.
pub fn extract_rounds(raw: &RawDataset, matches: &Matches) -> Result<Rounds> {
    let mut rounds = Rounds::new();
    let mut invalid_numbers = 0usize;
    let mut unresolved_matches = 0usize;

    for row in &raw.rows {
        let Some(file) = row.file.as_deref() else {
            unresolved_matches += 1;
            continue;
        };
        let round_number = match row.round {
            Some(n) if n > 0 => n,
            _ => {
                invalid_numbers += 1;
                continue;
            }
        };
        let Some(match_id) = matches.id_of(file) else {
            unresolved_matches += 1;
            continue;
        };

        let key = (match_id, round_number);
        if rounds.id_of(&key).is_some() {
            continue;
        }

        rounds.push(key, |round_id| Round {
            round_id,
            match_id,
            round_number,
            round_type: row.round_type.clone(),
            winner_side: row.winner_side.clone(),
            ct_equipment_value: row.ct_eq_val,
            t_equipment_value: row.t_eq_val,
        })?;
    }

    if invalid_numbers > 0 || unresolved_matches > 0 {
        tracing::warn!(
            invalid_numbers,
            unresolved_matches,
            "source rows without a valid round"
        );
    }
    tracing::info!(count = rounds.len(), "extracted rounds");
    Ok(rounds)
}
