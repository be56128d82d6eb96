//! Pipeline driver: runs every stage in dependency order.

use std::fmt;

use crate::error::Result;
use crate::extract::{
    extract_maps, extract_matches, extract_players, extract_rounds, extract_weapons, Maps,
    Matches, Players, Rounds, Weapons,
};
use crate::normalize::{normalize_events, Dimensions, Events, UnresolvedRefs};
use crate::raw::RawDataset;

/// Every table produced by one ETL run.
#[derive(Debug, Clone)]
pub struct NormalizedTables {
    pub players: Players,
    pub maps: Maps,
    pub weapons: Weapons,
    pub matches: Matches,
    pub rounds: Rounds,
    pub events: Events,
}

pub fn run(raw: &RawDataset) -> Result<NormalizedTables> {
    let players = extract_players(raw)?;
    let maps = extract_maps(raw)?;
    let weapons = extract_weapons(raw)?;
    let matches = extract_matches(raw, &maps)?;
    let rounds = extract_rounds(raw, &matches)?;

    let events = normalize_events(
        raw,
        Dimensions {
            matches: &matches,
            rounds: &rounds,
            players: &players,
            weapons: &weapons,
        },
    )?;

    Ok(NormalizedTables {
        players,
        maps,
        weapons,
        matches,
        rounds,
        events,
    })
}

impl NormalizedTables {
    pub fn summary(&self) -> Summary {
        Summary {
            players: self.players.len(),
            maps: self.maps.len(),
            weapons: self.weapons.len(),
            matches: self.matches.len(),
            rounds: self.rounds.len(),
            events: self.events.len(),
            unresolved: self.events.unresolved(),
        }
    }
}

/// Row counts per table, printed at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub players: usize,
    pub maps: usize,
    pub weapons: usize,
    pub matches: usize,
    pub rounds: usize,
    pub events: usize,
    pub unresolved: UnresolvedRefs,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Players:  {:>10}", self.players)?;
        writeln!(f, "  Maps:     {:>10}", self.maps)?;
        writeln!(f, "  Weapons:  {:>10}", self.weapons)?;
        writeln!(f, "  Matches:  {:>10}", self.matches)?;
        writeln!(f, "  Rounds:   {:>10}", self.rounds)?;
        write!(f, "  Events:   {:>10}", self.events)?;

        let u = &self.unresolved;
        if u.total() > 0 {
            write!(
                f,
                "\n  Null references: round={} attacker={} victim={} weapon={}",
                u.round, u.attacker, u.victim, u.weapon
            )?;
        }
        if u.negative_damage > 0 {
            write!(f, "\n  Negative damage values nulled: {}", u.negative_damage)?;
        }
        Ok(())
    }
}
