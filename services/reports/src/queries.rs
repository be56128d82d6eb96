//! The analytical queries over the loaded schema.
//!
//! Each report is a SQL string, an async fetch and a pure `build_*` function
//! turning the typed rows into a [`Report`]. Only the fetch touches the pool.

use sqlx::PgPool;

use crate::chart::{
    self, BarChart, GroupedBarChart, Orientation, PieChart, Scale, CRIMSON, CT_BLUE, DARK_GREEN,
    STEEL_BLUE, T_GOLD,
};
use crate::report::{rank_name, Report};

/// Maps with fewer rounds than this are left out of the CT/T comparison.
pub const MIN_ROUNDS_PER_MAP: i64 = 100;
/// Weapons with fewer hits than this are left out of the headshot ranking.
pub const MIN_HITS_FOR_HEADSHOT_RATE: i64 = 1000;
/// A hit for at least this much HP damage counts as a kill.
pub const KILL_DAMAGE: i32 = 100;

const ROWS_PER_TABLE: &str = r#"
SELECT 'players' AS table_name, COUNT(*) AS row_count FROM players
UNION ALL SELECT 'maps', COUNT(*) FROM maps
UNION ALL SELECT 'weapons', COUNT(*) FROM weapons
UNION ALL SELECT 'matches', COUNT(*) FROM matches
UNION ALL SELECT 'rounds', COUNT(*) FROM rounds
UNION ALL SELECT 'damage_events', COUNT(*) FROM damage_events
ORDER BY row_count DESC
"#;

const TOP_MAPS: &str = r#"
SELECT m.name, COUNT(DISTINCT mt.match_id) AS match_count
FROM maps m
JOIN matches mt ON mt.map_id = m.map_id
GROUP BY m.name
ORDER BY match_count DESC, m.name
LIMIT 10
"#;

const SIDE_WINS: &str = r#"
SELECT m.name,
       COUNT(*) FILTER (WHERE r.winner_side = 'CounterTerrorist') AS ct_wins,
       COUNT(*) FILTER (WHERE r.winner_side = 'Terrorist') AS t_wins,
       COUNT(*) AS total_rounds
FROM rounds r
JOIN matches mt ON mt.match_id = r.match_id
JOIN maps m ON m.map_id = mt.map_id
GROUP BY m.name
HAVING COUNT(*) > $1
ORDER BY total_rounds DESC, m.name
LIMIT 10
"#;

const TOP_WEAPONS: &str = r#"
SELECT w.name, w.category, COUNT(*) AS hits,
       COALESCE(SUM(e.hp_damage), 0)::BIGINT AS total_damage
FROM damage_events e
JOIN weapons w ON w.weapon_id = e.weapon_id
GROUP BY w.name, w.category
ORDER BY hits DESC, w.name
LIMIT 10
"#;

const HITBOXES: &str = r#"
SELECT hitbox, COUNT(*) AS hits,
       ROUND(AVG(hp_damage), 2)::FLOAT8 AS avg_damage,
       COALESCE(SUM(hp_damage), 0)::BIGINT AS total_damage
FROM damage_events
WHERE hitbox IS NOT NULL AND hitbox <> ''
GROUP BY hitbox
ORDER BY hits DESC, hitbox
"#;

const RANK_DISTRIBUTION: &str = r#"
SELECT rank, COUNT(*) AS players
FROM players
WHERE rank BETWEEN 1 AND 18
GROUP BY rank
ORDER BY rank
"#;

const HEADSHOT_RATE: &str = r#"
SELECT w.name, COUNT(*) AS hits,
       COUNT(*) FILTER (WHERE e.hitbox = 'Head') AS headshots,
       ROUND(100.0 * COUNT(*) FILTER (WHERE e.hitbox = 'Head') / COUNT(*), 2)::FLOAT8 AS hs_percent
FROM damage_events e
JOIN weapons w ON w.weapon_id = e.weapon_id
GROUP BY w.name
HAVING COUNT(*) > $1
ORDER BY hs_percent DESC, w.name
LIMIT 10
"#;

const TOP_PLAYERS: &str = r#"
SELECT p.steam_id, p.rank, COUNT(*) AS kills
FROM damage_events e
JOIN players p ON p.player_id = e.attacker_id
WHERE e.hp_damage >= $1
GROUP BY p.steam_id, p.rank
ORDER BY kills DESC, p.steam_id
LIMIT 15
"#;

pub type TableCount = (String, i64);
pub type MapMatches = (String, i64);
pub type SideWins = (String, i64, i64, i64);
pub type WeaponHits = (String, Option<String>, i64, i64);
pub type HitboxHits = (String, i64, Option<f64>, i64);
pub type RankPlayers = (i32, i64);
pub type HeadshotRate = (String, i64, i64, f64);
pub type PlayerKills = (i64, Option<i32>, i64);

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

// -----------------------------------------------------------------------------
// BUILDERS
// -----------------------------------------------------------------------------

pub fn build_rows_per_table(rows: &[TableCount]) -> Report {
    let mut report = Report::new(
        "01_rows_per_table",
        "Rows per Table",
        vec!["table", "rows"],
    );
    for (table, count) in rows {
        report.push(vec![table.clone(), count.to_string()]);
    }
    let chart = BarChart::new(
        rows.iter().map(|(_, count)| *count as f64).collect(),
        Orientation::Horizontal,
    )
    .color(STEEL_BLUE)
    .scale(Scale::Log)
    .render();
    report.with_chart(chart)
}

pub fn build_top_maps(rows: &[MapMatches]) -> Report {
    let mut report = Report::new(
        "02_top_maps",
        "Top 10 Maps by Matches",
        vec!["map", "matches"],
    );
    for (map, matches) in rows {
        report.push(vec![map.clone(), matches.to_string()]);
    }
    let chart = BarChart::new(
        rows.iter().map(|(_, matches)| *matches as f64).collect(),
        Orientation::Vertical,
    )
    .color(DARK_GREEN)
    .render();
    report.with_chart(chart)
}

pub fn build_side_wins(rows: &[SideWins]) -> Report {
    let mut report = Report::new(
        "03_ct_vs_t",
        "CT vs T Round Wins per Map",
        vec!["map", "ct_wins", "t_wins", "total_rounds"],
    );
    for (map, ct, t, total) in rows {
        report.push(vec![
            map.clone(),
            ct.to_string(),
            t.to_string(),
            total.to_string(),
        ]);
    }
    let chart = GroupedBarChart::new(
        rows.iter()
            .map(|(_, ct, t, _)| vec![*ct as f64, *t as f64])
            .collect(),
        vec![CT_BLUE, T_GOLD],
    )
    .render();
    report.with_chart(chart)
}

pub fn build_top_weapons(rows: &[WeaponHits]) -> Report {
    let mut report = Report::new(
        "04_top_weapons",
        "Top 10 Weapons by Hits",
        vec!["weapon", "category", "hits", "total_damage"],
    );
    for (weapon, category, hits, damage) in rows {
        report.push(vec![
            weapon.clone(),
            opt(category),
            hits.to_string(),
            damage.to_string(),
        ]);
    }
    let chart = BarChart::new(
        rows.iter().map(|(_, _, hits, _)| *hits as f64).collect(),
        Orientation::Horizontal,
    )
    .colors(chart::ramp(rows.len(), &chart::REDS))
    .render();
    report.with_chart(chart)
}

pub fn build_hitboxes(rows: &[HitboxHits]) -> Report {
    let mut report = Report::new(
        "05_hits_by_hitbox",
        "Hits per Hitbox",
        vec!["hitbox", "hits", "share_percent", "avg_damage", "total_damage"],
    );
    let total: i64 = rows.iter().map(|(_, hits, _, _)| hits).sum();
    for (hitbox, hits, avg, damage) in rows {
        let share = if total > 0 {
            100.0 * *hits as f64 / total as f64
        } else {
            0.0
        };
        report.push(vec![
            hitbox.clone(),
            hits.to_string(),
            format!("{:.1}", share),
            avg.map(|v| format!("{:.2}", v)).unwrap_or_default(),
            damage.to_string(),
        ]);
    }
    let chart = PieChart::new(rows.iter().map(|(_, hits, _, _)| *hits as f64).collect()).render();
    report.with_chart(chart)
}

pub fn build_rank_distribution(rows: &[RankPlayers]) -> Report {
    let mut report = Report::new(
        "06_rank_distribution",
        "Players per Rank",
        vec!["rank", "rank_name", "players"],
    );
    for (rank, players) in rows {
        report.push(vec![
            rank.to_string(),
            rank_name(*rank).to_string(),
            players.to_string(),
        ]);
    }
    // Colour follows the rank itself, not the bar position.
    let colors = rows
        .iter()
        .map(|(rank, _)| chart::gradient(*rank as f64 / 18.0, &chart::RED_YELLOW_GREEN))
        .collect();
    let chart = BarChart::new(
        rows.iter().map(|(_, players)| *players as f64).collect(),
        Orientation::Vertical,
    )
    .colors(colors)
    .render();
    report.with_chart(chart)
}

pub fn build_headshot_rate(rows: &[HeadshotRate]) -> Report {
    let mut report = Report::new(
        "07_headshot_by_weapon",
        "Top 10 Weapons by Headshot %",
        vec!["weapon", "hits", "headshots", "hs_percent"],
    );
    for (weapon, hits, headshots, percent) in rows {
        report.push(vec![
            weapon.clone(),
            hits.to_string(),
            headshots.to_string(),
            format!("{:.2}", percent),
        ]);
    }
    let chart = BarChart::new(
        rows.iter().map(|(_, _, _, percent)| *percent).collect(),
        Orientation::Horizontal,
    )
    .color(CRIMSON)
    .render();
    report.with_chart(chart)
}

pub fn build_top_players(rows: &[PlayerKills]) -> Report {
    let mut report = Report::new(
        "08_top_players",
        "Top 15 Players by Kills",
        vec!["steam_id", "rank", "rank_name", "kills"],
    );
    for (steam_id, rank, kills) in rows {
        report.push(vec![
            steam_id.to_string(),
            opt(rank),
            rank.map(rank_name).unwrap_or_default().to_string(),
            kills.to_string(),
        ]);
    }
    report
}

// -----------------------------------------------------------------------------
// FETCH
// -----------------------------------------------------------------------------

/// Run every report in order.
pub async fn run_all(pool: &PgPool) -> Result<Vec<Report>, sqlx::Error> {
    let counts: Vec<TableCount> = sqlx::query_as(ROWS_PER_TABLE).fetch_all(pool).await?;
    let maps: Vec<MapMatches> = sqlx::query_as(TOP_MAPS).fetch_all(pool).await?;
    let sides: Vec<SideWins> = sqlx::query_as(SIDE_WINS)
        .bind(MIN_ROUNDS_PER_MAP)
        .fetch_all(pool)
        .await?;
    let weapons: Vec<WeaponHits> = sqlx::query_as(TOP_WEAPONS).fetch_all(pool).await?;
    let hitboxes: Vec<HitboxHits> = sqlx::query_as(HITBOXES).fetch_all(pool).await?;
    let ranks: Vec<RankPlayers> = sqlx::query_as(RANK_DISTRIBUTION).fetch_all(pool).await?;
    let headshots: Vec<HeadshotRate> = sqlx::query_as(HEADSHOT_RATE)
        .bind(MIN_HITS_FOR_HEADSHOT_RATE)
        .fetch_all(pool)
        .await?;
    let players: Vec<PlayerKills> = sqlx::query_as(TOP_PLAYERS)
        .bind(KILL_DAMAGE)
        .fetch_all(pool)
        .await?;

    Ok(vec![
        build_rows_per_table(&counts),
        build_top_maps(&maps),
        build_side_wins(&sides),
        build_top_weapons(&weapons),
        build_hitboxes(&hitboxes),
        build_rank_distribution(&ranks),
        build_headshot_rate(&headshots),
        build_top_players(&players),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_stems_are_numbered_in_order() {
        let reports = [
            build_rows_per_table(&[]),
            build_top_maps(&[]),
            build_side_wins(&[]),
            build_top_weapons(&[]),
            build_hitboxes(&[]),
            build_rank_distribution(&[]),
            build_headshot_rate(&[]),
            build_top_players(&[]),
        ];
        for (i, report) in reports.iter().enumerate() {
            assert!(report.stem.starts_with(&format!("{:02}_", i + 1)), "{}", report.stem);
        }
        // Only the player ranking has no chart.
        assert!(reports[..7].iter().all(|r| r.chart.is_some()));
        assert!(reports[7].chart.is_none());
    }

    #[test]
    fn test_rows_per_table() {
        let report = build_rows_per_table(&[
            ("damage_events".to_string(), 955_466),
            ("players".to_string(), 4_000),
        ]);
        assert_eq!(report.columns, vec!["table", "rows"]);
        assert_eq!(report.rows[0], vec!["damage_events", "955466"]);
        let chart = report.chart.unwrap();
        assert_eq!(chart.dimensions(), (chart::WIDTH, chart::HEIGHT));
    }

    #[test]
    fn test_side_wins_chart_uses_side_colors() {
        let report = build_side_wins(&[("de_dust2".to_string(), 120, 80, 200)]);
        assert_eq!(report.rows[0], vec!["de_dust2", "120", "80", "200"]);
        let chart = report.chart.unwrap();
        let colors: Vec<_> = chart.pixels().copied().collect();
        assert!(colors.contains(&CT_BLUE));
        assert!(colors.contains(&T_GOLD));
    }

    #[test]
    fn test_top_weapons_missing_category() {
        let report = build_top_weapons(&[("AK47".to_string(), None, 10, 270)]);
        assert_eq!(report.rows[0], vec!["AK47", "", "10", "270"]);
    }

    #[test]
    fn test_hitbox_shares() {
        let report = build_hitboxes(&[
            ("Chest".to_string(), 3, Some(25.0), 75),
            ("Head".to_string(), 1, Some(90.5), 90),
        ]);
        assert_eq!(report.rows[0], vec!["Chest", "3", "75.0", "25.00", "75"]);
        assert_eq!(report.rows[1], vec!["Head", "1", "25.0", "90.50", "90"]);
        assert_eq!(report.chart.unwrap().dimensions(), (chart::PIE_SIZE, chart::PIE_SIZE));
    }

    #[test]
    fn test_rank_distribution_names_and_colors() {
        let report = build_rank_distribution(&[(1, 5), (18, 5)]);
        assert_eq!(report.rows[0], vec!["1", "Silver I", "5"]);
        assert_eq!(report.rows[1], vec!["18", "The Global Elite", "5"]);

        let chart = report.chart.unwrap();
        let green = chart::RED_YELLOW_GREEN[2];
        assert!(chart.pixels().any(|p| *p == green));
    }

    #[test]
    fn test_headshot_percent_formatting() {
        let report = build_headshot_rate(&[("Deagle".to_string(), 2_000, 901, 45.05)]);
        assert_eq!(report.rows[0], vec!["Deagle", "2000", "901", "45.05"]);
    }

    #[test]
    fn test_top_players_unranked() {
        let report = build_top_players(&[(76561198000000001, Some(15), 42), (76561198000000002, None, 7)]);
        assert_eq!(
            report.rows,
            vec![
                vec!["76561198000000001", "15", "Legendary Eagle", "42"],
                vec!["76561198000000002", "", "", "7"],
            ]
        );
    }
}
