//! Raw dataset loader
//!
//! Reads the wide demo export (one row per damage event) into memory. The
//! header is validated before any row is decoded: a missing column is fatal
//! because every later stage depends on the full input schema. Rows that fail
//! to decode are skipped, counted and the first few reported.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EtlError, Result};

/// Columns the pipeline reads. Extra columns in the export are ignored.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "file",
    "map",
    "date",
    "round",
    "tick",
    "seconds",
    "hp_dmg",
    "arm_dmg",
    "is_bomb_planted",
    "hitbox",
    "wp",
    "wp_type",
    "award",
    "winner_side",
    "att_id",
    "att_rank",
    "vic_id",
    "vic_rank",
    "att_pos_x",
    "att_pos_y",
    "vic_pos_x",
    "vic_pos_y",
    "round_type",
    "ct_eq_val",
    "t_eq_val",
    "avg_match_rank",
];

/// How many row errors are echoed before summarising the rest.
const REPORTED_ROW_ERRORS: usize = 5;

/// One source row. Empty cells decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawEvent {
    pub file: Option<String>,
    pub map: Option<String>,
    /// Kept as text; parsed once per match during extraction.
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub round: Option<i32>,
    #[serde(deserialize_with = "lenient::int")]
    pub tick: Option<i32>,
    #[serde(deserialize_with = "lenient::float")]
    pub seconds: Option<f64>,
    #[serde(deserialize_with = "lenient::int")]
    pub hp_dmg: Option<i32>,
    #[serde(deserialize_with = "lenient::int")]
    pub arm_dmg: Option<i32>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_bomb_planted: Option<bool>,
    pub hitbox: Option<String>,
    pub wp: Option<String>,
    pub wp_type: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub award: Option<i32>,
    pub winner_side: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub att_id: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub att_rank: Option<i32>,
    #[serde(deserialize_with = "lenient::int")]
    pub vic_id: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub vic_rank: Option<i32>,
    #[serde(deserialize_with = "lenient::float")]
    pub att_pos_x: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub att_pos_y: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub vic_pos_x: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub vic_pos_y: Option<f64>,
    pub round_type: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub ct_eq_val: Option<i32>,
    #[serde(deserialize_with = "lenient::int")]
    pub t_eq_val: Option<i32>,
    #[serde(deserialize_with = "lenient::float")]
    pub avg_match_rank: Option<f64>,
}

/// The source table held in memory, in file order.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub rows: Vec<RawEvent>,
    /// Rows dropped because they could not be decoded
    pub skipped: usize,
}

impl RawDataset {
    pub fn from_rows(rows: Vec<RawEvent>) -> Self {
        Self { rows, skipped: 0 }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load the source CSV from disk. `limit` caps the number of data rows read.
pub fn load(path: &Path, limit: Option<usize>) -> Result<RawDataset> {
    tracing::info!(path = %path.display(), "loading source dataset");
    let file = File::open(path)?;
    read(file, limit)
}

pub fn read<R: io::Read>(input: R, limit: Option<usize>) -> Result<RawDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    validate_headers(&headers)?;

    let mut rows = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (idx, result) in reader.deserialize::<RawEvent>().enumerate() {
        if limit.is_some_and(|limit| idx >= limit) {
            break;
        }

        match result {
            Ok(row) => rows.push(row),
            // +2: 1-indexed and the header line
            Err(e) => errors.push(format!("line {}: {}", idx + 2, e)),
        }
    }

    if !errors.is_empty() {
        tracing::warn!(count = errors.len(), "skipped undecodable source rows");
        for err in errors.iter().take(REPORTED_ROW_ERRORS) {
            tracing::warn!("  {}", err);
        }
        if errors.len() > REPORTED_ROW_ERRORS {
            tracing::warn!("  ... and {} more", errors.len() - REPORTED_ROW_ERRORS);
        }
    }

    tracing::info!(
        rows = rows.len(),
        columns = headers.len(),
        "loaded source dataset"
    );

    Ok(RawDataset {
        rows,
        skipped: errors.len(),
    })
}

fn validate_headers(headers: &csv::StringRecord) -> Result<()> {
    let present: Vec<&str> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !present.contains(col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MissingColumns(missing))
    }
}

/// Cell decoders that accept what spreadsheet/pandas exports produce:
/// `5.0` in integer columns, `True`/`False` flags, `NaN` as missing.
mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    fn cell<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("nan")))
    }

    pub fn int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        let Some(text) = cell(deserializer)? else {
            return Ok(None);
        };

        let value = match text.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                let f: f64 = text
                    .parse()
                    .map_err(|_| D::Error::custom(format!("invalid integer '{}'", text)))?;
                // Exact integers only; beyond 2^53 a float no longer is one.
                if !f.is_finite() || f.fract() != 0.0 || f.abs() > 9.007_199_254_740_992e15 {
                    return Err(D::Error::custom(format!("invalid integer '{}'", text)));
                }
                f as i64
            }
        };

        T::try_from(value)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("integer out of range '{}'", text)))
    }

    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = cell(deserializer)? else {
            return Ok(None);
        };
        let value: f64 = text
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid number '{}'", text)))?;
        Ok(value.is_finite().then_some(value))
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = cell(deserializer)? else {
            return Ok(None);
        };
        match text.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "1.0" | "yes" => Ok(Some(true)),
            "false" | "f" | "0" | "0.0" | "no" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("invalid flag '{}'", text))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub const HEADER: &str = "file,map,date,round,tick,seconds,att_team,vic_team,att_side,vic_side,\
hp_dmg,arm_dmg,is_bomb_planted,bomb_site,hitbox,wp,wp_type,award,winner_team,winner_side,\
att_id,att_rank,vic_id,vic_rank,att_pos_x,att_pos_y,vic_pos_x,vic_pos_y,round_type,ct_eq_val,t_eq_val,avg_match_rank";

    pub fn line(file: &str, round: &str, att: (&str, &str), vic: (&str, &str), wp: &str) -> String {
        format!(
            "{file},de_dust2,09/28/2017 8:11 PM,{round},3352,85.7183,Team 1,Team 2,CounterTerrorist,Terrorist,\
24,5,False,,Chest,{wp},Pistol,300,Team 1,CounterTerrorist,\
{},{},{},{},-1285.5,1122.8,-1391.2,2012.4,PISTOL_ROUND,4300,4250,15.0",
            att.0, att.1, vic.0, vic.1
        )
    }

    // -------------------------------------------------------------------------
    // HEADER VALIDATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_missing_columns_is_fatal() {
        let csv = "file,map,round\nm1,de_dust2,1\n";
        let err = read(csv.as_bytes(), None).unwrap_err();
        match err {
            EtlError::MissingColumns(missing) => {
                assert!(missing.contains(&"att_id".to_string()));
                assert!(missing.contains(&"avg_match_rank".to_string()));
                assert!(!missing.contains(&"file".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_columns_message_lists_names() {
        let header = HEADER.replace(",wp_type", "");
        let csv = format!("{header}\n");
        let err = read(csv.as_bytes(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "source dataset is missing required columns: wp_type"
        );
    }

    #[test]
    fn test_header_with_bom() {
        let csv = format!(
            "\u{feff}{HEADER}\n{}\n",
            line("m1", "1", ("76561198000000001", "5"), ("76561198000000002", "3"), "USP")
        );
        let raw = read(csv.as_bytes(), None).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.rows[0].file.as_deref(), Some("m1"));
    }

    // -------------------------------------------------------------------------
    // CELL DECODING
    // -------------------------------------------------------------------------

    #[test]
    fn test_row_fields_decoded() {
        let csv = format!(
            "{HEADER}\n{}\n",
            line("m1", "1", ("76561198000000001", "5"), ("76561198000000002", "3"), "USP")
        );
        let raw = read(csv.as_bytes(), None).unwrap();
        let row = &raw.rows[0];

        assert_eq!(row.map.as_deref(), Some("de_dust2"));
        assert_eq!(row.round, Some(1));
        assert_eq!(row.tick, Some(3352));
        assert_eq!(row.seconds, Some(85.7183));
        assert_eq!(row.hp_dmg, Some(24));
        assert_eq!(row.is_bomb_planted, Some(false));
        assert_eq!(row.att_id, Some(76561198000000001));
        assert_eq!(row.vic_rank, Some(3));
        assert_eq!(row.wp.as_deref(), Some("USP"));
        assert_eq!(row.vic_pos_y, Some(2012.4));
        assert_eq!(row.avg_match_rank, Some(15.0));
    }

    #[test]
    fn test_integral_float_in_integer_column() {
        let csv = format!(
            "{HEADER}\n{}\n",
            line("m1", "2.0", ("1", "5.0"), ("2", "3"), "USP")
        );
        let raw = read(csv.as_bytes(), None).unwrap();
        assert_eq!(raw.rows[0].round, Some(2));
        assert_eq!(raw.rows[0].att_rank, Some(5));
    }

    #[test]
    fn test_empty_and_nan_cells_are_missing() {
        let csv = format!("{HEADER}\n{}\n", line("m1", "1", ("", "NaN"), ("2", ""), ""));
        let raw = read(csv.as_bytes(), None).unwrap();
        let row = &raw.rows[0];
        assert_eq!(row.att_id, None);
        assert_eq!(row.att_rank, None);
        assert_eq!(row.vic_rank, None);
        assert_eq!(row.wp, None);
    }

    #[test]
    fn test_bad_row_skipped_and_counted() {
        let csv = format!(
            "{HEADER}\n{}\n{}\n",
            line("m1", "one", ("1", "5"), ("2", "3"), "USP"),
            line("m1", "1", ("1", "5"), ("2", "3"), "USP"),
        );
        let raw = read(csv.as_bytes(), None).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.skipped, 1);
        assert_eq!(raw.rows[0].round, Some(1));
    }

    #[test]
    fn test_limit_caps_rows() {
        let body: Vec<String> = (1..=5)
            .map(|r| line("m1", &r.to_string(), ("1", "5"), ("2", "3"), "USP"))
            .collect();
        let csv = format!("{HEADER}\n{}\n", body.join("\n"));

        let raw = read(csv.as_bytes(), Some(3)).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw.rows[2].round, Some(3));
    }

    #[test]
    fn test_empty_dataset() {
        let csv = format!("{HEADER}\n");
        let raw = read(csv.as_bytes(), None).unwrap();
        assert!(raw.is_empty());
        assert_eq!(raw.skipped, 0);
    }
}
