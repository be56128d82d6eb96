//! A query result ready for output: console table, CSV file and optional chart.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

#[derive(Debug, Clone)]
pub struct Report {
    /// `<nn>_<name>`, shared by the CSV and the PNG.
    pub stem: &'static str,
    pub title: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub chart: Option<RgbImage>,
}

impl Report {
    pub fn new(stem: &'static str, title: &'static str, columns: Vec<&'static str>) -> Self {
        Self {
            stem,
            title,
            columns,
            rows: Vec::new(),
            chart: None,
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn with_chart(mut self, chart: RgbImage) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn csv_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.csv", self.stem))
    }

    pub fn chart_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.png", self.stem))
    }

    pub fn write_csv(&self, path: &Path) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(name.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_line<'a>(
    f: &mut fmt::Formatter<'_>,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    let text: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    writeln!(f, "  {}", text.join("  ").trim_end())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        writeln!(f, "=== {} ===", self.title)?;
        write_line(f, self.columns.iter().copied(), &widths)?;
        for row in &self.rows {
            write_line(f, row.iter().map(String::as_str), &widths)?;
        }
        write!(f, "  ({} rows)", self.rows.len())
    }
}

/// CS:GO competitive skill group names, 1 (Silver I) to 18 (Global Elite).
pub fn rank_name(rank: i32) -> &'static str {
    match rank {
        1 => "Silver I",
        2 => "Silver II",
        3 => "Silver III",
        4 => "Silver IV",
        5 => "Silver Elite",
        6 => "Silver Elite Master",
        7 => "Gold Nova I",
        8 => "Gold Nova II",
        9 => "Gold Nova III",
        10 => "Gold Nova Master",
        11 => "Master Guardian I",
        12 => "Master Guardian II",
        13 => "Master Guardian Elite",
        14 => "Distinguished Master Guardian",
        15 => "Legendary Eagle",
        16 => "Legendary Eagle Master",
        17 => "Supreme Master First Class",
        18 => "The Global Elite",
        _ => "Unranked",
    }
}
