//! CSV parsing helpers shared by the live-source parsers.
//!
//! Upstream CSVs drift: headers change case, gain whitespace or a BOM, and
//! columns get renamed. Lookups therefore go through normalized header names
//! and small alias lists, never raw positions.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;

/// A parsed CSV body with a normalized header index.
#[derive(Debug, Clone)]
pub struct CsvTable {
    header_map: HashMap<String, usize>,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header_map: build_header_map(&headers),
            headers: headers.iter().map(normalize_header_name).collect(),
            records,
        })
    }

    /// Parse starting at the first line for which `is_header` holds.
    ///
    /// Some services prefix the CSV with free-form status lines.
    pub fn parse_from_header(text: &str, is_header: impl Fn(&str) -> bool) -> Result<Self, csv::Error> {
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            if is_header(line) {
                return Self::parse(&text[offset..]);
            }
            offset += line.len();
        }
        Self::parse(text)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Index of the first alias present (case-insensitive, trimmed).
    pub fn resolve(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|a| self.header_map.get(&normalize_header_name(a)).copied())
    }

    /// Indices of every column whose normalized name contains `needle`.
    pub fn columns_containing(&self, needle: &str) -> Vec<usize> {
        let mut idx: Vec<usize> = self
            .header_map
            .iter()
            .filter(|(name, _)| name.contains(needle))
            .map(|(_, i)| *i)
            .collect();
        idx.sort_unstable();
        idx
    }

    /// Records with their 1-based file line numbers (header is line 1).
    pub fn records(&self) -> impl Iterator<Item = (usize, &StringRecord)> {
        self.records.iter().enumerate().map(|(i, r)| (i + 2, r))
    }
}

/// Trimmed, non-empty cell at `idx`.
pub fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins on duplicate headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

pub fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.trim().to_ascii_lowercase()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    let s = s.trim();
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Date-time values: keep the calendar day.
    parse_datetime(s).map(|dt| dt.date())
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const FMTS: [&str; 4] = ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M"];
    let s = s.trim();
    for fmt in FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

/// Finite number, tolerating thousands separators (`2,345,678`).
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_matches_aliases_case_insensitively() {
        let t = CsvTable::parse("\u{feff}Date , TSA Travel Numbers \n1/2/2024,\"2,100,000\"\n").unwrap();
        assert_eq!(t.resolve(&["date"]), Some(0));
        assert_eq!(t.resolve(&["travelers", "tsa travel numbers"]), Some(1));
        assert_eq!(t.resolve(&["missing"]), None);

        let (line, rec) = t.records().next().unwrap();
        assert_eq!(line, 2);
        assert_eq!(parse_date(cell(rec, 0).unwrap()), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_number(cell(rec, 1).unwrap()), Some(2_100_000.0));
    }

    #[test]
    fn parse_from_header_skips_preamble() {
        let body = "No errors\nNo warnings\n5 ms\nraw_text,station_id\nMETAR KATL,KATL\n";
        let t = CsvTable::parse_from_header(body, |l| l.starts_with("raw_text")).unwrap();
        assert_eq!(t.headers(), &["raw_text".to_string(), "station_id".to_string()]);
        assert_eq!(t.records().count(), 1);
    }

    #[test]
    fn datetimes_accept_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(5, 52, 0).unwrap();
        assert_eq!(parse_datetime("2024-01-01T05:52:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-01-01 05:52:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-01T05:52:00+00:00"), Some(expected));
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn columns_containing_finds_all_matches() {
        let t = CsvTable::parse("cloud_base_ft_agl,ceiling_ft,vert_ceiling\n1,2,3\n").unwrap();
        assert_eq!(t.columns_containing("ceiling"), vec![1, 2]);
    }
}
