use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::constants::{
    COMPANY_CODE_BACKFILL_CHANNEL, COMPANY_CODE_PREFIX_LEN, REGION_MAPPING_CODE_COLUMN,
    REGION_MAPPING_REGION_COLUMN,
};
use crate::domain::{CaseRecord, RawTable};
use crate::error::RunWarning;
use crate::pipeline::processing::normalize::normalize_columns;
use crate::pipeline::processing::normalize::values::{cell_identifier, cell_text, is_blank};

/// Counts of fields filled by the enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub company_codes_backfilled: usize,
    pub regions_filled: usize,
}

/// First `COMPANY_CODE_PREFIX_LEN` characters of a trimmed, uppercased code
fn code_prefix(code: &str) -> String {
    code.trim()
        .to_uppercase()
        .chars()
        .take(COMPANY_CODE_PREFIX_LEN)
        .collect()
}

/// Company-code prefix → region lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionMap {
    regions: HashMap<String, String>,
}

impl RegionMap {
    /// Build the lookup from a raw mapping table. Later rows overwrite earlier
    /// ones; rows with a blank code or blank region are skipped.
    pub fn from_table(table: &RawTable) -> Result<Self, RunWarning> {
        let table = normalize_columns(table);
        for column in [REGION_MAPPING_CODE_COLUMN, REGION_MAPPING_REGION_COLUMN] {
            if !table.has_column(column) {
                return Err(RunWarning::RegionMappingSchema {
                    column: column.to_string(),
                });
            }
        }

        let mut regions = HashMap::new();
        for row in &table.rows {
            let code = cell_identifier(row.get(REGION_MAPPING_CODE_COLUMN));
            let region = cell_text(row.get(REGION_MAPPING_REGION_COLUMN));
            if is_blank(&code) || is_blank(&region) {
                continue;
            }
            regions.insert(code_prefix(&code), region.trim().to_string());
        }

        info!("Region mapping loaded with {} company code prefixes", regions.len());
        Ok(Self { regions })
    }

    pub fn lookup(&self, company_code: &str) -> Option<&str> {
        if is_blank(company_code) {
            return None;
        }
        self.regions.get(&code_prefix(company_code)).map(String::as_str)
    }
}

/// Give PM7 records with a blank company code the first four characters of their key.
pub fn backfill_company_codes(records: &mut [CaseRecord]) -> usize {
    let mut filled = 0;
    for record in records
        .iter_mut()
        .filter(|r| r.channel == COMPANY_CODE_BACKFILL_CHANNEL)
    {
        if !is_blank(&record.company_code) || !record.has_key() {
            continue;
        }
        record.company_code = record
            .key
            .trim()
            .chars()
            .take(COMPANY_CODE_PREFIX_LEN)
            .collect();
        debug!("{}: company code backfilled as '{}'", record.key, record.company_code);
        filled += 1;
    }
    filled
}

/// Fill blank regions from the mapping. A non-blank region is never overwritten.
pub fn fill_regions(records: &mut [CaseRecord], map: &RegionMap) -> usize {
    let mut filled = 0;
    for record in records.iter_mut().filter(|r| is_blank(&r.region)) {
        if let Some(region) = map.lookup(&record.company_code) {
            record.region = region.to_string();
            filled += 1;
        }
    }
    filled
}

/// Run both enrichment steps in their fixed order. Without a usable mapping
/// table only the backfill runs and the reason is returned as a warning.
pub fn enrich(records: &mut [CaseRecord], mapping: Option<&RawTable>) -> (EnrichStats, Vec<RunWarning>) {
    let mut stats = EnrichStats {
        company_codes_backfilled: backfill_company_codes(records),
        ..EnrichStats::default()
    };
    let mut warnings = Vec::new();

    match mapping.map(RegionMap::from_table) {
        Some(Ok(map)) => stats.regions_filled = fill_regions(records, &map),
        Some(Err(warning)) => {
            warn!("{}", warning);
            warnings.push(warning);
        }
        None => {
            warn!("{}", RunWarning::RegionMappingUnavailable);
            warnings.push(RunWarning::RegionMappingUnavailable);
        }
    }

    info!(
        "Enrichment filled {} company codes and {} regions",
        stats.company_codes_backfilled, stats.regions_filled
    );
    (stats, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: &str, channel: &str, company_code: &str, region: &str) -> CaseRecord {
        CaseRecord {
            key: key.to_string(),
            channel: channel.to_string(),
            company_code: company_code.to_string(),
            region: region.to_string(),
            ..CaseRecord::default()
        }
    }

    fn mapping() -> RawTable {
        RawTable::from_grid(
            vec!["R/3 CoCo".to_string(), "Region".to_string()],
            vec![
                vec![json!("de01"), json!("EMEA")],
                vec![json!("US10 "), json!("NA")],
                vec![json!(null), json!("LATAM")],
                vec![json!("CN01"), json!("  ")],
                vec![json!("US10"), json!("AMER")],
            ],
        )
    }

    #[test]
    fn test_backfill_only_blank_pm7_codes() {
        let mut records = vec![
            record("4711001", "PM7", "", ""),
            record("4711002", "PM7", "DE01", ""),
            record("4711003", "PISA", "", ""),
            record("", "PM7", "", ""),
            record("47", "PM7", "nan", ""),
        ];

        assert_eq!(backfill_company_codes(&mut records), 2);
        assert_eq!(records[0].company_code, "4711");
        assert_eq!(records[1].company_code, "DE01");
        assert_eq!(records[2].company_code, "");
        assert_eq!(records[3].company_code, "");
        assert_eq!(records[4].company_code, "47");
    }

    #[test]
    fn test_region_map_later_rows_win_and_blanks_skipped() {
        let map = RegionMap::from_table(&mapping()).unwrap();
        assert_eq!(map.lookup("DE01"), Some("EMEA"));
        assert_eq!(map.lookup(" us10-x "), Some("AMER"));
        assert_eq!(map.lookup("CN01"), None);
        assert_eq!(map.lookup(""), None);
    }

    #[test]
    fn test_region_fill_never_overwrites() {
        let map = RegionMap::from_table(&mapping()).unwrap();
        let mut records = vec![
            record("1", "PISA", "DE01", ""),
            record("2", "PISA", "DE01", "APAC"),
            record("3", "PISA", "XX99", ""),
        ];

        assert_eq!(fill_regions(&mut records, &map), 1);
        assert_eq!(records[0].region, "EMEA");
        assert_eq!(records[1].region, "APAC");
        assert_eq!(records[2].region, "");
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let table = mapping();
        let mut records = vec![
            record("DE01777", "PM7", "", ""),
            record("2", "ESM", "US10", ""),
            record("3", "RGPA", "", "APAC"),
        ];

        let (first, _) = enrich(&mut records, Some(&table));
        assert_eq!(first.company_codes_backfilled, 1);
        assert_eq!(first.regions_filled, 2);
        let after_once = records.clone();

        let (second, _) = enrich(&mut records, Some(&table));
        assert_eq!(records, after_once);
        assert_eq!(second, EnrichStats::default());
        assert_eq!(records[0].region, "EMEA");
    }

    #[test]
    fn test_mapping_schema_problem_is_a_warning() {
        let table = RawTable::from_grid(vec!["code".to_string()], vec![vec![json!("DE01")]]);
        let mut records = vec![record("4711", "PM7", "", "")];

        let (stats, warnings) = enrich(&mut records, Some(&table));
        assert_eq!(stats.company_codes_backfilled, 1);
        assert_eq!(
            warnings,
            vec![RunWarning::RegionMappingSchema {
                column: "r3_coco".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_mapping_table_is_a_warning() {
        let mut records = vec![record("1", "PISA", "DE01", "")];
        let (_, warnings) = enrich(&mut records, None);
        assert_eq!(warnings, vec![RunWarning::RegionMappingUnavailable]);
        assert_eq!(records[0].region, "");
    }
}
