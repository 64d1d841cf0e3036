//! Sector/universe registry
//!
//! Maps each B3 ticker in the tracked universe to its sector label. The
//! table is loaded once at startup (built-in constant or a CSV override)
//! and injected into the aggregator; it is read-only afterward.

use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{EngineError, Result};

/// Built-in universe: the main liquid B3 names grouped by sector.
/// Tickers are stored without the `.SA` provider suffix.
const BUILTIN_SECTORS: &[(&str, &str)] = &[
    ("ITUB4", "Financeiro"),
    ("BBDC4", "Financeiro"),
    ("B3SA3", "Financeiro"),
    ("BBAS3", "Financeiro"),
    ("SANB11", "Financeiro"),
    ("PETR3", "Energia"),
    ("PETR4", "Energia"),
    ("CSAN3", "Energia"),
    ("UGPA3", "Energia"),
    ("BRDT3", "Energia"),
    ("VALE3", "Mineração"),
    ("CSNA3", "Mineração"),
    ("GGBR4", "Mineração"),
    ("USIM5", "Mineração"),
    ("ABEV3", "Consumo"),
    ("LREN3", "Consumo"),
    ("MGLU3", "Consumo"),
    ("NTCO3", "Consumo"),
    ("BTOW3", "Consumo"),
    ("LAME4", "Consumo"),
    ("SBSP3", "Utilities"),
    ("CMIG4", "Utilities"),
    ("ELET3", "Utilities"),
    ("ELET6", "Utilities"),
    ("CPFE3", "Utilities"),
    ("BRCR11", "Imobiliário"),
    ("KNRI11", "Imobiliário"),
    ("HGLG11", "Imobiliário"),
    ("VIVT4", "Telecomunicações"),
    ("TIMS3", "Telecomunicações"),
    ("OIBR3", "Telecomunicações"),
];

/// Immutable ticker → sector mapping
#[derive(Debug, Clone)]
pub struct SectorMap {
    entries: BTreeMap<String, String>,
}

impl SectorMap {
    /// The built-in B3 universe
    pub fn builtin() -> Self {
        let entries = BUILTIN_SECTORS
            .iter()
            .map(|(ticker, sector)| (ticker.to_string(), sector.to_string()))
            .collect();
        Self { entries }
    }

    /// Load a custom universe from a CSV file with `ticker,sector` columns.
    /// Tickers are normalized to uppercase with any `.SA` suffix stripped.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open sector file {}", path.display()))?;

        let mut entries = BTreeMap::new();
        for result in reader.records() {
            let record = result.context("Failed to read sector file record")?;
            let ticker = record
                .get(0)
                .map(normalize_ticker)
                .unwrap_or_default();
            let sector = record.get(1).unwrap_or("").trim().to_string();
            if ticker.is_empty() || sector.is_empty() {
                return Err(EngineError::SectorError(format!(
                    "invalid row in {}: expected ticker,sector",
                    path.display()
                ))
                .into());
            }
            entries.insert(ticker, sector);
        }

        if entries.is_empty() {
            return Err(
                EngineError::SectorError(format!("{} contains no tickers", path.display())).into(),
            );
        }

        Ok(Self { entries })
    }

    pub fn sector(&self, ticker: &str) -> Option<&str> {
        self.entries.get(&normalize_ticker(ticker)).map(String::as_str)
    }

    /// The universe of tickers, in stable alphabetical order
    pub fn tickers(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Distinct sector labels
    pub fn sector_names(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    /// Tickers belonging to one sector, alphabetical
    pub fn tickers_in_sector(&self, sector: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, s)| s.as_str() == sector)
            .map(|(t, _)| t.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Uppercase and strip the `.SA` market suffix used when addressing the provider
pub fn normalize_ticker(ticker: &str) -> String {
    let upper = ticker.trim().to_ascii_uppercase();
    match upper.strip_suffix(".SA") {
        Some(bare) => bare.to_string(),
        None => upper,
    }
}
