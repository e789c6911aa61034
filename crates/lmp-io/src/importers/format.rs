//! Case format detection.

use std::path::Path;

use anyhow::{anyhow, Result};

use super::ImportResult;

/// Serializations accepted for case files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Toml,
    Json,
}

impl CaseFormat {
    pub const ALL: &'static [CaseFormat] = &[CaseFormat::Toml, CaseFormat::Json];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CaseFormat::Toml => &["toml"],
            CaseFormat::Json => &["json"],
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            CaseFormat::Toml => "TOML case",
            CaseFormat::Json => "JSON case",
        }
    }

    /// Detect the format from the file extension.
    pub fn detect(path: &Path) -> Option<CaseFormat> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Deserialize case text in this format.
    pub fn parse_str(&self, text: &str, default_name: &str) -> Result<ImportResult> {
        let file: super::CaseFile = match self {
            CaseFormat::Toml => toml::from_str(text)?,
            CaseFormat::Json => serde_json::from_str(text)?,
        };
        super::build_case(&file, default_name)
    }

    /// Write a case file in this format.
    pub fn render(&self, file: &super::CaseFile) -> Result<String> {
        Ok(match self {
            CaseFormat::Toml => toml::to_string_pretty(file)?,
            CaseFormat::Json => serde_json::to_string_pretty(file)?,
        })
    }
}

impl std::fmt::Display for CaseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

impl std::str::FromStr for CaseFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "toml" => Ok(CaseFormat::Toml),
            "json" => Ok(CaseFormat::Json),
            other => Err(anyhow!("unknown case format '{other}' (expected toml or json)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(CaseFormat::detect(Path::new("grid.toml")), Some(CaseFormat::Toml));
        assert_eq!(CaseFormat::detect(Path::new("grid.JSON")), Some(CaseFormat::Json));
        assert_eq!(CaseFormat::detect(Path::new("grid.m")), None);
        assert_eq!(CaseFormat::detect(Path::new("grid")), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Json".parse::<CaseFormat>().unwrap(), CaseFormat::Json);
        assert!("raw".parse::<CaseFormat>().is_err());
    }

    #[test]
    fn test_json_case() {
        let text = r#"{
            "nodes": ["A", "B"],
            "lines": [{"from": "A", "to": "B", "reactance": 0.1, "capacity": 100}],
            "generation": {"A": {"capacity": 200, "cost": 10}},
            "consumption": {"B": 150},
            "value_of_lost_load": 5000
        }"#;
        let result = CaseFormat::Json.parse_str(text, "pair").unwrap();
        assert_eq!(result.case.name, "pair");
        assert_eq!(result.case.value_of_lost_load, Some(5000.0));
        assert_eq!(result.case.network.total_demand(), 150.0);
        assert!(!result.diagnostics.has_issues());
    }
}
