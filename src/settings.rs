use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CasebookError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Workbook holding the Clients sheet.
    #[serde(default)]
    pub workbook: String,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    /// Default years for `compare` when none are given on the command line.
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_backup_on_save")]
    pub backup_on_save: bool,
}

fn default_sheet() -> String {
    "Clients".to_string()
}

fn default_top_n() -> usize {
    10
}

fn default_backup_on_save() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workbook: String::new(),
            sheet: default_sheet(),
            years: Vec::new(),
            top_n: default_top_n(),
            backup_on_save: default_backup_on_save(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("casebook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CasebookError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Workbook path from `--workbook`, falling back to the configured one.
pub fn resolve_workbook(cli_override: Option<&str>, settings: &Settings) -> Result<PathBuf> {
    match cli_override {
        Some(p) => Ok(PathBuf::from(shellexpand_path(p))),
        None if !settings.workbook.is_empty() => Ok(PathBuf::from(&settings.workbook)),
        None => Err(CasebookError::Settings(
            "No workbook configured. Run `casebook init <file>` or pass --workbook."
                .to_string(),
        )),
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            workbook: "/tmp/dossiers.xlsx".to_string(),
            sheet: "Clients 2024".to_string(),
            years: vec![2023, 2024],
            top_n: 5,
            backup_on_save: false,
        };
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.workbook, "/tmp/dossiers.xlsx");
        assert_eq!(loaded.sheet, "Clients 2024");
        assert_eq!(loaded.years, vec![2023, 2024]);
        assert_eq!(loaded.top_n, 5);
        assert!(!loaded.backup_on_save);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("settings.json"));
        assert!(s.workbook.is_empty());
        assert_eq!(s.sheet, "Clients");
        assert_eq!(s.top_n, 10);
        assert!(s.backup_on_save);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"workbook": "/tmp/dossiers.xlsx"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.sheet, "Clients");
        assert!(s.years.is_empty());
        assert_eq!(s.workbook, "/tmp/dossiers.xlsx");
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_from(&path).sheet, "Clients");
    }

    #[test]
    fn test_resolve_workbook() {
        let mut s = Settings::default();
        assert!(resolve_workbook(None, &s).is_err());
        s.workbook = "/data/dossiers.xlsx".into();
        assert_eq!(resolve_workbook(None, &s).unwrap(), PathBuf::from("/data/dossiers.xlsx"));
        assert_eq!(
            resolve_workbook(Some("/other/file.csv"), &s).unwrap(),
            PathBuf::from("/other/file.csv")
        );
    }
}
