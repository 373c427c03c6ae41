use std::fs;

use ac_runtime::StoredSettings;

/// Where a command reads its rules from.
#[derive(Debug, Clone, Default)]
pub struct RulesSource {
    /// Plain rules file, one `pattern, container` per line.
    pub input: Option<String>,
    /// Exported extension settings (JSON, storage key layout).
    pub settings: Option<String>,
}

impl RulesSource {
    pub fn new(input: Option<String>, settings: Option<String>) -> Self {
        Self { input, settings }
    }

    /// The rules text. A rules file wins over the settings file.
    pub fn load(&self) -> Result<String, String> {
        if let Some(path) = &self.input {
            log::debug!("Reading rules from {}", path);
            return fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e));
        }
        if let Some(path) = &self.settings {
            log::debug!("Reading rules from settings {}", path);
            return Ok(load_settings(path)?.rules);
        }
        Err("No rules given: pass --input or --settings".to_string())
    }
}

pub fn load_settings(path: &str) -> Result<StoredSettings, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid settings file '{}': {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn path_of(file: &tempfile::NamedTempFile) -> Option<String> {
        Some(file.path().to_string_lossy().into_owned())
    }

    #[test]
    fn test_input_file_wins() {
        let rules = write_temp("youtube.com, YT");
        let settings = write_temp(r#"{"rules": "example.com, Work"}"#);
        let source = RulesSource::new(path_of(&rules), path_of(&settings));
        assert_eq!(source.load().unwrap(), "youtube.com, YT");
    }

    #[test]
    fn test_rules_from_settings() {
        let settings = write_temp(r#"{"rules": "example.com, Work", "notifications": false}"#);
        let source = RulesSource::new(None, path_of(&settings));
        assert_eq!(source.load().unwrap(), "example.com, Work");
    }

    #[test]
    fn test_missing_source() {
        assert!(RulesSource::default().load().is_err());
        let source = RulesSource::new(Some("/nonexistent/rules.txt".into()), None);
        assert!(source.load().unwrap_err().contains("Failed to read"));
    }

    #[test]
    fn test_bad_settings() {
        let settings = write_temp("not json");
        let source = RulesSource::new(None, path_of(&settings));
        assert!(source.load().unwrap_err().contains("Invalid settings file"));
    }
}
