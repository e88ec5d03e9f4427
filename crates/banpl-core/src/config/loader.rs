//! Config file loading and merging

use std::fs;
use std::path::Path;

use toml::Table;

use crate::error::{BanplError, Result};

/// Load and parse one TOML document.
fn load_toml(path: &Path) -> Result<Table> {
    tracing::debug!("Loading TOML file from '{}'", path.display());
    if !path.exists() {
        return Err(BanplError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| BanplError::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |reason: String| BanplError::ConfigInvalid {
        path: path.to_path_buf(),
        reason,
    };
    let content = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
    content.parse::<Table>().map_err(|e| invalid(e.to_string()))
}

/// Render a value for logs, without TOML quotes around strings.
fn display_value(value: &toml::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Overwrite top-level keys of `default` with the values from `custom`.
///
/// Every key of `custom` must already exist in `default`. Nested tables are
/// replaced as a whole. Keys are all checked before anything is written, so
/// an error never yields a half-merged table.
pub fn merge_tables(mut default: Table, custom: Table) -> Result<Table> {
    if let Some(key) = custom.keys().find(|key| !default.contains_key(*key)) {
        return Err(BanplError::UnknownConfigKey { key: key.clone() });
    }

    for (key, value) in custom {
        if let Some(slot) = default.get_mut(&key) {
            tracing::info!(
                "Overwriting '{}': '{}' -> '{}'",
                key,
                display_value(slot),
                display_value(&value)
            );
            *slot = value;
        }
    }

    Ok(default)
}

/// Load the default document, then overwrite it with the custom document.
///
/// ```text
/// .
/// └── configs
///     ├── default.toml
///     └── distilbert.toml
/// ```
pub fn load_config(default_path: &Path, custom_path: &Path) -> Result<Table> {
    let default = load_toml(default_path)?;
    tracing::debug!("Loaded default config: {:?}", default);

    let custom = load_toml(custom_path)?;
    tracing::debug!("Loaded custom config: {:?}", custom);

    tracing::debug!("Overwriting default config with custom config...");
    let merged = merge_tables(default, custom)?;
    tracing::debug!("Merged config: {:?}", merged);

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use toml::Value;

    fn table(src: &str) -> Table {
        src.parse().expect("valid TOML")
    }

    fn write_pair(
        tmp: &TempDir,
        default: &str,
        custom: &str,
    ) -> (std::path::PathBuf, std::path::PathBuf) {
        let default_path = tmp.path().join("default.toml");
        let custom_path = tmp.path().join("custom.toml");
        fs::write(&default_path, default).expect("write default");
        fs::write(&custom_path, custom).expect("write custom");
        (default_path, custom_path)
    }

    #[test]
    fn test_load_config_overwrites_matching_key() {
        let tmp = TempDir::new().expect("tmp");
        let (default, custom) = write_pair(
            &tmp,
            "brand = \"Nissan\"\nmodel = \"180SX\"",
            "model = \"Silvia S15\"",
        );

        let merged = load_config(&default, &custom).expect("merged");
        assert_eq!(merged, table("brand = \"Nissan\"\nmodel = \"Silvia S15\""));
    }

    #[test]
    fn test_unknown_custom_key_is_rejected() {
        let tmp = TempDir::new().expect("tmp");
        let (default, custom) = write_pair(&tmp, "brand = \"Nissan\"", "color = \"blue\"");

        let err = load_config(&default, &custom).unwrap_err();
        assert!(matches!(err, BanplError::UnknownConfigKey { ref key } if key == "color"));
    }

    /// Collects formatted log lines emitted on the current thread.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
        }
    }

    fn merge_with_logs(default: Table, custom: Table) -> (Result<Table>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let result =
            tracing::subscriber::with_default(subscriber, || merge_tables(default, custom));
        (result, logs.text())
    }

    #[test]
    fn test_unknown_key_after_valid_key_is_rejected_whole() {
        // `model` sorts before `zzz`, so a key-by-key merge would apply it first.
        let default = table("brand = \"Nissan\"\nmodel = \"180SX\"");
        let custom = table("model = \"Silvia S15\"\nzzz = \"blue\"");

        let (result, logs) = merge_with_logs(default, custom);
        let err = result.unwrap_err();
        assert!(matches!(err, BanplError::UnknownConfigKey { ref key } if key == "zzz"));
        assert!(!logs.contains("Overwriting"), "unexpected overwrite: {logs}");
    }

    #[test]
    fn test_overwrite_log_prints_plain_strings() {
        let default = table("brand = \"Nissan\"\nmodel = \"180SX\"");
        let custom = table("model = \"Silvia S15\"");

        let (result, logs) = merge_with_logs(default, custom);
        assert!(result.is_ok());
        assert!(logs.contains("Overwriting 'model': '180SX' -> 'Silvia S15'"), "{logs}");
    }

    #[test]
    fn test_display_value_strips_string_quotes() {
        assert_eq!(display_value(&Value::String("180SX".into())), "180SX");
        assert_eq!(display_value(&Value::Integer(3)), "3");
        assert_eq!(display_value(&Value::Boolean(true)), "true");
    }

    #[test]
    fn test_empty_custom_is_identity() {
        let default = table("lr = 5e-5\nepochs = 3\n[nested]\nkey = true");
        let merged = merge_tables(default.clone(), Table::new()).expect("merged");
        assert_eq!(merged, default);
    }

    #[test]
    fn test_nested_table_is_replaced_whole() {
        let default = table("[training]\nlr = 0.1\nepochs = 3");
        let custom = table("[training]\nepochs = 1");
        let merged = merge_tables(default, custom).expect("merged");

        let training = merged["training"].as_table().expect("table");
        assert_eq!(training.get("epochs"), Some(&Value::Integer(1)));
        assert!(training.get("lr").is_none());
    }

    #[test]
    fn test_untouched_keys_keep_defaults() {
        let default = table("a = 1\nb = \"two\"\nc = false");
        let custom = table("b = \"three\"");
        let merged = merge_tables(default, custom).expect("merged");
        assert_eq!(merged["a"], Value::Integer(1));
        assert_eq!(merged["b"], Value::String("three".into()));
        assert_eq!(merged["c"], Value::Boolean(false));
    }

    #[test]
    fn test_missing_default_document() {
        let tmp = TempDir::new().expect("tmp");
        let custom = tmp.path().join("custom.toml");
        fs::write(&custom, "a = 1").expect("write");

        let err = load_config(&tmp.path().join("default.toml"), &custom).unwrap_err();
        assert!(
            matches!(err, BanplError::ConfigNotFound { ref path } if path.ends_with("default.toml"))
        );
    }

    #[test]
    fn test_missing_custom_document() {
        let tmp = TempDir::new().expect("tmp");
        let default = tmp.path().join("default.toml");
        fs::write(&default, "a = 1").expect("write");

        let err = load_config(&default, &tmp.path().join("nope.toml")).unwrap_err();
        assert!(
            matches!(err, BanplError::ConfigNotFound { ref path } if path.ends_with("nope.toml"))
        );
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let tmp = TempDir::new().expect("tmp");
        let (default, custom) = write_pair(&tmp, "a = 1", "a = = 2");

        let err = load_config(&default, &custom).unwrap_err();
        assert!(matches!(err, BanplError::ConfigInvalid { .. }));
        assert!(err.to_string().contains("custom.toml"));
    }

    #[test]
    fn test_non_utf8_document_is_invalid() {
        let tmp = TempDir::new().expect("tmp");
        let default = tmp.path().join("default.toml");
        let custom = tmp.path().join("custom.toml");
        fs::write(&default, "a = 1").expect("write default");
        fs::write(&custom, b"a = \"\xff\xfe\"").expect("write custom");

        let err = load_config(&default, &custom).unwrap_err();
        assert!(matches!(err, BanplError::ConfigInvalid { ref path, .. } if path == &custom));
        assert!(err.to_string().contains("custom.toml"));
    }

    #[test]
    fn test_unreadable_document_names_the_file() {
        let tmp = TempDir::new().expect("tmp");
        let default = tmp.path().join("default.toml");
        let custom = tmp.path().join("custom.toml");
        fs::write(&default, "a = 1").expect("write default");
        fs::create_dir(&custom).expect("mkdir");

        let err = load_config(&default, &custom).unwrap_err();
        assert!(matches!(err, BanplError::ConfigUnreadable { .. }));
        assert!(err.to_string().contains("custom.toml"));
    }
}
