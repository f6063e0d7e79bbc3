use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Base directory for everything the server writes: database, uploaded
/// attachments, log files.
///
/// Debug builds use `dev_assets/` at the workspace root so a `cargo run`
/// never touches the real data dir.
pub fn asset_dir() -> std::path::PathBuf {
    let path = if cfg!(debug_assertions) {
        std::path::PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("dev", "corkboard", "corkboard")
            .expect("OS didn't give us a home directory")
            .data_dir()
            .to_path_buf()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).expect("Failed to create asset directory");
    }

    path
}

/// Database file path.
///
/// Respects `CORKBOARD_DATABASE_PATH` (tilde expansion supported).
/// Default: `{asset_dir}/db.sqlite`
pub fn database_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("CORKBOARD_DATABASE_PATH") {
        return crate::path::expand_tilde(&path);
    }
    asset_dir().join("db.sqlite")
}

/// Directory uploaded attachments are stored under.
///
/// Respects `CORKBOARD_UPLOAD_DIR` (tilde expansion supported).
/// Default: `{asset_dir}/uploads`
pub fn upload_dir() -> std::path::PathBuf {
    let path = if let Ok(dir) = std::env::var("CORKBOARD_UPLOAD_DIR") {
        crate::path::expand_tilde(&dir)
    } else {
        asset_dir().join("uploads")
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).expect("Failed to create upload directory");
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_database_path_default() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::remove_var("CORKBOARD_DATABASE_PATH") };
        let path = database_path();
        assert!(path.ends_with("db.sqlite"));
    }

    #[test]
    #[serial]
    fn test_database_path_env_override() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::set_var("CORKBOARD_DATABASE_PATH", "/custom/path/test.db") };
        let path = database_path();
        unsafe { env::remove_var("CORKBOARD_DATABASE_PATH") };
        assert_eq!(path, std::path::PathBuf::from("/custom/path/test.db"));
    }

    #[test]
    #[serial]
    fn test_database_path_tilde_expansion() {
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::set_var("CORKBOARD_DATABASE_PATH", "~/corkboard/db.sqlite") };
        let path = database_path();
        unsafe { env::remove_var("CORKBOARD_DATABASE_PATH") };
        assert!(!path.to_string_lossy().contains('~'));
        assert!(path.is_absolute());
    }

    #[test]
    #[serial]
    fn test_upload_dir_env_override() {
        let temp = tempfile::tempdir().unwrap();
        let custom = temp.path().join("uploads");
        // SAFETY: Tests run serially via #[serial] attribute
        unsafe { env::set_var("CORKBOARD_UPLOAD_DIR", custom.to_str().unwrap()) };
        let dir = upload_dir();
        unsafe { env::remove_var("CORKBOARD_UPLOAD_DIR") };
        assert_eq!(dir, custom);
        assert!(custom.exists());
    }
}
