use std::path::PathBuf;

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths without a tilde are returned unchanged. If the home directory
/// cannot be determined the original path is returned as-is.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(dirs) = directories::UserDirs::new() {
            return dirs.home_dir().to_path_buf();
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(dirs) = directories::UserDirs::new()
    {
        return dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through() {
        assert_eq!(expand_tilde("/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(expand_tilde("relative/x"), PathBuf::from("relative/x"));
    }

    #[test]
    fn tilde_prefix_becomes_absolute() {
        let expanded = expand_tilde("~/corkboard/db.sqlite");
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.is_absolute());
    }
}
