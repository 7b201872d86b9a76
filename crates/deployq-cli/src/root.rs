use deployq_core::config::CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config` flag / `DEPLOYQ_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `deployq.yaml`
/// 3. Fall back to `./deployq.yaml` (loading it reports the missing file)
pub fn resolve_config(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd).unwrap_or_else(|| cwd.join(CONFIG_FILE))
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("elsewhere.yaml");
        assert_eq!(resolve_config(Some(&path)), path);
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "board:\n  id: b1\n").unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_upward(&subdir), Some(dir.path().join(CONFIG_FILE)));
    }

    #[test]
    fn nothing_found_without_config() {
        let dir = TempDir::new().unwrap();
        // A stray directory with the config's name doesn't count.
        std::fs::create_dir_all(dir.path().join(CONFIG_FILE)).unwrap();
        let found = find_upward(&dir.path().join(CONFIG_FILE));
        assert!(found.map_or(true, |p| !p.starts_with(dir.path())));
    }
}
