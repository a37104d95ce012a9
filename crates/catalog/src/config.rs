//! Catalog paths inside the workspace.

use std::path::{Path, PathBuf};

/// Get the catalog directory (`.advisor/catalog`).
pub fn catalog_dir(workspace: &Path) -> PathBuf {
    workspace.join(".advisor").join("catalog")
}

/// Get the SQLite store path.
pub fn get_index_path(workspace: &Path) -> PathBuf {
    catalog_dir(workspace).join("catalog.sqlite")
}

/// Get the path of the catalog's embedding config.
pub fn catalog_config_path(workspace: &Path) -> PathBuf {
    catalog_dir(workspace).join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let workspace = Path::new("/tmp/ws");
        assert_eq!(
            get_index_path(workspace),
            PathBuf::from("/tmp/ws/.advisor/catalog/catalog.sqlite")
        );
        assert_eq!(
            catalog_config_path(workspace),
            PathBuf::from("/tmp/ws/.advisor/catalog/config.yaml")
        );
    }
}
