use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Copy a directory tree, creating `destination` if needed.
///
/// Existing files in the destination are overwritten.
pub async fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<u64, std::io::Error> {
    if !source.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Source directory does not exist: {}", source.display()),
        ));
    }

    fs::create_dir_all(destination).await?;

    let mut copied = 0;
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).await?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &target).await?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Remove a directory tree; returns whether anything was removed
pub async fn remove_dir_if_exists(path: &Path) -> Result<bool, std::io::Error> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).await?;
    Ok(true)
}

/// Absolute form of `path` with links and `..` resolved as far as it exists.
///
/// Components below the deepest existing ancestor are appended unchanged, so
/// a path that is about to be created still compares against real ones.
pub async fn resolve_path(path: &Path) -> Result<PathBuf, std::io::Error> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing).await {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Ok(absolute),
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        fs::create_dir_all(source.join("nested/deeper")).await.unwrap();
        fs::write(source.join("top.txt"), "top").await.unwrap();
        fs::write(source.join("nested/deeper/leaf.txt"), "leaf").await.unwrap();

        let destination = temp.path().join("copy");
        let copied = copy_dir_recursive(&source, &destination).await.unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(destination.join("nested/deeper/leaf.txt")).await.unwrap(),
            "leaf"
        );
        assert!(destination.join("top.txt").exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let result = copy_dir_recursive(&temp.path().join("nope"), &temp.path().join("copy")).await;
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_dir_if_exists() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("gone");
        fs::create_dir_all(&dir).await.unwrap();

        assert!(remove_dir_if_exists(&dir).await.unwrap());
        assert!(!remove_dir_if_exists(&dir).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_path() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("notes");
        fs::create_dir_all(&dir).await.unwrap();
        let real = fs::canonicalize(&dir).await.unwrap();

        assert_eq!(resolve_path(&dir.join("../notes")).await.unwrap(), real);
        assert_eq!(
            resolve_path(&dir.join("../notes/new/deeper")).await.unwrap(),
            real.join("new/deeper")
        );
    }

    #[tokio::test]
    async fn test_resolve_relative_path_is_absolute() {
        let resolved = resolve_path(Path::new("not-created-yet")).await.unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("not-created-yet"));
    }
}
