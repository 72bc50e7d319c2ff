//! Folder-tree flattening for queued sends.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Flattens `folder` into `(directory, file)` pairs, depth-first.
///
/// `directory` is the receiver-side relative placement of the file, rooted at
/// the folder's own name and using `/` with a trailing slash, e.g. `"Root/"`
/// for a file directly inside `folder` named `Root` and `"Root/A/"` for one
/// inside its subfolder `A`. Within each directory, files come before
/// subfolders and both are visited in name order so the announce sequence is
/// deterministic.
pub async fn flatten_folder(folder: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "folder has no name component")
        })?;

    let mut entries = Vec::new();
    collect(folder, format!("{name}/"), &mut entries).await?;
    Ok(entries)
}

fn collect<'a>(
    dir: &'a Path,
    prefix: String,
    out: &'a mut Vec<(String, PathBuf)>,
) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        let mut reader = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                subdirs.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }

        files.sort();
        subdirs.sort();

        for file in files {
            out.push((prefix.clone(), file));
        }
        for subdir in subdirs {
            let name = match subdir.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };
            collect(&subdir, format!("{prefix}{name}/"), out).await?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn flat_folder_lists_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Root");
        fs::create_dir(&root).unwrap();
        touch(&root.join("b.txt"));
        touch(&root.join("a.txt"));

        let entries = flatten_folder(&root).await.unwrap();
        assert_eq!(
            entries,
            vec![
                ("Root/".to_string(), root.join("a.txt")),
                ("Root/".to_string(), root.join("b.txt")),
            ]
        );
    }

    #[tokio::test]
    async fn nested_folders_get_slash_terminated_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Root");
        fs::create_dir_all(root.join("A/Deep")).unwrap();
        fs::create_dir(root.join("B")).unwrap();
        touch(&root.join("top.txt"));
        touch(&root.join("A/inner.txt"));
        touch(&root.join("A/Deep/leaf.txt"));
        touch(&root.join("B/other.txt"));

        let entries = flatten_folder(&root).await.unwrap();
        let dirs: Vec<&str> = entries.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(dirs, vec!["Root/", "Root/A/", "Root/A/Deep/", "Root/B/"]);
        assert_eq!(entries[2].1, root.join("A/Deep/leaf.txt"));
    }

    #[tokio::test]
    async fn files_precede_subfolder_contents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Root");
        // "AAA" sorts before "zzz.txt"; the file must still come first.
        fs::create_dir_all(root.join("AAA")).unwrap();
        touch(&root.join("zzz.txt"));
        touch(&root.join("AAA/x.txt"));

        let entries = flatten_folder(&root).await.unwrap();
        assert_eq!(entries[0].0, "Root/");
        assert_eq!(entries[0].1, root.join("zzz.txt"));
        assert_eq!(entries[1].0, "Root/AAA/");
    }

    #[tokio::test]
    async fn empty_folder_yields_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Empty");
        fs::create_dir(&root).unwrap();
        assert!(flatten_folder(&root).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(flatten_folder(&dir.path().join("nope")).await.is_err());
    }
}
