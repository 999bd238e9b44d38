// ABOUTME: Packs a workspace into the tar archive sent as the build context.
// ABOUTME: Skips the .git directory and stores symlinks as links.

use std::io;
use std::path::Path;

const EXCLUDED: &[&str] = &[".git"];

/// Tar up `dir`, with paths relative to it, in a stable order.
pub fn pack_workspace(dir: &Path) -> io::Result<Vec<u8>> {
    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);
    append_dir(&mut ar, dir, Path::new(""), true)?;
    ar.into_inner()
}

fn append_dir(
    ar: &mut tar::Builder<Vec<u8>>,
    dir: &Path,
    rel: &Path,
    top_level: bool,
) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        if top_level && EXCLUDED.iter().any(|x| name == *x) {
            continue;
        }

        let path = entry.path();
        let rel_path = rel.join(&name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            ar.append_dir(&rel_path, &path)?;
            append_dir(ar, &path, &rel_path, false)?;
        } else {
            ar.append_path_with_name(&path, &rel_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let mut ar = tar::Archive::new(archive);
        ar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn git_directory_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.js"), "console.log(1)").unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let names = entry_names(&pack_workspace(dir.path()).unwrap());
        assert!(names.iter().all(|n| !n.starts_with(".git")));
        assert!(names.contains(&"package.json".to_string()));
        assert!(names.iter().any(|n| n.trim_end_matches('/') == "src"));
        assert!(names.contains(&"src/index.js".to_string()));
    }

    #[test]
    fn nested_git_named_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vendor/.git")).unwrap();
        std::fs::write(dir.path().join("vendor/.git/keep"), "").unwrap();

        let names = entry_names(&pack_workspace(dir.path()).unwrap());
        assert!(names.contains(&"vendor/.git/keep".to_string()));
    }
}
