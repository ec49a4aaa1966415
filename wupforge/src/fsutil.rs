//! Small filesystem helpers shared by provisioning and the build pipeline.

use std::fs;
use std::io;
use std::path::Path;

/// Recursively copy the contents of `src` into `dst`, merging with whatever
/// already exists there.
pub(crate) fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Total size in bytes of all files under `root`.
pub(crate) fn dir_size(root: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_all_merges_trees() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");

        fs::create_dir_all(src.join("code")).unwrap();
        fs::write(src.join("code/app.bin"), b"app").unwrap();
        fs::create_dir_all(dst.join("meta")).unwrap();
        fs::write(dst.join("meta/old.bin"), b"old").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read(dst.join("code/app.bin")).unwrap(), b"app");
        assert_eq!(fs::read(dst.join("meta/old.bin")).unwrap(), b"old");
    }

    #[test]
    fn test_dir_size_sums_nested_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        let mut f = fs::File::create(temp.path().join("a/one.bin")).unwrap();
        f.write_all(&[0u8; 10]).unwrap();
        let mut f = fs::File::create(temp.path().join("a/b/two.bin")).unwrap();
        f.write_all(&[0u8; 32]).unwrap();

        assert_eq!(dir_size(temp.path()).unwrap(), 42);
    }
}
