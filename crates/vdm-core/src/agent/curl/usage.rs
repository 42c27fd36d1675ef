//! Disk usage of the library root.

use std::io;
use std::path::Path;

use crate::agent::StorageInfo;

/// Sum of file sizes under `root` plus filesystem capacity.
pub(crate) fn storage_info(root: &Path) -> io::Result<StorageInfo> {
    let used = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum();
    let (total, available) = fs_capacity(root)?;
    Ok(StorageInfo {
        used,
        total,
        available,
        root_path: root.to_path_buf(),
    })
}

#[cfg(unix)]
fn fs_capacity(path: &Path) -> io::Result<(u64, u64)> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let r = unsafe { libc::statvfs(c_path.as_ptr(), &mut st) };
    if r != 0 {
        return Err(io::Error::last_os_error());
    }
    let frsize = st.f_frsize as u64;
    Ok((st.f_blocks as u64 * frsize, st.f_bavail as u64 * frsize))
}

#[cfg(not(unix))]
fn fs_capacity(_path: &Path) -> io::Result<(u64, u64)> {
    Ok((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Series/X/Season 01")).unwrap();
        std::fs::write(dir.path().join("a.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(dir.path().join("Series/X/Season 01/e.mp4"), vec![0u8; 50]).unwrap();

        let info = storage_info(dir.path()).unwrap();
        assert_eq!(info.used, 150);
        assert_eq!(info.root_path, dir.path());
        #[cfg(unix)]
        {
            assert!(info.total > 0);
            assert!(info.available <= info.total);
        }
    }
}
