//! Input discovery.
//!
//! Expands command-line paths into tile inputs. Files are taken as given;
//! directories are walked for image files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, StitchError};
use crate::tile::TileInput;

/// File extensions treated as images when walking directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

/// True if the path has an image file extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Collect tile inputs from files and directories, in argument order.
///
/// Directory entries are sorted by file name so that input order, and with
/// it progress order, is deterministic.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<TileInput>> {
    let mut inputs = Vec::new();

    for path in paths {
        if path.is_dir() {
            inputs.extend(scan_directory(path));
        } else if path.is_file() {
            inputs.push(TileInput::from_path(path));
        } else {
            return Err(StitchError::Io {
                path: path.clone(),
                message: "No such file or directory".to_string(),
            });
        }
    }

    Ok(inputs)
}

/// Walk a directory for image files.
pub fn scan_directory(root: &Path) -> Vec<TileInput> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(|entry| TileInput::from_path(entry.path()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("0,0.png")));
        assert!(is_image_file(Path::new("0,0.JPG")));
        assert!(is_image_file(Path::new("tiles/3,4.tiff")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("0,0")));
    }

    #[test]
    fn test_scan_directory_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1,0.png"), b"").unwrap();
        fs::write(dir.path().join("0,0.png"), b"").unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("0,1.png"), b"").unwrap();

        let inputs = scan_directory(dir.path());
        let names: Vec<_> = inputs.iter().map(|i| i.identifier.as_str()).collect();

        assert_eq!(names, vec!["0,0.png", "1,0.png", "0,1.png"]);
    }

    #[test]
    fn test_discover_explicit_files_always_taken() {
        let dir = tempdir().unwrap();
        let odd = dir.path().join("2,2.dat");
        fs::write(&odd, b"").unwrap();

        let inputs = discover_inputs(&[odd]).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].identifier, "2,2.dat");
    }

    #[test]
    fn test_discover_missing_path() {
        let result = discover_inputs(&[PathBuf::from("/nonexistent/tiles")]);
        assert!(matches!(result, Err(StitchError::Io { .. })));
    }
}
