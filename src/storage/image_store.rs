use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Component, Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::catalog::error::{CatalogError, Result};
use crate::storage::hasher::{self, IMAGE_EXTENSION};

/// Reserved asset served whenever a requested image is missing.
pub const DEFAULT_IMAGE: &str = "default.jpg";

const PLACEHOLDER_SIZE: u32 = 64;
const PLACEHOLDER_SHADE: u8 = 220;

/// Content-addressed directory of uploaded images.
///
/// Every asset is named `<sha256-hex>.jpg` after its own bytes, so repeated
/// uploads of the same photo land on the same file.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let store = Self { root };
        store.ensure_default()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores `bytes` under their digest-derived name and returns that name.
    pub fn put(&self, bytes: &[u8]) -> Result<String> {
        let filename = hasher::image_filename(bytes);
        if self.contains(&filename) {
            debug!("Image {} already stored", filename);
            return Ok(filename);
        }

        // Staged next to the target so the rename never crosses filesystems.
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(self.root.join(&filename)).map_err(|e| e.error)?;

        debug!("Stored image {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        validate_filename(filename).is_ok() && self.root.join(filename).is_file()
    }

    /// Reads an image by name, serving the default asset when it is missing.
    pub fn get(&self, filename: &str) -> Result<Vec<u8>> {
        validate_filename(filename)?;

        // Anything that is not a readable regular file, including names the
        // filesystem itself refuses, resolves to the default asset.
        let path = self.root.join(filename);
        if !path.is_file() {
            debug!("Image not found: {:?}, serving {}", filename, DEFAULT_IMAGE);
            return self.read_default();
        }
        Ok(fs::read(path)?)
    }

    fn read_default(&self) -> Result<Vec<u8>> {
        match fs::read(self.root.join(DEFAULT_IMAGE)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CatalogError::NotFound(DEFAULT_IMAGE.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_default(&self) -> Result<()> {
        let path = self.root.join(DEFAULT_IMAGE);
        if path.is_file() {
            return Ok(());
        }

        let placeholder = RgbImage::from_pixel(
            PLACEHOLDER_SIZE,
            PLACEHOLDER_SIZE,
            Rgb([PLACEHOLDER_SHADE; 3]),
        );
        let mut encoded = Cursor::new(Vec::new());
        placeholder.write_to(&mut encoded, ImageFormat::Jpeg)?;

        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(encoded.get_ref())?;
        staged.persist(&path).map_err(|e| e.error)?;

        info!("Generated placeholder {:?}", path);
        Ok(())
    }
}

fn validate_filename(filename: &str) -> Result<()> {
    if !filename.ends_with(IMAGE_EXTENSION) {
        return Err(CatalogError::BadRequest(format!(
            "Image path does not end with {}",
            IMAGE_EXTENSION
        )));
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(CatalogError::BadRequest(format!(
            "Image path must be a bare file name: {}",
            filename
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn stored_assets(store: &ImageStore) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(store.root())? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name != DEFAULT_IMAGE {
                names.push(name);
            }
        }
        Ok(names)
    }

    #[test]
    fn test_open_creates_directory_and_default() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("nested").join("images");

        let store = ImageStore::open(&root)?;
        assert!(root.is_dir());
        assert!(store.contains(DEFAULT_IMAGE));

        // Reopening keeps an operator-provided default untouched.
        fs::write(root.join(DEFAULT_IMAGE), b"custom default")?;
        let store = ImageStore::open(&root)?;
        assert_eq!(store.get(DEFAULT_IMAGE)?, b"custom default");
        Ok(())
    }

    #[test]
    fn test_put_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;

        let first = store.put(b"same photo")?;
        let second = store.put(b"same photo")?;

        assert_eq!(first, second);
        assert_eq!(first, hasher::image_filename(b"same photo"));
        assert_eq!(stored_assets(&store)?, vec![first]);
        Ok(())
    }

    #[test]
    fn test_different_bytes_get_different_names() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;

        let a = store.put(b"photo a")?;
        let b = store.put(b"photo b")?;

        assert_ne!(a, b);
        assert_eq!(stored_assets(&store)?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_upload_is_stored() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;

        let name = store.put(b"")?;
        assert!(store.contains(&name));
        assert!(store.get(&name)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_get_returns_stored_bytes() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;

        let name = store.put(b"\xff\xd8 jpeg-ish bytes")?;
        assert_eq!(store.get(&name)?, b"\xff\xd8 jpeg-ish bytes");
        Ok(())
    }

    #[test]
    fn test_missing_image_falls_back_to_default() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;
        fs::write(dir.path().join(DEFAULT_IMAGE), b"default bytes")?;

        assert_eq!(store.get("doesnotexist.jpg")?, b"default bytes");
        Ok(())
    }

    #[test]
    fn test_unresolvable_names_fall_back_to_default() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;
        fs::write(dir.path().join(DEFAULT_IMAGE), b"default bytes")?;

        let too_long = format!("{}.jpg", "a".repeat(300));
        assert_eq!(store.get(&too_long)?, b"default bytes");
        assert_eq!(store.get("a\0b.jpg")?, b"default bytes");
        Ok(())
    }

    #[test]
    fn test_missing_default_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;
        fs::remove_file(dir.path().join(DEFAULT_IMAGE))?;

        let err = store.get("doesnotexist.jpg").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn test_rejects_wrong_extension_and_paths() -> Result<()> {
        let dir = tempdir()?;
        let store = ImageStore::open(dir.path())?;

        for bad in ["foo.png", "foo.jpeg", "foo", "../default.jpg", "a/b.jpg", "/etc/x.jpg"] {
            let err = store.get(bad).unwrap_err();
            assert!(
                matches!(err, CatalogError::BadRequest(_)),
                "expected BadRequest for {}",
                bad
            );
        }
        Ok(())
    }
}
