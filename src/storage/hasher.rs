use sha2::{Sha256, Digest};

pub const IMAGE_EXTENSION: &str = ".jpg";

pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Content-derived name an uploaded image is stored under.
pub fn image_filename(bytes: &[u8]) -> String {
    format!("{}{}", digest_hex(bytes), IMAGE_EXTENSION)
}
