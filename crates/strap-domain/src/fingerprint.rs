use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 8192;

/// Streams a manifest through SHA-256 without loading it wholesale.
///
/// Returns `None` when the manifest does not exist; any other I/O failure is
/// an error.
pub fn fingerprint_file(path: &Path) -> Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", path.display()))
        }
    };
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut chunk)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }
    Ok(Some(format!("{:x}", hasher.finalize())))
}

/// A recorded fingerprint is a single 64-character hex line; anything else
/// reads as "no fingerprint".
pub fn is_well_formed_digest(candidate: &str) -> bool {
    candidate.len() == 64 && hex::decode(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PKG_DIGEST: &str = "475c4869d64a0b96ff3b73e16778984172353477dd25d73d0ec9264967c31b8c";

    #[test]
    fn fingerprint_matches_known_digest() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = temp.path().join("requirements.txt");
        fs::write(&manifest, "pkg==1.0").expect("write manifest");

        let digest = fingerprint_file(&manifest).expect("hash").expect("present");
        assert_eq!(digest, PKG_DIGEST);
    }

    #[test]
    fn fingerprint_is_deterministic_across_reads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = temp.path().join("requirements.txt");
        fs::write(&manifest, "pkg==1.0\nother==2.3\n").expect("write manifest");

        let first = fingerprint_file(&manifest).expect("hash");
        let second = fingerprint_file(&manifest).expect("hash");
        assert_eq!(first, second);
    }

    #[test]
    fn single_byte_change_alters_the_fingerprint() {
        let temp = tempfile::tempdir().expect("tempdir");
        let manifest = temp.path().join("requirements.txt");
        fs::write(&manifest, "pkg==1.0").expect("write manifest");
        let before = fingerprint_file(&manifest).expect("hash").expect("present");

        fs::write(&manifest, "pkg==1.1").expect("rewrite manifest");
        let after = fingerprint_file(&manifest).expect("hash").expect("present");
        assert_ne!(before, after);
    }

    #[test]
    fn missing_manifest_has_no_fingerprint() {
        let temp = tempfile::tempdir().expect("tempdir");
        let absent = temp.path().join("requirements.txt");
        assert_eq!(fingerprint_file(&absent).expect("hash"), None);
    }

    #[test]
    fn digest_well_formedness() {
        assert!(is_well_formed_digest(PKG_DIGEST));
        assert!(!is_well_formed_digest("banana"));
        assert!(!is_well_formed_digest(&PKG_DIGEST[..63]));
        assert!(!is_well_formed_digest(&format!("{PKG_DIGEST}0")));
    }
}
