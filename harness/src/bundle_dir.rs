//! Search bundles on disk.
//!
//! ```text
//! <dir>/
//!   search_config.json
//!   search_log.json
//!   search_report.json
//!   bundle_manifest.json         every artifact with hash and normative flag
//!   bundle_digest_basis.json     normative artifact hashes only
//!   bundle_digest.txt            "sha256:<hex>", written last
//! ```
//!
//! The manifest is the source of truth for which files belong to the bundle.
//! Reading fails closed: an undeclared file, a missing declared file, a
//! manifest that is not canonical, or a search bundle without its three
//! search artifacts is rejected before any content is trusted. Content
//! hashes and the report/log binding are checked by [`load_verified_bundle`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::bundle::{
    verify_bundle, BundleArtifact, BundleVerifyError, SearchBundleV1, CONFIG_ARTIFACT,
    LOG_ARTIFACT, REPORT_ARTIFACT,
};
use crate::digest::{canonical_hash, is_canonical_json, ContentHash, HashDomain};

pub const MANIFEST_FILE: &str = "bundle_manifest.json";
pub const DIGEST_BASIS_FILE: &str = "bundle_digest_basis.json";
pub const DIGEST_FILE: &str = "bundle_digest.txt";

const MANIFEST_SCHEMA: &str = "bundle.v1";
const PARTIAL_SUFFIX: &str = ".partial";

/// Artifacts every search bundle directory must declare.
const SEARCH_ARTIFACTS: [&str; 3] = [CONFIG_ARTIFACT, LOG_ARTIFACT, REPORT_ARTIFACT];

/// Failure writing, reading or verifying a bundle directory.
#[derive(Debug)]
pub enum BundleDirError {
    Io {
        path: PathBuf,
        detail: String,
    },
    /// A metadata file or a declared artifact is absent.
    MissingFile { name: String },
    /// A file in the directory is neither metadata nor declared.
    UndeclaredFile { name: String },
    /// The manifest is unreadable, non-canonical, or malformed.
    Manifest { detail: String },
    UnsupportedManifest { schema_version: String },
    /// The manifest lacks one of the search artifacts.
    NotASearchBundle { missing: String },
    /// `bundle_digest.txt` disagrees with the stored digest basis.
    StoredDigestMismatch { stored: String, recomputed: String },
    /// Content hashes, digest, or report/log binding failed.
    Integrity(BundleVerifyError),
}

impl std::fmt::Display for BundleDirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, detail } => write!(f, "{}: {detail}", path.display()),
            Self::MissingFile { name } => write!(f, "bundle file missing: {name}"),
            Self::UndeclaredFile { name } => write!(f, "undeclared file in bundle: {name}"),
            Self::Manifest { detail } => write!(f, "bad manifest: {detail}"),
            Self::UnsupportedManifest { schema_version } => {
                write!(f, "unsupported manifest schema '{schema_version}'")
            }
            Self::NotASearchBundle { missing } => {
                write!(f, "manifest does not declare {missing}")
            }
            Self::StoredDigestMismatch { stored, recomputed } => write!(
                f,
                "stored digest {stored} does not match digest basis ({recomputed})"
            ),
            Self::Integrity(e) => write!(f, "integrity check failed: {e}"),
        }
    }
}

impl std::error::Error for BundleDirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Integrity(e) => Some(e),
            _ => None,
        }
    }
}

/// Persist `bundle` under `dir`, creating it if needed.
///
/// Each file goes through a `.partial` sibling and a rename. The digest
/// file is written last, so a directory with a digest is complete.
///
/// # Errors
///
/// Returns [`BundleDirError::Io`] on any filesystem failure.
pub fn write_bundle_dir(bundle: &SearchBundleV1, dir: &Path) -> Result<(), BundleDirError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;

    for artifact in bundle.artifacts.values() {
        put(dir, &artifact.name, &artifact.content)?;
    }
    put(dir, MANIFEST_FILE, &bundle.manifest)?;
    put(dir, DIGEST_BASIS_FILE, &bundle.digest_basis)?;
    put(dir, DIGEST_FILE, bundle.digest.as_str().as_bytes())?;

    info!(
        dir = %dir.display(),
        digest = bundle.digest.as_str(),
        artifacts = bundle.artifacts.len(),
        "search bundle written"
    );
    Ok(())
}

/// Read a bundle directory without trusting its artifact contents.
///
/// # Errors
///
/// Returns [`BundleDirError`] for any structural problem; see the module docs.
pub fn read_bundle_dir(dir: &Path) -> Result<SearchBundleV1, BundleDirError> {
    let manifest = get(dir, MANIFEST_FILE)?;
    let digest_basis = get(dir, DIGEST_BASIS_FILE)?;
    let stored_digest = get(dir, DIGEST_FILE)?;

    let entries = parse_manifest(&manifest)?;
    for required in SEARCH_ARTIFACTS {
        if !entries.contains_key(required) {
            return Err(BundleDirError::NotASearchBundle {
                missing: required.to_string(),
            });
        }
    }

    let on_disk = list_files(dir)?;
    if let Some(extra) = on_disk.iter().find(|name| {
        !entries.contains_key(name.as_str())
            && ![MANIFEST_FILE, DIGEST_BASIS_FILE, DIGEST_FILE].contains(&name.as_str())
    }) {
        return Err(BundleDirError::UndeclaredFile {
            name: extra.clone(),
        });
    }

    let mut artifacts = BTreeMap::new();
    for (name, (content_hash, normative)) in entries {
        let content = get(dir, &name)?;
        artifacts.insert(
            name.clone(),
            BundleArtifact {
                name,
                content,
                content_hash,
                normative,
            },
        );
    }

    let digest = canonical_hash(HashDomain::BundleDigest, &digest_basis);
    let stored = String::from_utf8_lossy(&stored_digest).trim().to_string();
    if stored != digest.as_str() {
        return Err(BundleDirError::StoredDigestMismatch {
            stored,
            recomputed: digest.as_str().to_string(),
        });
    }

    Ok(SearchBundleV1 {
        artifacts,
        manifest,
        digest_basis,
        digest,
    })
}

/// Read a bundle directory and run the full integrity check on it.
///
/// # Errors
///
/// Returns a structural [`BundleDirError`] from reading, or
/// [`BundleDirError::Integrity`] if verification fails.
pub fn load_verified_bundle(dir: &Path) -> Result<SearchBundleV1, BundleDirError> {
    let bundle = read_bundle_dir(dir)?;
    verify_bundle(&bundle).map_err(BundleDirError::Integrity)?;
    Ok(bundle)
}

/// Manifest entries keyed by artifact name: `(content_hash, normative)`.
fn parse_manifest(bytes: &[u8]) -> Result<BTreeMap<String, (ContentHash, bool)>, BundleDirError> {
    let bad = |detail: String| BundleDirError::Manifest { detail };

    if !is_canonical_json(bytes) {
        return Err(bad("not canonical JSON".into()));
    }
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| bad(e.to_string()))?;

    let schema_version = value["schema_version"].as_str().unwrap_or_default();
    if schema_version != MANIFEST_SCHEMA {
        return Err(BundleDirError::UnsupportedManifest {
            schema_version: schema_version.to_string(),
        });
    }

    let listed = value["artifacts"]
        .as_array()
        .ok_or_else(|| bad("artifacts is not an array".into()))?;
    let mut entries = BTreeMap::new();
    for entry in listed {
        let name = entry["name"]
            .as_str()
            .filter(|n| is_plain_filename(n))
            .ok_or_else(|| bad(format!("invalid artifact name in {entry}")))?;
        let content_hash = entry["content_hash"]
            .as_str()
            .and_then(ContentHash::parse)
            .ok_or_else(|| bad(format!("invalid content_hash for {name}")))?;
        let normative = entry["normative"]
            .as_bool()
            .ok_or_else(|| bad(format!("missing normative flag for {name}")))?;
        entries.insert(name.to_string(), (content_hash, normative));
    }
    Ok(entries)
}

/// Artifact names must stay inside the bundle directory.
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.ends_with(PARTIAL_SUFFIX)
}

fn put(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), BundleDirError> {
    let target = dir.join(name);
    let partial = dir.join(format!("{name}{PARTIAL_SUFFIX}"));
    std::fs::write(&partial, bytes).map_err(|e| io_error(&partial, &e))?;
    std::fs::rename(&partial, &target).map_err(|e| io_error(&target, &e))
}

fn get(dir: &Path, name: &str) -> Result<Vec<u8>, BundleDirError> {
    let path = dir.join(name);
    std::fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BundleDirError::MissingFile {
            name: name.to_string(),
        },
        _ => io_error(&path, &e),
    })
}

/// Regular files in `dir`, ignoring interrupted `.partial` writes.
fn list_files(dir: &Path) -> Result<BTreeSet<String>, BundleDirError> {
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, &e))? {
        let entry = entry.map_err(|e| io_error(dir, &e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| io_error(&entry.path(), &e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && !name.ends_with(PARTIAL_SUFFIX) {
            names.insert(name);
        }
    }
    Ok(names)
}

fn io_error(path: &Path, e: &std::io::Error) -> BundleDirError {
    BundleDirError::Io {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}
