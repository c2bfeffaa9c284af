//! The artifact bundle a search run produces, held in memory.
//!
//! A bundle carries three views of the same artifact set:
//!
//! - the artifacts themselves, each with a domain-separated content hash;
//! - the manifest, listing every artifact with its `normative` flag;
//! - the digest basis, listing normative artifacts only.
//!
//! The bundle digest hashes the digest basis, so observational artifacts
//! can change without changing the digest. A search bundle additionally
//! binds its report to its log: `search_report.json` declares the
//! `search_log_digest` of the `search_log.json` it was built from.

use std::collections::BTreeMap;

use crate::digest::{canonical_hash, canonical_json_bytes, is_canonical_json, ContentHash, HashDomain};

/// Search configuration echo (normative).
pub const CONFIG_ARTIFACT: &str = "search_config.json";
/// Search log audit trail (normative).
pub const LOG_ARTIFACT: &str = "search_log.json";
/// Report rows plus log digest binding (normative).
pub const REPORT_ARTIFACT: &str = "search_report.json";

const MANIFEST_SCHEMA: &str = "bundle.v1";
const DIGEST_BASIS_SCHEMA: &str = "bundle_digest_basis.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleArtifact {
    pub name: String,
    pub content: Vec<u8>,
    /// `canonical_hash(BundleArtifact, content)`.
    pub content_hash: ContentHash,
    /// Participates in the bundle digest.
    pub normative: bool,
}

#[derive(Debug, Clone)]
pub struct SearchBundleV1 {
    /// Keyed and ordered by artifact name.
    pub artifacts: BTreeMap<String, BundleArtifact>,
    /// Canonical JSON, all artifacts.
    pub manifest: Vec<u8>,
    /// Canonical JSON, normative artifacts only.
    pub digest_basis: Vec<u8>,
    /// `canonical_hash(BundleDigest, digest_basis)`.
    pub digest: ContentHash,
}

impl SearchBundleV1 {
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<&BundleArtifact> {
        self.artifacts.get(name)
    }

    /// Parsed JSON of a named artifact.
    #[must_use]
    pub fn artifact_json(&self, name: &str) -> Option<serde_json::Value> {
        self.artifact(name)
            .and_then(|a| serde_json::from_slice(&a.content).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleBuildError {
    DuplicateArtifact { name: String },
    /// Manifest or digest basis could not be serialized.
    CanonError { detail: String },
}

impl std::fmt::Display for BundleBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateArtifact { name } => write!(f, "artifact {name} given twice"),
            Self::CanonError { detail } => write!(f, "bundle metadata: {detail}"),
        }
    }
}

impl std::error::Error for BundleBuildError {}

/// Hash each `(name, content, normative)` input and derive the manifest,
/// digest basis and digest.
///
/// # Errors
///
/// Returns [`BundleBuildError`] on a repeated name or a serialization failure.
pub fn build_bundle(
    inputs: Vec<(String, Vec<u8>, bool)>,
) -> Result<SearchBundleV1, BundleBuildError> {
    let mut artifacts = BTreeMap::new();
    for (name, content, normative) in inputs {
        if artifacts.contains_key(&name) {
            return Err(BundleBuildError::DuplicateArtifact { name });
        }
        let artifact = BundleArtifact {
            content_hash: canonical_hash(HashDomain::BundleArtifact, &content),
            name: name.clone(),
            content,
            normative,
        };
        artifacts.insert(name, artifact);
    }

    let canon_err = |e: serde_json::Error| BundleBuildError::CanonError {
        detail: e.to_string(),
    };
    let manifest = View::Manifest.render(&artifacts).map_err(canon_err)?;
    let digest_basis = View::DigestBasis.render(&artifacts).map_err(canon_err)?;
    let digest = canonical_hash(HashDomain::BundleDigest, &digest_basis);

    Ok(SearchBundleV1 {
        artifacts,
        manifest,
        digest_basis,
        digest,
    })
}

/// First integrity failure found by [`verify_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleVerifyError {
    ContentHashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },
    /// Stored manifest or digest basis differs from the one rebuilt from artifacts.
    StaleMetadata { view: &'static str },
    DigestMismatch { expected: String, actual: String },
    /// A normative `.json` artifact is not in canonical form.
    ArtifactNotCanonical { artifact: String },
    ArtifactMissing { artifact: String },
    /// The report is unreadable or has no `search_log_digest`.
    ReportUnreadable { detail: String },
    /// The report was built from a different log.
    SearchLogDigestMismatch {
        declared: String,
        recomputed: String,
    },
    CanonError { detail: String },
}

impl std::fmt::Display for BundleVerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContentHashMismatch {
                artifact,
                expected,
                actual,
            } => write!(f, "{artifact} hashes to {actual}, manifest says {expected}"),
            Self::StaleMetadata { view } => write!(f, "{view} does not match the artifacts"),
            Self::DigestMismatch { expected, actual } => {
                write!(f, "bundle digest is {actual}, expected {expected}")
            }
            Self::ArtifactNotCanonical { artifact } => {
                write!(f, "{artifact} is not canonical JSON")
            }
            Self::ArtifactMissing { artifact } => write!(f, "{artifact} is missing"),
            Self::ReportUnreadable { detail } => write!(f, "report unreadable: {detail}"),
            Self::SearchLogDigestMismatch {
                declared,
                recomputed,
            } => write!(
                f,
                "report declares search log {declared}, bundle log is {recomputed}"
            ),
            Self::CanonError { detail } => write!(f, "bundle metadata: {detail}"),
        }
    }
}

impl std::error::Error for BundleVerifyError {}

/// Check a bundle in order: content hashes, manifest and digest basis,
/// digest, canonical normative JSON, then the report/log binding.
///
/// # Errors
///
/// Returns the first [`BundleVerifyError`] found.
pub fn verify_bundle(bundle: &SearchBundleV1) -> Result<(), BundleVerifyError> {
    for artifact in bundle.artifacts.values() {
        let actual = canonical_hash(HashDomain::BundleArtifact, &artifact.content);
        if actual != artifact.content_hash {
            return Err(BundleVerifyError::ContentHashMismatch {
                artifact: artifact.name.clone(),
                expected: artifact.content_hash.as_str().to_string(),
                actual: actual.as_str().to_string(),
            });
        }
    }

    for (view, stored) in [
        (View::Manifest, &bundle.manifest),
        (View::DigestBasis, &bundle.digest_basis),
    ] {
        let rebuilt = view
            .render(&bundle.artifacts)
            .map_err(|e| BundleVerifyError::CanonError {
                detail: e.to_string(),
            })?;
        if rebuilt != *stored {
            return Err(BundleVerifyError::StaleMetadata { view: view.label() });
        }
    }

    let digest = canonical_hash(HashDomain::BundleDigest, &bundle.digest_basis);
    if digest != bundle.digest {
        return Err(BundleVerifyError::DigestMismatch {
            expected: bundle.digest.as_str().to_string(),
            actual: digest.as_str().to_string(),
        });
    }

    if let Some(artifact) = bundle
        .artifacts
        .values()
        .find(|a| a.normative && is_json_name(&a.name) && !is_canonical_json(&a.content))
    {
        return Err(BundleVerifyError::ArtifactNotCanonical {
            artifact: artifact.name.clone(),
        });
    }

    check_log_binding(bundle)
}

fn check_log_binding(bundle: &SearchBundleV1) -> Result<(), BundleVerifyError> {
    let require = |name: &str| {
        bundle
            .artifact(name)
            .ok_or_else(|| BundleVerifyError::ArtifactMissing {
                artifact: name.to_string(),
            })
    };
    let log = require(LOG_ARTIFACT)?;
    let report = require(REPORT_ARTIFACT)?;

    let report: serde_json::Value = serde_json::from_slice(&report.content).map_err(|e| {
        BundleVerifyError::ReportUnreadable {
            detail: e.to_string(),
        }
    })?;
    let declared = report["search_log_digest"].as_str().ok_or_else(|| {
        BundleVerifyError::ReportUnreadable {
            detail: "no search_log_digest".into(),
        }
    })?;

    let recomputed = canonical_hash(HashDomain::SearchLog, &log.content);
    if declared == recomputed.as_str() {
        Ok(())
    } else {
        Err(BundleVerifyError::SearchLogDigestMismatch {
            declared: declared.to_string(),
            recomputed: recomputed.as_str().to_string(),
        })
    }
}

fn is_json_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// The two metadata projections of an artifact set.
#[derive(Clone, Copy)]
enum View {
    Manifest,
    DigestBasis,
}

impl View {
    fn label(self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::DigestBasis => "digest basis",
        }
    }

    fn render(self, artifacts: &BTreeMap<String, BundleArtifact>) -> Result<Vec<u8>, serde_json::Error> {
        let (schema, entries): (&str, Vec<serde_json::Value>) = match self {
            Self::Manifest => (
                MANIFEST_SCHEMA,
                artifacts
                    .values()
                    .map(|a| {
                        serde_json::json!({
                            "content_hash": a.content_hash.as_str(),
                            "name": a.name,
                            "normative": a.normative,
                        })
                    })
                    .collect(),
            ),
            Self::DigestBasis => (
                DIGEST_BASIS_SCHEMA,
                artifacts
                    .values()
                    .filter(|a| a.normative)
                    .map(|a| serde_json::json!({"content_hash": a.content_hash.as_str(), "name": a.name}))
                    .collect(),
            ),
        };
        canonical_json_bytes(&serde_json::json!({
            "artifacts": entries,
            "schema_version": schema,
        }))
    }
}
