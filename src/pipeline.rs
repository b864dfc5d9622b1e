//! The conversion pipeline: partition, parallel recode, merge, finalize.
//!
//! ## Concurrency model
//!
//! Candidate images are fanned out over a locally built rayon pool bounded
//! to half the available cores (encoding is CPU- and memory-heavy;
//! unbounded parallelism on a large export thrashes). Workers are pure —
//! each produces either "pass through" or a `(new name, bytes)` pair — and
//! the parallel collect short-circuits on the first `Err`, so a failing
//! asset stops scheduling of everything not yet started. The shared entry
//! collection and the rename map are mutated only afterwards, by a single
//! sequential merge step, which is what the exclusive-mutation requirement
//! comes down to once workers stop sharing state.
//!
//! ## Failure policy
//!
//! All-or-nothing. Any hard failure (bad PNG signature, decode or encode
//! error, unreadable entry, invalid manifest) aborts the run and the
//! partially transformed collection is dropped on the floor. There is no
//! skip-and-continue: a room archive that silently lost an asset is worse
//! than one that was never converted.

use crate::archive::{self, ArchiveError};
use crate::manifest::{self, RewriteError};
use crate::naming;
use crate::recode::{self, RecodeConfig, RecodeError};
use crate::sniff::{self, FormatError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Required entry holding the room manifest.
pub const MANIFEST_ENTRY: &str = "__data.json";

/// Required entry holding the integrity token.
pub const TOKEN_ENTRY: &str = ".token";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0} not found")]
    MissingEntry(&'static str),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("{name}: {source}")]
    Format { name: String, source: FormatError },
    #[error("{name}: {source}")]
    Recode { name: String, source: RecodeError },
    #[error(transparent)]
    Manifest(#[from] RewriteError),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Settings for one conversion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyConfig {
    pub recode: RecodeConfig,
    /// Worker count for the candidate fan-out. `None` means half the
    /// available execution units, minimum 1.
    pub threads: Option<usize>,
}

/// Progress notification for one completed candidate.
///
/// Purely informational — consumers may drop, batch, or ignore these.
/// `completed` is monotone over the run and reaches `total` only if the
/// run succeeds.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Original entry name.
    pub name: String,
    /// Candidates finished so far, this one included.
    pub completed: usize,
    /// Total candidate count for the run.
    pub total: usize,
    /// Size of the original entry.
    pub input_len: usize,
    /// Size of the recoded entry; `None` for an animated pass-through.
    pub output_len: Option<usize>,
}

/// A candidate's outcome: pass through unchanged, or replace under a new
/// content-addressed name.
enum CandidateOutcome {
    PassThrough,
    Recoded { address: String, bytes: Vec<u8> },
}

/// Convert a session export archive: recode eligible images, rewrite the
/// manifest, recompute the token, repack.
///
/// The input must contain [`MANIFEST_ENTRY`] and [`TOKEN_ENTRY`]; either
/// missing fails the run before any asset work starts. On success the
/// returned blob contains every non-candidate entry byte-identical, every
/// recoded candidate under its new name, and a self-consistent
/// manifest/token pair.
pub fn minify_archive(
    input: &[u8],
    config: &MinifyConfig,
    progress: Option<Sender<ProgressEvent>>,
) -> Result<Vec<u8>, PipelineError> {
    let mut entries = archive::read_entries(input)?;
    for required in [MANIFEST_ENTRY, TOKEN_ENTRY] {
        if !entries.contains_key(required) {
            return Err(PipelineError::MissingEntry(required));
        }
    }

    // Everything not in the candidate set passes through by staying put.
    let candidates: Vec<&str> = entries
        .keys()
        .map(String::as_str)
        .filter(|name| sniff::is_eligible_image(name))
        .collect();
    let total = candidates.len();
    let completed = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(config.threads))
        .build()?;

    // Parallel map, sequential merge. Collecting into Result short-circuits
    // scheduling after the first failure; in-flight work finishes and is
    // discarded with the partial Vec.
    let outcomes: Vec<(String, CandidateOutcome)> = pool.install(|| {
        candidates
            .par_iter()
            .map(|&name| {
                let bytes = &entries[name];
                let outcome = process_candidate(name, bytes, &config.recode)?;
                if let Some(sender) = &progress {
                    let event = ProgressEvent {
                        name: name.to_string(),
                        completed: completed.fetch_add(1, Ordering::Relaxed) + 1,
                        total,
                        input_len: bytes.len(),
                        output_len: match &outcome {
                            CandidateOutcome::PassThrough => None,
                            CandidateOutcome::Recoded { bytes, .. } => Some(bytes.len()),
                        },
                    };
                    // A dropped receiver only means nobody is watching.
                    let _ = sender.send(event);
                }
                Ok((name.to_string(), outcome))
            })
            .collect::<Result<_, PipelineError>>()
    })?;

    // Single aggregating consumer: sole owner of the entry collection and
    // rename map from here on.
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    for (original, outcome) in outcomes {
        if let CandidateOutcome::Recoded { address, bytes } = outcome {
            entries.remove(&original);
            entries.insert(address.clone(), bytes);
            renames.insert(original, address);
        }
    }

    let (new_manifest, new_token) = manifest::rewrite(&entries[MANIFEST_ENTRY], &renames)?;
    entries.insert(MANIFEST_ENTRY.to_string(), new_manifest);
    entries.insert(TOKEN_ENTRY.to_string(), new_token);

    Ok(archive::write_entries(&entries)?)
}

/// Decide one candidate: animated images pass through, everything else is
/// recoded and renamed to its content address.
fn process_candidate(
    name: &str,
    bytes: &[u8],
    config: &RecodeConfig,
) -> Result<CandidateOutcome, PipelineError> {
    let animated = sniff::is_animated(bytes, name).map_err(|source| PipelineError::Format {
        name: name.to_string(),
        source,
    })?;
    if animated {
        return Ok(CandidateOutcome::PassThrough);
    }

    let recoded = recode::recode(bytes, config).map_err(|source| PipelineError::Recode {
        name: name.to_string(),
        source,
    })?;
    let address = naming::content_address(&recoded);
    Ok(CandidateOutcome::Recoded {
        address,
        bytes: recoded,
    })
}

/// Worker budget: requested count, or half the available execution units;
/// never less than one.
fn effective_threads(requested: Option<usize>) -> usize {
    let threads = requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get() / 2)
            .unwrap_or(1)
    });
    threads.max(1)
}
