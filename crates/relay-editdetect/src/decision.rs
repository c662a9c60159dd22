use relay_db::EditBufferRow;

/// Outcome of the edit-detection decision algorithm for one incoming item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No match found; caller should publish a new downstream status and
    /// then record it in the buffer.
    PublishNew,
    /// A prior item with the same (or near-identical) text is older;
    /// caller should update that downstream status in place rather than
    /// publishing a new one. `superseded_post_id` is the upstream id of the
    /// prior item being replaced, so the caller can retire its buffer row.
    UpdateExisting {
        downstream_status_id: Option<String>,
        superseded_post_id: String,
    },
    /// The incoming item is an older version of something already
    /// published; caller should drop it.
    SkipOlderVersion,
}

/// Compares two platform post IDs and reports whether `candidate` is newer
/// than `existing`.
///
/// IDs that look like Bluesky TIDs (base32-sortable, no leading digits
/// mixed with separators) compare lexicographically; everything else is
/// parsed as a numeric snowflake and compared numerically. Ties (equal
/// IDs, which should never reach this path since the exact-match branch
/// requires differing IDs) are treated as "not newer".
pub fn is_newer(candidate: &str, existing: &str) -> bool {
    match (candidate.parse::<u64>(), existing.parse::<u64>()) {
        (Ok(c), Ok(e)) => c > e,
        _ => candidate > existing,
    }
}

const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Runs the decision algorithm for an incoming `(post_id, username, text)`
/// against the edit-detection buffer's exact-hash and recent-similarity
/// views. `recent` must already be scoped to `username` and the 3600s
/// window (the caller fetches it via `EditBufferRepo::find_recent`); passing
/// an empty slice here is how the "similarity lookup raised" failure
/// semantics are implemented — the caller logs the error and calls this
/// function with `recent = &[]`, which always falls through to
/// [`Decision::PublishNew`].
pub fn decide(
    post_id: &str,
    norm: &str,
    exact_match: Option<(String, Option<String>)>,
    recent: &[EditBufferRow],
) -> Decision {
    if let Some((prev_post_id, prev_downstream_id)) = exact_match {
        if prev_post_id != post_id {
            return age_decision(post_id, &prev_post_id, prev_downstream_id);
        }
    }

    let mut best: Option<(f64, &EditBufferRow)> = None;
    for candidate in recent {
        if candidate.post_id == post_id {
            continue;
        }
        let sim = crate::normalize::jaccard_shingle_similarity(norm, &candidate.text_normalized);
        if best.map(|(b, _)| sim > b).unwrap_or(true) {
            best = Some((sim, candidate));
        }
    }

    if let Some((sim, candidate)) = best {
        if sim >= SIMILARITY_THRESHOLD && candidate.post_id != post_id {
            return age_decision(
                post_id,
                &candidate.post_id,
                candidate.downstream_status_id.clone(),
            );
        }
    }

    Decision::PublishNew
}

fn age_decision(
    post_id: &str,
    prev_post_id: &str,
    prev_downstream_id: Option<String>,
) -> Decision {
    if is_newer(post_id, prev_post_id) {
        Decision::UpdateExisting {
            downstream_status_id: prev_downstream_id,
            superseded_post_id: prev_post_id.to_string(),
        }
    } else {
        Decision::SkipOlderVersion
    }
}
