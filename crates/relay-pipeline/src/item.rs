//! Per-item substates inside PROCESSING/PUBLISHING:
//! `{already-published → skip}`, `{edit = skip_older}`,
//! `{edit = update → call updater}`,
//! `{edit = publish_new or not-applicable → call publisher}`.

use relay_editdetect::Decision;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    SkipAlreadyPublished,
    SkipOlderVersion,
    SkipFiltered,
    UpdateExisting { downstream_status_id: String, superseded_post_id: String },
    PublishNew,
}

/// Classifies one incoming item given whether it is already published and
/// the edit-detection engine's decision. Pure function, no IO.
///
/// An `UpdateExisting` decision whose `downstream_status_id` is unknown
/// (the prior publish never recorded one, e.g. it itself failed) has
/// nothing to update against — it falls back to `PublishNew`.
pub fn classify(already_published: bool, decision: &Decision) -> ItemAction {
    if already_published {
        return ItemAction::SkipAlreadyPublished;
    }

    match decision {
        Decision::SkipOlderVersion => ItemAction::SkipOlderVersion,
        Decision::UpdateExisting { downstream_status_id: Some(id), superseded_post_id } => {
            ItemAction::UpdateExisting {
                downstream_status_id: id.clone(),
                superseded_post_id: superseded_post_id.clone(),
            }
        }
        Decision::UpdateExisting { downstream_status_id: None, .. } => ItemAction::PublishNew,
        Decision::PublishNew => ItemAction::PublishNew,
    }
}
