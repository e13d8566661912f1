//! Segment compatibility oracle
//!
//! Decides whether one segment may follow another by overlapping the
//! candidate's entry openings with the previous segment's exit openings.

use super::segment::{Opening, Segment};

/// Whether `candidate` may follow a segment whose exits are `previous_exits`.
///
/// Each entry opening is shrunk by `margin` on both ends before testing so
/// the actor's whole body fits, not just its center. Pure, O(entries x exits).
pub fn can_follow(candidate: &Segment, previous_exits: &[Opening], margin: i32) -> bool {
    candidate
        .entry_intervals
        .iter()
        .map(|entry| entry.shrink(margin))
        .any(|entry| previous_exits.iter().any(|exit| exit.overlaps(entry)))
}
