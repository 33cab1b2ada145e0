//! The note visibility resolver.
//!
//! Visibility membership determines *eligibility*; the verification gate
//! determines whether content is *released this session*. Both checks run
//! server-side. Any client-side "show/hide private notes" preference is a
//! display convenience and is never consulted here.

use crate::model::{Note, Role};

/// The canonical visibility rule:
/// `!note.is_private || viewer_role ∈ note.visible_to`.
pub fn is_visible(note: &Note, viewer_role: Role) -> bool {
    !note.is_private || note.visible_to.contains(&viewer_role)
}

/// Whether the verification gate must have released this session before the
/// note's content can be rendered. True for every private note, even for
/// viewers named in `visible_to`.
pub fn requires_verification(note: &Note) -> bool {
    note.is_private
}
