use derive_more::Display;

/// Version-control status attached to a tree node.
///
/// A node without any status carries `None` instead of a dedicated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StatusTag {
    #[display("added")]
    Added,
    #[display("modified")]
    Modified,
    #[display("merge conflict")]
    MergeConflict,
    #[display("untracked")]
    Untracked,
    #[display("ignored")]
    Ignored,
}

/// Position of a status in directory listings, lowest first.
///
/// Actionable changes come first, untouched entries in the middle and
/// untracked or ignored entries last.
pub fn sort_rank(tag: Option<StatusTag>) -> u8 {
    match tag {
        Some(StatusTag::Added) => 0,
        Some(StatusTag::Modified) => 1,
        Some(StatusTag::MergeConflict) => 2,
        None => 3,
        Some(StatusTag::Untracked) => 4,
        Some(StatusTag::Ignored) => 5,
    }
}
