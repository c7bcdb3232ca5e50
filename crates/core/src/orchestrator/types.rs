/// How a run over the feed ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every eligible entry carries its appended summary.
    Completed,
    /// The external signal fired first; the feed was left untouched.
    Cancelled,
}
