//! Single-flight gate for reconciliation passes.

/// At most one pass is active at a time. A rejected attempt is simply
/// dropped; nothing is queued.
///
/// The guard is owned by the poller task and only mutated there, so the
/// check and the set in [`try_enter`](Self::try_enter) can never be split
/// by a suspension point.
#[derive(Debug, Default)]
pub struct DispatchGuard {
    active: bool,
}

impl DispatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pass active. Returns `false`, with no side effect, if one
    /// already is.
    pub fn try_enter(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        true
    }

    /// Release the gate. Idempotent.
    pub fn exit(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
