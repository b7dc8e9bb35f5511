//! Per-frame simulation state

use void_event::GameTime;
use void_reflect::ScopeId;

/// Action to construct once the frame's actions have run
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreate {
    /// Scope that receives the new action
    pub parent: ScopeId,
    /// Table attribute of `parent` it is appended to
    pub key: String,
    /// Factory class name
    pub class: String,
    /// Value for the new action's `Name`
    pub name: String,
}

/// Action to destroy once the frame's actions have run
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDestroy {
    pub parent: ScopeId,
    pub key: String,
    /// `Name` of the child to destroy
    pub name: String,
}

/// Clock, the scopes currently being updated, and structural changes
/// deferred to the end of the frame
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub time: GameTime,
    pub world: Option<ScopeId>,
    pub sector: Option<ScopeId>,
    pub entity: Option<ScopeId>,
    pub action: Option<ScopeId>,
    pending_create: Vec<PendingCreate>,
    pending_destroy: Vec<PendingDestroy>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer_create(&mut self, create: PendingCreate) {
        self.pending_create.push(create);
    }

    pub fn defer_destroy(&mut self, destroy: PendingDestroy) {
        self.pending_destroy.push(destroy);
    }

    /// Number of deferred changes not yet applied
    pub fn pending(&self) -> usize {
        self.pending_create.len() + self.pending_destroy.len()
    }

    /// Take every deferred change, oldest first
    pub fn take_pending(&mut self) -> (Vec<PendingCreate>, Vec<PendingDestroy>) {
        (
            std::mem::take(&mut self.pending_create),
            std::mem::take(&mut self.pending_destroy),
        )
    }

    /// Forget the scopes being updated
    pub(crate) fn clear_cursor(&mut self) {
        self.world = None;
        self.sector = None;
        self.entity = None;
        self.action = None;
    }
}
