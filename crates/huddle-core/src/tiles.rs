use std::collections::HashMap;

/// Transport-assigned tile identifier, unique among bound tiles.
pub type TileId = u32;

/// Grid capacity used when no setting overrides it.
pub const DEFAULT_MAX_VISIBLE_TILE_COUNT: usize = 16;

pub(crate) const UNKNOWN_ATTENDEE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TilePauseState {
    #[default]
    Unpaused,
    PausedByUserRequest,
    PausedForPoorConnection,
}

/// One video feed bound to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileState {
    pub tile_id: TileId,
    pub attendee_id: Option<String>,
    pub is_local_tile: bool,
    pub is_content: bool,
    pub pause_state: TilePauseState,
}

impl TileState {
    pub fn local(tile_id: TileId, attendee_id: Option<&str>) -> Self {
        Self::build(tile_id, attendee_id, true, false)
    }

    pub fn remote(tile_id: TileId, attendee_id: Option<&str>) -> Self {
        Self::build(tile_id, attendee_id, false, false)
    }

    pub fn content(tile_id: TileId, attendee_id: Option<&str>) -> Self {
        Self::build(tile_id, attendee_id, false, true)
    }

    fn build(tile_id: TileId, attendee_id: Option<&str>, is_local_tile: bool, is_content: bool) -> Self {
        Self {
            tile_id,
            attendee_id: attendee_id.map(str::to_string),
            is_local_tile,
            is_content,
            pause_state: TilePauseState::Unpaused,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_state != TilePauseState::Unpaused
    }

    fn attendee_label(&self) -> &str {
        self.attendee_id.as_deref().unwrap_or(UNKNOWN_ATTENDEE)
    }
}

/// Which presentation surface a tile mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileChange {
    /// The grid (local slot or remote tiles) changed.
    Grid,
    /// The dedicated screen-share output changed.
    Content,
    /// Both surfaces changed, e.g. a tile id moved from content to the grid.
    Both,
    /// Nothing matched; the event was inconsistent with current state.
    None,
}

impl TileChange {
    pub(crate) fn merge(self, other: TileChange) -> TileChange {
        match (self, other) {
            (TileChange::None, c) | (c, TileChange::None) => c,
            (a, b) if a == b => a,
            _ => TileChange::Both,
        }
    }

    pub fn touches_grid(self) -> bool {
        matches!(self, TileChange::Grid | TileChange::Both)
    }

    pub fn touches_content(self) -> bool {
        matches!(self, TileChange::Content | TileChange::Both)
    }
}

/// Ordered video tiles plus the capacity-bounded window shown in the grid.
///
/// Slot 0 is reserved for the local tile. Remote tiles follow in arrival
/// order. Screen-share content lives in its own slot and never counts
/// against the grid budget.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    max_visible: usize,
    local_placeholder: bool,
    local: Option<TileState>,
    remotes: Vec<TileState>,
    content: Option<TileState>,
    visible: Vec<Option<TileState>>,
    /// tile id -> grid index, for tiles inside the visible window only
    positions: HashMap<TileId, usize>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_VISIBLE_TILE_COUNT, false)
    }

    /// `local_placeholder` keeps an empty slot 0 in the window while local
    /// video is off, so the grid can render a "turn on your video" cell.
    pub fn with_capacity(max_visible: usize, local_placeholder: bool) -> Self {
        if max_visible == 0 {
            tracing::warn!("tile registry: visible tile count of 0 raised to 1");
        }
        let mut registry = Self {
            max_visible: max_visible.max(1),
            local_placeholder,
            local: None,
            remotes: Vec::new(),
            content: None,
            visible: Vec::new(),
            positions: HashMap::new(),
        };
        registry.recompute();
        registry
    }

    pub fn max_visible_tile_count(&self) -> usize {
        self.max_visible
    }

    /// Grid slots left for remote tiles.
    pub fn capacity_for(&self, local_occupied: bool) -> usize {
        self.max_visible - usize::from(local_occupied)
    }

    pub fn add_tile(&mut self, tile: TileState) -> TileChange {
        tracing::debug!(
            "add_tile: id={} attendee={} local={} content={}",
            tile.tile_id,
            tile.attendee_label(),
            tile.is_local_tile,
            tile.is_content
        );

        let mut change = self.unbind_other_slots(&tile);

        if tile.is_content {
            self.content = Some(tile);
            change = change.merge(TileChange::Content);
        } else {
            if tile.is_local_tile {
                if let Some(prev) = &self.local {
                    tracing::debug!("add_tile: replacing local tile {}", prev.tile_id);
                    self.positions.remove(&prev.tile_id);
                }
                self.local = Some(tile);
            } else if let Some(existing) = self.remotes.iter_mut().find(|t| t.tile_id == tile.tile_id) {
                tracing::debug!("add_tile: remote tile {} already bound, replacing", tile.tile_id);
                *existing = tile;
            } else {
                self.remotes.push(tile);
            }
            change = change.merge(TileChange::Grid);
        }

        if change.touches_grid() {
            self.recompute();
        }
        change
    }

    /// Tile ids are unique across all slots: a tile re-announced under a
    /// different role leaves its previous slot.
    fn unbind_other_slots(&mut self, tile: &TileState) -> TileChange {
        let id = tile.tile_id;
        let into_local = tile.is_local_tile && !tile.is_content;
        let into_remote = !tile.is_local_tile && !tile.is_content;
        let mut change = TileChange::None;

        if !tile.is_content && self.content.as_ref().is_some_and(|t| t.tile_id == id) {
            self.content = None;
            change = change.merge(TileChange::Content);
        }
        if !into_local && self.local.as_ref().is_some_and(|t| t.tile_id == id) {
            self.local = None;
            change = change.merge(TileChange::Grid);
        }
        if !into_remote {
            let before = self.remotes.len();
            self.remotes.retain(|t| t.tile_id != id);
            if self.remotes.len() != before {
                change = change.merge(TileChange::Grid);
            }
        }

        if change != TileChange::None {
            tracing::debug!("add_tile: tile {id} moved between slots");
            self.positions.remove(&id);
        }
        change
    }

    /// Remove a tile by id. Snapshot fields other than `tile_id` are ignored,
    /// so a removal still lands after intervening pause/resume updates.
    pub fn remove_tile(&mut self, tile_id: TileId) -> TileChange {
        if self.content.as_ref().is_some_and(|t| t.tile_id == tile_id) {
            tracing::debug!("remove_tile: content tile {tile_id} cleared");
            self.content = None;
            return TileChange::Content;
        }

        if self.local.as_ref().is_some_and(|t| t.tile_id == tile_id) {
            tracing::debug!("remove_tile: local tile {tile_id} cleared");
            self.local = None;
        } else if let Some(index) = self.remotes.iter().position(|t| t.tile_id == tile_id) {
            let removed = self.remotes.remove(index);
            tracing::debug!(
                "remove_tile: remote tile {tile_id} removed (attendee={})",
                removed.attendee_label()
            );
        } else {
            tracing::warn!("remove_tile: tile {tile_id} is not bound, ignoring");
            return TileChange::None;
        }

        self.positions.remove(&tile_id);
        self.recompute();
        TileChange::Grid
    }

    pub fn pause(&mut self, tile_id: TileId, reason: TilePauseState) -> TileChange {
        if reason == TilePauseState::Unpaused {
            return self.resume(tile_id);
        }
        self.set_pause_state(tile_id, reason)
    }

    pub fn resume(&mut self, tile_id: TileId) -> TileChange {
        self.set_pause_state(tile_id, TilePauseState::Unpaused)
    }

    fn set_pause_state(&mut self, tile_id: TileId, state: TilePauseState) -> TileChange {
        let change = match self.tile_slot_mut(tile_id) {
            Some((tile, change)) => {
                tracing::debug!("tile {tile_id}: {:?} -> {state:?}", tile.pause_state);
                tile.pause_state = state;
                change
            }
            None => {
                tracing::warn!("pause state {state:?} for unbound tile {tile_id}, ignoring");
                return TileChange::None;
            }
        };
        if change == TileChange::Grid {
            self.recompute();
        }
        change
    }

    fn tile_slot_mut(&mut self, tile_id: TileId) -> Option<(&mut TileState, TileChange)> {
        if let Some(tile) = self.content.as_mut().filter(|t| t.tile_id == tile_id) {
            return Some((tile, TileChange::Content));
        }
        if let Some(tile) = self.local.as_mut().filter(|t| t.tile_id == tile_id) {
            return Some((tile, TileChange::Grid));
        }
        self.remotes
            .iter_mut()
            .find(|t| t.tile_id == tile_id)
            .map(|t| (t, TileChange::Grid))
    }

    /// Drop every remote and content tile owned by `attendee_id`.
    pub fn remove_tiles_for_attendee(&mut self, attendee_id: &str) -> Vec<TileState> {
        let owned = |t: &TileState| t.attendee_id.as_deref() == Some(attendee_id);

        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.remotes).into_iter().partition(|t| owned(t));
        self.remotes = kept;

        let mut removed = removed;
        if self.content.as_ref().is_some_and(|t| owned(t)) {
            removed.extend(self.content.take());
        }

        for tile in &removed {
            self.positions.remove(&tile.tile_id);
        }
        if !removed.is_empty() {
            tracing::debug!("removed {} tile(s) of departed attendee {attendee_id}", removed.len());
            self.recompute();
        }
        removed
    }

    fn recompute(&mut self) {
        let mut window = Vec::with_capacity(self.max_visible);
        match &self.local {
            Some(tile) => window.push(Some(tile.clone())),
            None if self.local_placeholder => window.push(None),
            None => {}
        }

        let budget = self.capacity_for(!window.is_empty());
        window.extend(self.remotes.iter().take(budget).cloned().map(Some));

        self.positions.clear();
        for (index, slot) in window.iter().enumerate() {
            if let Some(tile) = slot {
                self.positions.insert(tile.tile_id, index);
            }
        }
        self.visible = window;
    }

    /// The grid window, local-first then remote tiles in arrival order.
    /// `None` marks the local placeholder slot.
    pub fn visible_tiles(&self) -> &[Option<TileState>] {
        &self.visible
    }

    /// Grid index of a visible tile.
    pub fn position_of(&self, tile_id: TileId) -> Option<usize> {
        self.positions.get(&tile_id).copied()
    }

    pub fn tile(&self, tile_id: TileId) -> Option<&TileState> {
        self.content
            .iter()
            .chain(self.local.iter())
            .chain(self.remotes.iter())
            .find(|t| t.tile_id == tile_id)
    }

    pub fn local_tile(&self) -> Option<&TileState> {
        self.local.as_ref()
    }

    pub fn content_tile(&self) -> Option<&TileState> {
        self.content.as_ref()
    }

    pub fn remote_tile_count(&self) -> usize {
        self.remotes.len()
    }

    /// Bound remote tiles that did not fit in the window.
    pub fn hidden_tile_count(&self) -> usize {
        let shown = self.visible.iter().flatten().filter(|t| !t.is_local_tile).count();
        self.remotes.len() - shown
    }

    pub fn clear(&mut self) {
        self.local = None;
        self.remotes.clear();
        self.content = None;
        self.recompute();
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new()
    }
}
