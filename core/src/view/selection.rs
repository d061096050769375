use crate::model::StationId;
use serde::Serialize;

/// At most one highlighted station, referenced by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "station")]
pub enum Selection {
    #[default]
    Empty,
    Selected(StationId),
}

impl Selection {
    pub fn station(&self) -> Option<StationId> {
        match self {
            Selection::Empty => None,
            Selection::Selected(id) => Some(*id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }

    /// Replaces any previous selection.
    pub fn select(&mut self, id: StationId) {
        *self = Selection::Selected(id);
    }

    pub fn clear(&mut self) {
        *self = Selection::Empty;
    }

    /// Drops the selection when `keep` rejects the referenced station.
    /// Returns true if the selection was cleared.
    pub fn retain<F: Fn(StationId) -> bool>(&mut self, keep: F) -> bool {
        match self.station() {
            Some(id) if !keep(id) => {
                self.clear();
                true
            }
            _ => false,
        }
    }
}
