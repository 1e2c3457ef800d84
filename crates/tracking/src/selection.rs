use foundation::ids::VehicleId;

/// Which bus, if any, is selected, and whether the camera follows it.
///
/// `following` is only ever true while a bus is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<VehicleId>,
    following: bool,
}

impl SelectionState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&VehicleId> {
        self.selected.as_ref()
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_idle(&self) -> bool {
        self.selected.is_none()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeselectCause {
    /// A click on empty map surface.
    Background,
    /// The "my location" control.
    Locate,
    /// The surrounding page cleared the selection.
    External,
}

impl DeselectCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeselectCause::Background => "background",
            DeselectCause::Locate => "locate",
            DeselectCause::External => "external",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Selected {
        previous: Option<VehicleId>,
        current: VehicleId,
    },
    Deselected {
        previous: VehicleId,
        cause: DeselectCause,
    },
}

impl Transition {
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Unchanged)
    }
}

/// Selection state machine: Idle or SelectedFollowing(id).
#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Selects `id` and enables following.
    ///
    /// Selecting the already-selected bus is still reported as `Selected`, so
    /// the caller recenters and re-notifies.
    pub fn select(&mut self, id: VehicleId) -> Transition {
        let previous = self.state.selected.replace(id.clone());
        self.state.following = true;
        tracing::debug!(vehicle_id = %id, "bus selected");
        Transition::Selected {
            previous,
            current: id,
        }
    }

    /// Clears the selection. A no-op while idle.
    pub fn deselect(&mut self, cause: DeselectCause) -> Transition {
        self.state.following = false;
        match self.state.selected.take() {
            Some(previous) => {
                tracing::debug!(vehicle_id = %previous, cause = cause.as_str(), "bus deselected");
                Transition::Deselected { previous, cause }
            }
            None => Transition::Unchanged,
        }
    }

    pub fn reset(&mut self) {
        self.state = SelectionState::idle();
    }
}
