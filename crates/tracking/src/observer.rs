use foundation::ids::VehicleId;

/// Callbacks to the surrounding page when selection changes.
pub trait SelectionObserver {
    fn on_bus_select(&mut self, vehicle: Option<&VehicleId>);
    fn set_following(&mut self, following: bool);
}
