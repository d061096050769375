//! Core state model for the EV charging-station map.
//!
//! The map view keeps three pieces of state (viewport, station selection and
//! the last search overlay) and mutates them only through the event handlers
//! of [`view::MapViewController`]. Rendering and geocoding are collaborators
//! reached through the [`view::MapSurface`] and [`search::LocationSearch`]
//! traits so the controller never depends on a mapping library.

pub mod dataset;
pub mod math;
pub mod model;
pub mod prelude;
pub mod search;
pub mod telemetry;
pub mod view;

pub use prelude::{ViewError, ViewEvent, ViewResult};
pub use view::{MapSurface, MapViewController, MountedView};
