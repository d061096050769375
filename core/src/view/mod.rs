pub mod controller;
pub mod keys;
pub mod selection;
pub mod surface;

pub use controller::{MapViewController, MountedView};
pub use keys::{Key, KeyListener, KeyListenerRegistry};
pub use selection::Selection;
pub use surface::{
    MapSurface, MarkerDescriptor, PopupContent, PopupDescriptor, RecordingSurface, RenderFrame,
    DEFAULT_MAX_ZOOM,
};
