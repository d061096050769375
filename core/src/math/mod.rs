pub mod projection;

pub use projection::ViewportProjection;
