pub mod catalog;
pub mod source;

pub use catalog::StationCatalog;
pub use source::{parse_dataset, JsonFileSource, StaticSource, StationSource};
