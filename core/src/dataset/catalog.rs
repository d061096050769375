use crate::model::{StationId, StationRecord};
use crate::prelude::DatasetError;
use std::collections::HashMap;

/// Read-only station collection with an identifier index.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<StationRecord>,
    index: HashMap<StationId, usize>,
}

impl StationCatalog {
    pub fn new(stations: Vec<StationRecord>) -> Result<Self, DatasetError> {
        let mut index = HashMap::with_capacity(stations.len());
        for (position, station) in stations.iter().enumerate() {
            if index.insert(station.identifier, position).is_some() {
                return Err(DatasetError::DuplicateStation(station.identifier));
            }
        }
        Ok(Self { stations, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: StationId) -> Option<&StationRecord> {
        self.index.get(&id).map(|&position| &self.stations[position])
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationRecord> {
        self.stations.iter()
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indexes_by_identifier() {
        let catalog = StationCatalog::new(vec![
            StationRecord::new(7, 45.0, -75.0, "Alpha", "Ottawa"),
            StationRecord::new(3, 46.0, -74.0, "Beta", "Gatineau"),
        ])
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(StationId(3)).unwrap().title, "Beta");
        assert!(catalog.get(StationId(4)).is_none());
        let order: Vec<_> = catalog.iter().map(|s| s.identifier.0).collect();
        assert_eq!(order, vec![7, 3]);
    }

    #[test]
    fn catalog_rejects_duplicate_identifiers() {
        let err = StationCatalog::new(vec![
            StationRecord::new(1, 45.0, -75.0, "Alpha", "Ottawa"),
            StationRecord::new(1, 46.0, -74.0, "Beta", "Gatineau"),
        ])
        .unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateStation(StationId(1))));
    }
}
