use crate::models::SensorId;
use indexmap::IndexMap;

/// Sensors grouped by location. Locations keep their first-declaration order;
/// within a location the most recently added sensor comes first.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    groups: IndexMap<String, Vec<SensorId>>,
}

impl LocationIndex {
    pub fn insert(&mut self, location: &str, sensor: SensorId) {
        match self.groups.get_mut(location) {
            Some(group) => group.insert(0, sensor),
            None => {
                self.groups.insert(location.to_string(), vec![sensor]);
            }
        }
    }

    /// Sensors of `location` in link order, empty if the location is unknown.
    pub fn sensors(&self, location: &str) -> &[SensorId] {
        self.groups.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SensorId])> + '_ {
        self.groups
            .iter()
            .map(|(location, group)| (location.as_str(), group.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_lifo_within_location() {
        let mut index = LocationIndex::default();
        index.insert("kitchen", SensorId(0));
        index.insert("porch", SensorId(1));
        index.insert("kitchen", SensorId(2));

        assert_eq!(index.sensors("kitchen"), &[SensorId(2), SensorId(0)]);
        assert_eq!(index.sensors("porch"), &[SensorId(1)]);
        assert!(index.sensors("attic").is_empty());
    }

    #[test]
    fn test_locations_keep_declaration_order() {
        let mut index = LocationIndex::default();
        index.insert("porch", SensorId(0));
        index.insert("kitchen", SensorId(1));
        index.insert("porch", SensorId(2));

        let order: Vec<&str> = index.iter().map(|(location, _)| location).collect();
        assert_eq!(order, vec!["porch", "kitchen"]);
        assert_eq!(index.len(), 2);
    }
}
