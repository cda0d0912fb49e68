//! Visibility dependency graph.
//!
//! Each `visible_if` is an edge from a property to the property gating it.
//! The graph is checked for cycles once, when the schema is built, so that
//! evaluation can follow edges without a depth guard.

use std::collections::{BTreeMap, HashMap};

use crate::error::SchemaError;
use crate::key::{PropertyKey, Snapshot};
use crate::descriptor::Visibility;

/// Directed graph of `visible_if` edges.
#[derive(Debug, Clone, Default)]
pub struct VisibilityGraph {
    edges: BTreeMap<PropertyKey, Visibility>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl VisibilityGraph {
    /// Build the graph, rejecting cycles.
    pub fn new(
        edges: impl IntoIterator<Item = (PropertyKey, Visibility)>,
    ) -> Result<Self, SchemaError> {
        let graph = VisibilityGraph {
            edges: edges.into_iter().collect(),
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), SchemaError> {
        let mut marks: HashMap<PropertyKey, Mark> = HashMap::new();

        for &start in self.edges.keys() {
            if marks.contains_key(&start) {
                continue;
            }

            let mut path = vec![start];
            marks.insert(start, Mark::Visiting);

            while let Some(&current) = path.last() {
                match self.edges.get(&current).map(|v| v.key) {
                    Some(next) => match marks.get(&next) {
                        Some(Mark::Visiting) => {
                            let from = path.iter().position(|k| *k == next).unwrap_or(0);
                            let mut cycle = path[from..].to_vec();
                            cycle.push(next);
                            return Err(SchemaError::CyclicVisibility { cycle });
                        }
                        Some(Mark::Done) => {
                            Self::finish(&mut path, &mut marks);
                        }
                        None => {
                            marks.insert(next, Mark::Visiting);
                            path.push(next);
                        }
                    },
                    None => Self::finish(&mut path, &mut marks),
                }
            }
        }
        Ok(())
    }

    /// Every node on the current path has out-degree one, so reaching a
    /// finished node finishes the whole path.
    fn finish(path: &mut Vec<PropertyKey>, marks: &mut HashMap<PropertyKey, Mark>) {
        for key in path.drain(..) {
            marks.insert(key, Mark::Done);
        }
    }

    /// Evaluate visibility of `key`.
    ///
    /// A property is visible when it has no dependency, or when its
    /// dependency is itself visible and the dependency's value is truthy
    /// (falsy when inverted). A dependency with no value counts as visible.
    pub fn is_visible(&self, key: &PropertyKey, snapshot: &Snapshot) -> bool {
        let mut current = *key;
        // Terminates: the graph is acyclic.
        while let Some(visibility) = self.edges.get(&current) {
            let Some(value) = visibility.key.value_in(snapshot) else {
                return true;
            };
            if value.is_truthy() == visibility.invert {
                return false;
            }
            current = visibility.key;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ActionKey;
    use shade_protocol::{ConfigField, StatusField};

    const HOMED: PropertyKey = PropertyKey::Status(StatusField::Homed);
    const MOVING: PropertyKey = PropertyKey::Status(StatusField::Moving);
    const POSITION: PropertyKey = PropertyKey::Status(StatusField::Position);
    const MQTT: PropertyKey = PropertyKey::Config(ConfigField::SysMqtt);
    const MQTT_HOST: PropertyKey = PropertyKey::Config(ConfigField::SysMqttHost);

    #[test]
    fn test_rejects_two_node_cycle() {
        let err = VisibilityGraph::new([
            (HOMED, Visibility::when(MOVING)),
            (MOVING, Visibility::when(HOMED)),
        ])
        .unwrap_err();

        match err {
            SchemaError::CyclicVisibility { cycle } => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_self_reference() {
        let err = VisibilityGraph::new([(HOMED, Visibility::when(HOMED))]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::CyclicVisibility {
                cycle: vec![HOMED, HOMED]
            }
        );
    }

    #[test]
    fn test_rejects_cycle_behind_tail() {
        let err = VisibilityGraph::new([
            (POSITION, Visibility::when(MOVING)),
            (MOVING, Visibility::when(MQTT)),
            (MQTT, Visibility::when(MOVING)),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::CyclicVisibility { .. }));
    }

    #[test]
    fn test_accepts_shared_dependency() {
        let graph = VisibilityGraph::new([
            (MOVING, Visibility::when(HOMED)),
            (POSITION, Visibility::when(HOMED)),
            (MQTT_HOST, Visibility::when(MQTT)),
        ])
        .unwrap();
        let snapshot = Snapshot::default();
        assert!(!graph.is_visible(&MOVING, &snapshot));
        assert!(!graph.is_visible(&POSITION, &snapshot));
    }

    #[test]
    fn test_chained_visibility() {
        let graph = VisibilityGraph::new([
            (MOVING, Visibility::when(HOMED)),
            (POSITION, Visibility::when(MOVING)),
        ])
        .unwrap();

        let mut snapshot = Snapshot::default();
        snapshot.status.moving = true;
        // Moving is hidden while not homed, which hides position too.
        assert!(!graph.is_visible(&POSITION, &snapshot));

        snapshot.status.homed = true;
        assert!(graph.is_visible(&POSITION, &snapshot));
    }

    #[test]
    fn test_valueless_dependency_is_shown() {
        let graph = VisibilityGraph::new([(
            MOVING,
            Visibility::when(PropertyKey::Action(ActionKey::Open)),
        )])
        .unwrap();
        assert!(graph.is_visible(&MOVING, &Snapshot::default()));
    }
}
