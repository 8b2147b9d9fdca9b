use std::collections::HashMap;

use crate::geometry::Point3;
use crate::tween::Tween;

/// Launch delay added per registry position, sequencing the cascade.
pub const STAGGER_STEP_SECS: f32 = 0.08;

/// Duration of each part's position tween.
pub const EXPLODE_TWEEN_SECS: f32 = 0.9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssemblyState {
    #[default]
    Assembled,
    Exploded,
}

impl AssemblyState {
    pub fn toggled(self) -> AssemblyState {
        match self {
            AssemblyState::Assembled => AssemblyState::Exploded,
            AssemblyState::Exploded => AssemblyState::Assembled,
        }
    }
}

/// One selectable part: a stable key and its two placements.
#[derive(Clone, Debug, PartialEq)]
pub struct PartSpec {
    pub key: String,
    pub final_position: Point3,
    pub exploded_position: Point3,
}

impl PartSpec {
    pub fn target_for(&self, state: AssemblyState) -> Point3 {
        match state {
            AssemblyState::Assembled => self.final_position,
            AssemblyState::Exploded => self.exploded_position,
        }
    }
}

/// Insertion-ordered part registry. Unknown-key lookups return `None` and
/// are treated as no-ops by every caller, never as errors.
#[derive(Clone, Debug, Default)]
pub struct PartCatalog {
    specs: Vec<PartSpec>,
}

impl PartCatalog {
    pub fn push(&mut self, spec: PartSpec) {
        if self.index_of(&spec.key).is_none() {
            self.specs.push(spec);
        }
    }

    pub fn get(&self, key: &str) -> Option<&PartSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Worst-case settle time for a full cascade over this catalog.
    pub fn cascade_secs(&self) -> f32 {
        if self.specs.is_empty() {
            return 0.0;
        }
        (self.specs.len() - 1) as f32 * STAGGER_STEP_SECS + EXPLODE_TWEEN_SECS
    }
}

/// Explode/assemble machine. `toggle` is the only transition; re-toggling
/// mid-flight cancels every in-flight tween before starting new ones from
/// each part's current (possibly mid-tween) position.
#[derive(Clone, Debug, Default)]
pub struct ExplodeMachine {
    state: AssemblyState,
    tweens: Vec<(String, Tween)>,
}

impl ExplodeMachine {
    pub fn state(&self) -> AssemblyState {
        self.state
    }

    pub fn in_flight(&self) -> usize {
        self.tweens.len()
    }

    pub fn toggle(&mut self, catalog: &PartCatalog, current_positions: &HashMap<String, Point3>) {
        self.state = self.state.toggled();
        self.tweens.clear();

        for (index, spec) in catalog.iter().enumerate() {
            let start = current_positions
                .get(&spec.key)
                .copied()
                .unwrap_or_else(|| spec.target_for(self.state.toggled()));
            let end = spec.target_for(self.state);
            self.tweens.push((
                spec.key.clone(),
                Tween::new(
                    start,
                    end,
                    index as f32 * STAGGER_STEP_SECS,
                    EXPLODE_TWEEN_SECS,
                ),
            ));
        }
    }

    /// Advance all tweens by one frame delta; returns the positions to apply
    /// this frame. Finished tweens emit their end position once more and are
    /// then dropped, so nothing keeps writing after settling.
    pub fn advance(&mut self, dt_secs: f32) -> Vec<(String, Point3)> {
        let mut updates = Vec::with_capacity(self.tweens.len());
        for (key, tween) in &mut self.tweens {
            updates.push((key.clone(), tween.advance(dt_secs)));
        }
        self.tweens.retain(|(_, tween)| !tween.finished());
        updates
    }

    pub fn is_settled(&self) -> bool {
        self.tweens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> PartCatalog {
        let mut catalog = PartCatalog::default();
        for (index, key) in ["pumpjack", "separator", "flare-stack"].iter().enumerate() {
            catalog.push(PartSpec {
                key: key.to_string(),
                final_position: Point3::new(index as f32 * 4.0, 0.0, 0.0),
                exploded_position: Point3::new(index as f32 * 4.0, 6.0, -8.0),
            });
        }
        catalog
    }

    fn positions_of(catalog: &PartCatalog, state: AssemblyState) -> HashMap<String, Point3> {
        catalog
            .iter()
            .map(|spec| (spec.key.clone(), spec.target_for(state)))
            .collect()
    }

    fn run_to_settle(machine: &mut ExplodeMachine, dt: f32) -> HashMap<String, Point3> {
        let mut latest = HashMap::new();
        let mut guard = 0;
        while !machine.is_settled() {
            for (key, position) in machine.advance(dt) {
                latest.insert(key, position);
            }
            guard += 1;
            assert!(guard < 10_000, "machine must settle");
        }
        latest
    }

    #[test]
    fn catalog_preserves_insertion_order_and_rejects_duplicates() {
        let mut catalog = sample_catalog();
        catalog.push(PartSpec {
            key: "pumpjack".to_string(),
            final_position: Point3::ZERO,
            exploded_position: Point3::ZERO,
        });

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.index_of("pumpjack"), Some(0));
        assert_eq!(catalog.index_of("flare-stack"), Some(2));
        assert_eq!(catalog.index_of("wellhead-trees"), None);
    }

    #[test]
    fn toggle_moves_every_part_to_exploded_position() {
        let catalog = sample_catalog();
        let mut machine = ExplodeMachine::default();
        machine.toggle(&catalog, &positions_of(&catalog, AssemblyState::Assembled));
        assert_eq!(machine.state(), AssemblyState::Exploded);

        let settled = run_to_settle(&mut machine, 0.016);
        for spec in catalog.iter() {
            let position = settled.get(&spec.key).copied().expect("part settled");
            assert!(position.distance(spec.exploded_position) < 1e-4);
        }
    }

    #[test]
    fn stagger_sequences_later_parts_behind_earlier_ones() {
        let catalog = sample_catalog();
        let mut machine = ExplodeMachine::default();
        machine.toggle(&catalog, &positions_of(&catalog, AssemblyState::Assembled));

        // Inside the second part's launch delay only the first part moves.
        let updates = machine.advance(STAGGER_STEP_SECS * 0.5);
        let moved: Vec<bool> = catalog
            .iter()
            .map(|spec| {
                updates
                    .iter()
                    .find(|(key, _)| key == &spec.key)
                    .map(|(_, position)| position.distance(spec.final_position) > 1e-6)
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(moved, vec![true, false, false]);
    }

    #[test]
    fn double_toggle_returns_all_parts_to_original_targets() {
        let catalog = sample_catalog();
        let mut machine = ExplodeMachine::default();
        let mut current = positions_of(&catalog, AssemblyState::Assembled);

        machine.toggle(&catalog, &current);
        // Partway through the cascade, toggle again from mid-tween positions.
        for (key, position) in machine.advance(0.3) {
            current.insert(key, position);
        }
        machine.toggle(&catalog, &current);
        assert_eq!(machine.state(), AssemblyState::Assembled);

        let settled = run_to_settle(&mut machine, 0.016);
        for spec in catalog.iter() {
            let position = settled.get(&spec.key).copied().expect("part settled");
            assert!(position.distance(spec.final_position) < 1e-4);
        }
        assert!(machine.is_settled(), "no orphaned tween after settling");
    }

    #[test]
    fn cascade_secs_covers_duration_plus_max_stagger() {
        let catalog = sample_catalog();
        let expected = 2.0 * STAGGER_STEP_SECS + EXPLODE_TWEEN_SECS;
        assert!((catalog.cascade_secs() - expected).abs() < 1e-6);
        assert_eq!(PartCatalog::default().cascade_secs(), 0.0);
    }
}
