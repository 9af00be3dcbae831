use crate::models::Model;
use rand::Rng;
use rand::seq::SliceRandom;

/// An ephemeral permutation of the three model identifiers, binding each model
/// to a display slot (A/B/C) for one sample-viewing session.
///
/// The order is generated once per sample and must stay fixed while the
/// reviewer is scoring it; it is discarded when moving to another sample and
/// is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOrder([Model; 3]);

impl DisplayOrder {
    /// Return the session's existing order unchanged, or bind a fresh uniform
    /// permutation when none exists yet
    pub fn assign<R: Rng>(existing: Option<DisplayOrder>, rng: &mut R) -> DisplayOrder {
        match existing {
            Some(order) => order,
            None => DisplayOrder::random(rng),
        }
    }

    /// Draw a uniform permutation of the three models
    pub fn random<R: Rng>(rng: &mut R) -> DisplayOrder {
        let mut models = Model::ALL;
        models.shuffle(rng);
        DisplayOrder(models)
    }

    /// Models in display order: index 0 is slot A, 1 is B, 2 is C
    pub fn models(&self) -> [Model; 3] {
        self.0
    }

    /// The display letter for a slot index
    pub fn slot_label(slot: usize) -> char {
        (b'A' + slot as u8) as char
    }

    /// Resolve a display letter (case-insensitive) back to the real model
    pub fn model_for_label(&self, label: char) -> Option<Model> {
        let slot = (label.to_ascii_uppercase() as u8).checked_sub(b'A')? as usize;
        self.0.get(slot).copied()
    }
}
