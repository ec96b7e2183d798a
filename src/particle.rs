use aggregation_common::Position;

/// A lattice occupant. Identity is positional within the owning collection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle<const D: usize> {
    pub position: Position<D>,
    /// Growth score used by Eden-type models, 0 elsewhere.
    pub score: f32,
}

impl<const D: usize> Particle<D> {
    pub fn new(position: Position<D>) -> Self {
        Particle { position, score: 0.0 }
    }

    pub fn with_score(position: Position<D>, score: f32) -> Self {
        Particle { position, score }
    }

    /// Moves the particle by a lattice offset.
    #[inline(always)]
    pub fn step_by(&mut self, offset: Position<D>) {
        self.position += offset;
    }
}
