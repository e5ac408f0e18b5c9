use serde::{Deserialize, Serialize};
use std::fmt;

/// Position identifier, unique within one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id sequence owned by a single engine instance.
///
/// Each engine carries its own generator, so independent runs never share
/// numbering state.
#[derive(Debug, Clone)]
pub struct PositionIdGen {
    next: u64,
}

impl Default for PositionIdGen {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl PositionIdGen {
    pub fn next_id(&mut self) -> PositionId {
        let id = PositionId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increment() {
        let mut ids = PositionIdGen::default();
        assert_eq!(ids.next_id(), PositionId(1));
        assert_eq!(ids.next_id(), PositionId(2));
    }

    #[test]
    fn generators_are_independent() {
        let mut a = PositionIdGen::default();
        let mut b = PositionIdGen::default();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id(), PositionId(1));
    }
}
