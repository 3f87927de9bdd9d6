use bitflags::bitflags;

/// Which scene object a visible object stands for: an index into the
/// ellipsoid or the wall slice handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectId {
    Ellipsoid(u16),
    Rect(u16),
}

/// Counters of the last frame, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// objects that passed the visibility test
    pub visible: usize,
    /// "draw before" constraints found between overlapping objects
    pub edges: usize,
    /// dependency cycles that had an edge dropped to make progress
    pub cycles_broken: usize,
}

bitflags! {
    /// On which sides of a plane a set of points was found.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Sides: u8 {
        const POSITIVE = 0b01;
        const NEGATIVE = 0b10;
    }
}

impl Sides {
    /// Classify one signed distance; values within `eps` of zero vote for
    /// neither side.
    #[inline]
    pub fn of(distance: f32, eps: f32) -> Self {
        if distance > eps {
            Sides::POSITIVE
        } else if distance < -eps {
            Sides::NEGATIVE
        } else {
            Sides::empty()
        }
    }

    /// The single side, if every voting point agreed.
    pub fn strict(self) -> Option<Self> {
        (self == Sides::POSITIVE || self == Sides::NEGATIVE).then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_vote() {
        let eps = 1e-3;
        let all = [0.5, 2.0, 0.0005].iter().fold(Sides::empty(), |s, &d| s | Sides::of(d, eps));
        assert_eq!(all.strict(), Some(Sides::POSITIVE));

        let mixed = Sides::of(0.5, eps) | Sides::of(-0.5, eps);
        assert_eq!(mixed.strict(), None);
        assert_eq!(Sides::of(1e-4, eps).strict(), None);
    }
}
