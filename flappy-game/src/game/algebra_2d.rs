use std::ops::{Add, Sub};

/// Integer screen position; TOP / LEFT corner is 0/0, y grows downwards
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos2 {
    pub x: i32,
    pub y: i32,
}

impl Pos2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add<Vec2> for Pos2 {
    type Output = Pos2;

    fn add(self, rhs: Vec2) -> Self::Output {
        Pos2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Pos2 {
    type Output = Vec2;

    fn sub(self, rhs: Pos2) -> Self::Output {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned Bounding Box.
/// `min` is inclusive, `max` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AaBB {
    pub min: Pos2,
    pub max: Pos2,
}

impl AaBB {
    pub fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        AaBB {
            min: Pos2::new(left, top),
            max: Pos2::new(left + width, top + height),
        }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    /// rounds towards the top-left corner
    pub fn center(&self) -> Pos2 {
        Pos2::new(
            self.min.x + self.width().div_euclid(2),
            self.min.y + self.height().div_euclid(2),
        )
    }

    pub fn translate(&self, value: Vec2) -> Self {
        AaBB {
            min: self.min + value,
            max: self.max + value,
        }
    }

    /// Overlap with a non-empty area; touching edges do not count
    pub fn intersects(&self, other: &AaBB) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}
