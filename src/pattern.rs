//! Minimal in-memory design: an ordered thread list and an ordered list of
//! absolute stitches.

use serde::{Deserialize, Serialize};

use crate::stitch::StitchType;

/// Flag byte written alongside colors created in memory.
pub const DEFAULT_COLOR_FLAG: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub color: Rgb,
    /// Fourth byte of the stored color entry.  Carried through unchanged.
    pub flag:  u8,
}

impl Thread {
    pub fn new(color: Rgb) -> Self {
        Self { color, flag: DEFAULT_COLOR_FLAG }
    }
}

/// A stitch at an absolute position in design units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stitch {
    pub x:    f64,
    pub y:    f64,
    pub kind: StitchType,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left:   f64,
    pub top:    f64,
    pub right:  f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub threads:  Vec<Thread>,
    pub stitches: Vec<Stitch>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_thread(&mut self, thread: Thread) {
        self.threads.push(thread);
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    /// Append a stitch offset from the previous one (or from the origin).
    pub fn add_stitch_rel(&mut self, dx: f64, dy: f64, kind: StitchType) {
        let (x, y) = self.stitches.last().map_or((0.0, 0.0), |s| (s.x, s.y));
        self.stitches.push(Stitch { x: x + dx, y: y + dy, kind });
    }

    pub fn add_stitch_abs(&mut self, x: f64, y: f64, kind: StitchType) {
        self.stitches.push(Stitch { x, y, kind });
    }

    pub fn stitch_count(&self) -> usize {
        self.stitches.len()
    }

    pub fn stitches(&self) -> impl Iterator<Item = &Stitch> {
        self.stitches.iter()
    }

    /// Moves between consecutive stitches, the first measured from the origin.
    pub fn relative_moves(&self) -> impl Iterator<Item = (f64, f64, StitchType)> + '_ {
        self.stitches.iter().scan((0.0, 0.0), |prev, s| {
            let (px, py) = *prev;
            *prev = (s.x, s.y);
            Some((s.x - px, s.y - py, s.kind))
        })
    }

    /// Extent of every stitch position.  An empty pattern has a zero rect.
    pub fn bounding_box(&self) -> Rect {
        let mut iter = self.stitches.iter();
        let Some(first) = iter.next() else {
            return Rect::default();
        };
        iter.fold(
            Rect { left: first.x, top: first.y, right: first.x, bottom: first.y },
            |r, s| Rect {
                left:   r.left.min(s.x),
                top:    r.top.min(s.y),
                right:  r.right.max(s.x),
                bottom: r.bottom.max(s.y),
            },
        )
    }
}
