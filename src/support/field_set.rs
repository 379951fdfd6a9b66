//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Propbag.
//
// Propbag is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Propbag is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Propbag. If not, see <http://www.gnu.org/licenses/>.

use std::fmt;

/// A set of schema slots, i.e. indices into a `Schema`'s descriptor table.
///
/// Schemas rarely have more than a few dozen properties, so the first 64
/// slots are held inline and only larger schemas spill onto the heap.
#[derive(Clone, Default)]
pub struct FieldSet {
    near: u64,
    far: Vec<u64>,
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FieldSet")?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `slot` into the set.
    ///
    /// Returns true if the slot was not already present.
    pub fn insert(&mut self, slot: usize) -> bool {
        let (word, mask) = self.word_mut(slot);
        let added = 0 == (*word & mask);
        *word |= mask;
        added
    }

    /// Remove `slot` from the set.
    ///
    /// Returns true if the slot was present.
    pub fn remove(&mut self, slot: usize) -> bool {
        let (word, mask) = self.word_mut(slot);
        let removed = 0 != (*word & mask);
        *word &= !mask;
        removed
    }

    pub fn contains(&self, slot: usize) -> bool {
        if slot < 64 {
            0 != (self.near & (1 << slot))
        } else {
            self.far
                .get(slot / 64 - 1)
                .map_or(false, |&word| 0 != (word & (1 << (slot % 64))))
        }
    }

    pub fn is_empty(&self) -> bool {
        0 == self.near && self.far.iter().all(|&w| 0 == w)
    }

    pub fn len(&self) -> usize {
        self.near.count_ones() as usize
            + self
                .far
                .iter()
                .map(|w| w.count_ones() as usize)
                .sum::<usize>()
    }

    pub fn clear(&mut self) {
        self.near = 0;
        self.far.clear();
    }

    /// Add every slot in `other` to this set.
    pub fn union_with(&mut self, other: &FieldSet) {
        self.near |= other.near;
        if self.far.len() < other.far.len() {
            self.far.resize(other.far.len(), 0);
        }
        for (dst, &src) in self.far.iter_mut().zip(&other.far) {
            *dst |= src;
        }
    }

    /// Iterate the slots in the set in ascending order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = usize> + 'a {
        std::iter::once(self.near)
            .chain(self.far.iter().copied())
            .enumerate()
            .flat_map(|(ix, word)| {
                (0..64)
                    .filter(move |&bit| 0 != (word & (1 << bit)))
                    .map(move |bit| bit + ix * 64)
            })
    }

    fn word_mut(&mut self, slot: usize) -> (&mut u64, u64) {
        if slot < 64 {
            (&mut self.near, 1 << slot)
        } else {
            let ix = slot / 64 - 1;
            if self.far.len() <= ix {
                self.far.resize(ix + 1, 0);
            }

            (&mut self.far[ix], 1 << (slot % 64))
        }
    }
}
