//! Track navigation policy: which catalog entry comes after (or before) the
//! current one, given what is visible and whether shuffle is on.
//!
//! Positions are catalog indices. The navigator never touches the catalog;
//! it only orders the indices it is handed.

use rand::Rng;
use rand::seq::SliceRandom;
use rand::thread_rng;

#[derive(Clone, Debug, Default)]
pub struct Navigator {
    wrap_around: bool,
    /// Shuffled permutation of the whole catalog, present while shuffle is on.
    shuffled: Option<Vec<usize>>,
}

impl Navigator {
    pub fn new(wrap_around: bool) -> Self {
        Self {
            wrap_around,
            shuffled: None,
        }
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled.is_some()
    }

    /// Turn shuffle on or off. Switching it on draws a fresh permutation of
    /// `catalog_len` entries; staying on keeps the current one.
    pub fn set_shuffle(&mut self, on: bool, catalog_len: usize) {
        self.set_shuffle_with(on, catalog_len, &mut thread_rng());
    }

    pub fn set_shuffle_with<R: Rng + ?Sized>(&mut self, on: bool, catalog_len: usize, rng: &mut R) {
        match (on, self.shuffled.is_some()) {
            (true, false) => {
                let mut order: Vec<usize> = (0..catalog_len).collect();
                order.shuffle(rng);
                tracing::debug!(len = catalog_len, "shuffle order drawn");
                self.shuffled = Some(order);
            }
            (false, true) => self.shuffled = None,
            _ => {}
        }
    }

    /// `visible` in playback order: unchanged, or following the shuffled
    /// permutation.
    pub fn order(&self, visible: &[usize]) -> Vec<usize> {
        match self.shuffled.as_deref() {
            Some(permutation) => permutation
                .iter()
                .copied()
                .filter(|i| visible.contains(i))
                .collect(),
            None => visible.to_vec(),
        }
    }

    /// The entry after `current`. From an unknown position, the first entry.
    pub fn next(&self, current: Option<usize>, visible: &[usize]) -> Option<usize> {
        let order = self.order(visible);
        let pos = current.and_then(|c| order.iter().position(|&i| i == c));
        match pos {
            None => order.first().copied(),
            Some(p) if p + 1 < order.len() => Some(order[p + 1]),
            Some(_) if self.wrap_around => order.first().copied(),
            Some(_) => None,
        }
    }

    /// The entry before `current`. From an unknown position there is none
    /// unless wrapping, which lands on the last entry.
    pub fn previous(&self, current: Option<usize>, visible: &[usize]) -> Option<usize> {
        let order = self.order(visible);
        let pos = current.and_then(|c| order.iter().position(|&i| i == c));
        match pos {
            Some(p) if p > 0 => Some(order[p - 1]),
            _ if self.wrap_around => order.last().copied(),
            _ => None,
        }
    }
}
