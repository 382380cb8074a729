//! Bounded pool of in-flight states ordered by score.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap};

use log::trace;
use rand::Rng;
use serde::Serialize;

use crate::error::{ResolverError, Result};
use crate::state::{State, StateId};

/// Total order over scores so they can key a map.
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Rank of a state: higher score first, then older insertion first.
type Rank = (Score, Reverse<u64>);

#[derive(Debug)]
struct Entry {
    state: State,
    rank: Rank,
    slot: usize,
}

/// Beam size and best score recorded at the start of an iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamHistoryEntry {
    pub size: usize,
    pub max_score: Option<f64>,
}

/// Interpret a configured width where `-1` means unbounded.
pub fn parse_width(width: i64) -> Result<Option<usize>> {
    match width {
        -1 => Ok(None),
        w if w > 0 => usize::try_from(w)
            .map(Some)
            .map_err(|_| ResolverError::Config(format!("beam width {} is too large", w))),
        w => Err(ResolverError::Config(format!(
            "beam width must be a positive integer or -1 for unbounded, got {}",
            w
        ))),
    }
}

/// States waiting to be expanded.
///
/// When a width is set the beam keeps the best `width` states seen so far:
/// a new state either replaces the current minimum or is turned away. Among
/// equal scores the most recently added state ranks lowest.
#[derive(Debug)]
pub struct Beam {
    width: Option<usize>,
    keep_history: bool,
    entries: HashMap<StateId, Entry>,
    ranking: BTreeMap<Rank, StateId>,
    slots: Vec<StateId>,
    sequence: u64,
    last_added: Option<StateId>,
    history: Vec<BeamHistoryEntry>,
}

impl Beam {
    pub fn new(width: Option<usize>) -> Result<Self> {
        if width == Some(0) {
            return Err(ResolverError::Config(
                "beam width must be a positive integer or unbounded".to_string(),
            ));
        }

        Ok(Self {
            width,
            keep_history: false,
            entries: HashMap::new(),
            ranking: BTreeMap::new(),
            slots: Vec::new(),
            sequence: 0,
            last_added: None,
            history: Vec::new(),
        })
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert a state. Returns the state that did not fit: either the
    /// evicted minimum or the new state itself when it ranks below every
    /// kept one.
    pub fn add_state(&mut self, state: State) -> Option<State> {
        if self.entries.contains_key(&state.id()) {
            // Re-adding a held state only refreshes its rank
            let id = state.id();
            self.remove(id);
            return self.add_state(state);
        }

        self.sequence += 1;
        let rank = (Score(state.score), Reverse(self.sequence));

        let mut evicted = None;
        if let Some(width) = self.width {
            if self.entries.len() >= width {
                let lowest = self.ranking.keys().next().copied();
                match lowest {
                    Some(lowest) if rank < lowest => {
                        trace!(
                            "Beam full, dropping state {} with score {}",
                            state.id(),
                            state.score
                        );
                        return Some(state);
                    }
                    Some(_) => evicted = self.pop_lowest(),
                    None => {}
                }
            }
        }

        let id = state.id();
        self.ranking.insert(rank, id);
        self.slots.push(id);
        self.entries.insert(
            id,
            Entry {
                state,
                rank,
                slot: self.slots.len() - 1,
            },
        );
        self.last_added = Some(id);

        evicted
    }

    fn pop_lowest(&mut self) -> Option<State> {
        let id = *self.ranking.values().next()?;
        trace!("Evicting state {} from beam", id);
        self.remove(id)
    }

    /// Highest scoring state.
    pub fn max(&self) -> Result<&State> {
        let id = self
            .ranking
            .values()
            .next_back()
            .ok_or_else(|| ResolverError::Internal("max() called on an empty beam".to_string()))?;
        self.get_by_id(*id)
            .ok_or_else(|| ResolverError::Internal(format!("beam lost track of state {}", id)))
    }

    pub fn top(&self) -> Result<&State> {
        self.max()
    }

    /// State at a rank, 0 being the best.
    pub fn get(&self, index: usize) -> Option<&State> {
        self.ranking.values().rev().nth(index).and_then(|id| self.get_by_id(*id))
    }

    pub fn get_by_id(&self, id: StateId) -> Option<&State> {
        self.entries.get(&id).map(|entry| &entry.state)
    }

    /// The most recently inserted state, if it is still held.
    pub fn get_last(&self) -> Option<&State> {
        self.last_added.and_then(|id| self.get_by_id(id))
    }

    pub fn get_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&State> {
        if self.slots.is_empty() {
            return None;
        }
        let id = self.slots[rng.gen_range(0..self.slots.len())];
        self.get_by_id(id)
    }

    /// Remove a state by id. Removing a state that is not held is a no-op.
    pub fn remove(&mut self, id: StateId) -> Option<State> {
        let entry = self.entries.remove(&id)?;
        self.ranking.remove(&entry.rank);

        self.slots.swap_remove(entry.slot);
        if let Some(moved) = self.slots.get(entry.slot).copied() {
            if let Some(moved) = self.entries.get_mut(&moved) {
                moved.slot = entry.slot;
            }
        }

        if self.last_added == Some(id) {
            self.last_added = None;
        }

        Some(entry.state)
    }

    /// Remove and return the state at rank `index`, or the best state.
    pub fn pop(&mut self, index: Option<usize>) -> Option<State> {
        let id = *self.ranking.values().rev().nth(index.unwrap_or(0))?;
        self.remove(id)
    }

    /// States in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.slots.iter().filter_map(|id| self.get_by_id(*id))
    }

    /// States from best to worst.
    pub fn iter_ranked(&self) -> impl Iterator<Item = &State> {
        self.ranking.values().rev().filter_map(|id| self.get_by_id(*id))
    }

    /// Remove and return every state.
    pub fn drain(&mut self) -> Vec<State> {
        let slots = std::mem::take(&mut self.slots);
        self.ranking.clear();
        self.last_added = None;

        let mut drained = Vec::with_capacity(slots.len());
        for id in slots {
            if let Some(entry) = self.entries.remove(&id) {
                drained.push(entry.state);
            }
        }
        drained
    }

    pub fn wipe(&mut self) {
        self.entries.clear();
        self.ranking.clear();
        self.slots.clear();
        self.last_added = None;
        self.history.clear();
    }

    /// Called once per resolver iteration.
    pub fn new_iteration(&mut self) {
        if !self.keep_history {
            return;
        }
        let max_score = self.ranking.keys().next_back().map(|(score, _)| score.0);
        self.history.push(BeamHistoryEntry {
            size: self.entries.len(),
            max_score,
        });
    }

    pub fn history(&self) -> &[BeamHistoryEntry] {
        &self.history
    }
}
