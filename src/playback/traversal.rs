//! Next/previous over the search results.
//!
//! Only tracks with a playable source take part (the *eligible set*). Without
//! shuffle the walk is cyclic over that set; with shuffle it is a uniform pick
//! among everything except the current track.

use crate::audio::Track;
use rand::Rng;

/// Uniform integer source, injectable so shuffle is testable.
pub trait RandomSource {
    /// A value in `0..upper`. Callers guarantee `upper > 0`.
    fn below(&mut self, upper: usize) -> usize;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&mut self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

pub fn eligible(results: &[Track]) -> Vec<&Track> {
    results.iter().filter(|t| t.has_source()).collect()
}

pub fn next_track<'a, R: RandomSource + ?Sized>(
    results: &'a [Track],
    current_id: Option<&str>,
    shuffle: bool,
    rng: &mut R,
) -> Option<&'a Track> {
    let candidates = eligible(results);
    if candidates.is_empty() {
        return None;
    }
    if shuffle {
        return shuffle_pick(&candidates, current_id, rng);
    }

    let next = match position_of(&candidates, current_id) {
        Some(index) => (index + 1) % candidates.len(),
        None => 0,
    };
    Some(candidates[next])
}

pub fn previous_track<'a, R: RandomSource + ?Sized>(
    results: &'a [Track],
    current_id: Option<&str>,
    shuffle: bool,
    rng: &mut R,
) -> Option<&'a Track> {
    let candidates = eligible(results);
    if candidates.is_empty() {
        return None;
    }
    if shuffle {
        return shuffle_pick(&candidates, current_id, rng);
    }

    let previous = match position_of(&candidates, current_id) {
        Some(index) if index > 0 => index - 1,
        _ => candidates.len() - 1,
    };
    Some(candidates[previous])
}

fn position_of(candidates: &[&Track], current_id: Option<&str>) -> Option<usize> {
    let current_id = current_id?;
    candidates.iter().position(|t| t.id == current_id)
}

fn shuffle_pick<'a, R: RandomSource + ?Sized>(
    candidates: &[&'a Track],
    current_id: Option<&str>,
    rng: &mut R,
) -> Option<&'a Track> {
    let others: Vec<&'a Track> = candidates
        .iter()
        .copied()
        .filter(|t| Some(t.id.as_str()) != current_id)
        .collect();

    if others.is_empty() {
        // the current track is the only eligible one
        return candidates.first().copied();
    }
    Some(others[rng.below(others.len())])
}
