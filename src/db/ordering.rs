//! Position arithmetic for playlist membership.
//!
//! Positions are 1-based and must stay dense: a playlist with `n` members
//! holds exactly the positions `1..=n`. Every mutation is expressed as one
//! [`RangeShift`] over the other members followed by placing (or removing)
//! the target track. The SQL repository and [`PlaylistOrder`] apply the same
//! shifts, so the in-memory model can be used to reason about and test the
//! stored ordering.

use std::cmp::Ordering;

/// Add `delta` to every position in `start..=end` (`end = None` is unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeShift {
    pub start: i64,
    pub end: Option<i64>,
    pub delta: i64,
}

impl RangeShift {
    pub fn contains(&self, position: i64) -> bool {
        position >= self.start && self.end.map_or(true, |end| position <= end)
    }

    pub fn apply(&self, position: i64) -> i64 {
        if self.contains(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// Make room at the head for a new member.
pub fn insert_shift() -> RangeShift {
    RangeShift {
        start: 1,
        end: None,
        delta: 1,
    }
}

/// Close the gap left by removing the member at `removed`.
pub fn removal_shift(removed: i64) -> RangeShift {
    RangeShift {
        start: removed + 1,
        end: None,
        delta: -1,
    }
}

/// Shift for moving a member from `current` to `target`; `None` when they match.
///
/// Moving forward pulls `(current, target]` back by one, moving backward
/// pushes `[target, current)` forward by one.
pub fn move_shift(current: i64, target: i64) -> Option<RangeShift> {
    match current.cmp(&target) {
        Ordering::Equal => None,
        Ordering::Less => Some(RangeShift {
            start: current + 1,
            end: Some(target),
            delta: -1,
        }),
        Ordering::Greater => Some(RangeShift {
            start: target,
            end: Some(current - 1),
            delta: 1,
        }),
    }
}

/// Clamp a requested position into `1..=len`.
pub fn clamp_position(target: i64, len: i64) -> i64 {
    target.clamp(1, len.max(1))
}

/// In-memory ordering of one playlist: `(track_id, position)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistOrder {
    members: Vec<(i64, i64)>,
}

impl PlaylistOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_members(members: impl IntoIterator<Item = (i64, i64)>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn position_of(&self, track_id: i64) -> Option<i64> {
        self.members
            .iter()
            .find(|(id, _)| *id == track_id)
            .map(|(_, position)| *position)
    }

    /// Push `track_id` to the head. Returns `false` if it is already a member.
    pub fn insert(&mut self, track_id: i64) -> bool {
        if self.position_of(track_id).is_some() {
            return false;
        }
        self.shift(insert_shift());
        self.members.push((track_id, 1));
        true
    }

    pub fn remove(&mut self, track_id: i64) -> bool {
        let Some(position) = self.position_of(track_id) else {
            return false;
        };
        self.members.retain(|(id, _)| *id != track_id);
        self.shift(removal_shift(position));
        true
    }

    /// Move `track_id` to `target` (clamped). Returns `false` if nothing moved.
    pub fn move_to(&mut self, track_id: i64, target: i64) -> bool {
        let Some(current) = self.position_of(track_id) else {
            return false;
        };
        let target = clamp_position(target, self.members.len() as i64);
        let Some(shift) = move_shift(current, target) else {
            return false;
        };
        self.shift(shift);
        for (id, position) in &mut self.members {
            if *id == track_id {
                *position = target;
            }
        }
        true
    }

    /// Track ids in ascending position order.
    pub fn tracks_in_order(&self) -> Vec<i64> {
        let mut members = self.members.clone();
        members.sort_by_key(|(_, position)| *position);
        members.into_iter().map(|(id, _)| id).collect()
    }

    /// True when positions are exactly `1..=len` with no duplicates.
    pub fn is_dense(&self) -> bool {
        is_dense(self.members.iter().map(|(_, position)| *position))
    }

    fn shift(&mut self, shift: RangeShift) {
        for (_, position) in &mut self.members {
            *position = shift.apply(*position);
        }
    }
}

/// True when `positions` is a permutation of `1..=n`.
pub fn is_dense(positions: impl IntoIterator<Item = i64>) -> bool {
    let mut positions: Vec<i64> = positions.into_iter().collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_newest_first() {
        let mut order = PlaylistOrder::new();
        for track_id in 1..=4 {
            assert!(order.insert(track_id));
        }

        assert_eq!(order.tracks_in_order(), vec![4, 3, 2, 1]);
        assert!(order.is_dense());
    }

    #[test]
    fn test_insert_existing_member_is_rejected() {
        let mut order = PlaylistOrder::from_members([(1, 1), (2, 2)]);

        assert!(!order.insert(2));
        assert_eq!(order.tracks_in_order(), vec![1, 2]);
    }

    #[test]
    fn test_remove_closes_gap() {
        let mut order = PlaylistOrder::from_members([(10, 1), (20, 2), (30, 3), (40, 4)]);

        assert!(order.remove(20));

        assert_eq!(order.tracks_in_order(), vec![10, 30, 40]);
        assert_eq!(order.position_of(30), Some(2));
        assert_eq!(order.position_of(40), Some(3));
        assert!(!order.remove(20));
    }

    #[test]
    fn test_move_forward_shifts_range_back() {
        let mut order = PlaylistOrder::from_members([(10, 1), (20, 2), (30, 3), (40, 4), (50, 5)]);

        assert!(order.move_to(20, 4));

        assert_eq!(order.tracks_in_order(), vec![10, 30, 40, 20, 50]);
        assert_eq!(order.position_of(50), Some(5));
    }

    #[test]
    fn test_move_backward_shifts_range_forward() {
        let mut order = PlaylistOrder::from_members([(10, 1), (20, 2), (30, 3), (40, 4), (50, 5)]);

        assert!(order.move_to(40, 2));

        assert_eq!(order.tracks_in_order(), vec![10, 40, 20, 30, 50]);
        assert_eq!(order.position_of(10), Some(1));
    }

    #[test]
    fn test_move_to_same_position_is_noop() {
        let mut order = PlaylistOrder::from_members([(10, 1), (20, 2), (30, 3)]);
        let before = order.clone();

        assert!(!order.move_to(20, 2));
        assert_eq!(order, before);
    }

    #[test]
    fn test_move_target_is_clamped() {
        let mut order = PlaylistOrder::from_members([(10, 1), (20, 2), (30, 3)]);

        assert!(order.move_to(10, 99));
        assert_eq!(order.tracks_in_order(), vec![20, 30, 10]);

        assert!(order.move_to(10, -5));
        assert_eq!(order.tracks_in_order(), vec![10, 20, 30]);
        assert!(order.is_dense());
    }

    #[test]
    fn test_move_shift_boundaries() {
        assert_eq!(move_shift(3, 3), None);
        assert_eq!(
            move_shift(2, 5),
            Some(RangeShift { start: 3, end: Some(5), delta: -1 })
        );
        assert_eq!(
            move_shift(5, 2),
            Some(RangeShift { start: 2, end: Some(4), delta: 1 })
        );
    }

    #[test]
    fn test_density_survives_mixed_operations() {
        // Small linear congruential generator so the sequence is reproducible
        let mut seed: u64 = 0x5eed;
        let mut next = move |bound: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        let mut order = PlaylistOrder::new();
        for _ in 0..500 {
            let track_id = next(20) as i64;
            match next(3) {
                0 => {
                    order.insert(track_id);
                }
                1 => {
                    order.remove(track_id);
                }
                _ => {
                    let target = next(25) as i64 - 2;
                    order.move_to(track_id, target);
                }
            }
            assert!(order.is_dense(), "positions lost density: {:?}", order);
        }
    }

    #[test]
    fn test_is_dense() {
        assert!(is_dense(Vec::<i64>::new()));
        assert!(is_dense([2, 1, 3]));
        assert!(!is_dense([1, 3]));
        assert!(!is_dense([1, 1, 2]));
    }
}
