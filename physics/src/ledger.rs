/*!
Collision ledger: which body pairs are touching right now, and where.

The engine only tells us about contacts while it steps. The ledger turns those transient
notifications into a queryable record per touching pair:

- begin      → record created (points = first manifold snapshot)
- pre/post   → points of the existing record overwritten
- end        → record removed

A body pair may touch through several shape pairs (polygon colliders own one shape per
triangle). The record counts those and only disappears when the last one ends, so a record
exists exactly while the two bodies touch.

Pair-level `Started`/`Stopped` events are buffered for consumers that prefer enter/exit
notifications over polling; drain them once per step.
*/

use std::collections::HashMap;

use nalgebra::Vector2;

use crate::backend::{BodyId, ContactListener};

/// Unordered pair of bodies. `BodyPair::new(a, b) == BodyPair::new(b, a)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyPair {
    low: BodyId,
    high: BodyId,
}

impl BodyPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    #[inline]
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.low, self.high)
    }

    #[inline]
    pub fn involves(&self, body: BodyId) -> bool {
        self.low == body || self.high == body
    }
}

/// Current contact data of one touching pair.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionRecord {
    pub pair: BodyPair,
    /// World-space contact points (physics units) of the latest manifold.
    pub points: Vec<Vector2<f32>>,
    /// Shape-level contacts currently backing this record (≥ 1).
    pub contacts: u32,
}

/// Pair-level enter/exit notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionEvent {
    Started(BodyPair),
    Stopped(BodyPair),
}

#[derive(Debug, Default)]
pub struct CollisionLedger {
    records: HashMap<BodyPair, CollisionRecord>,
    events: Vec<CollisionEvent>,
}

impl CollisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contact points of a touching pair, `None` when the bodies do not touch.
    pub fn query(&self, a: BodyId, b: BodyId) -> Option<&[Vector2<f32>]> {
        self.records
            .get(&BodyPair::new(a, b))
            .map(|r| r.points.as_slice())
    }

    pub fn contains(&self, a: BodyId, b: BodyId) -> bool {
        self.records.contains_key(&BodyPair::new(a, b))
    }

    pub fn record(&self, a: BodyId, b: BodyId) -> Option<&CollisionRecord> {
        self.records.get(&BodyPair::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionRecord> {
        self.records.values()
    }

    /// Take the buffered enter/exit events, oldest first.
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop every record involving `body` (it was destroyed and can no longer touch).
    pub fn forget_body(&mut self, body: BodyId) {
        let gone: Vec<BodyPair> = self
            .records
            .keys()
            .filter(|pair| pair.involves(body))
            .copied()
            .collect();
        for pair in gone {
            self.records.remove(&pair);
            log::trace!("contact dropped with destroyed body: {pair:?}");
            self.events.push(CollisionEvent::Stopped(pair));
        }
    }

    fn refresh_points(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]) {
        if let Some(record) = self.records.get_mut(&BodyPair::new(a, b)) {
            record.points.clear();
            record.points.extend_from_slice(points);
        }
    }
}

impl ContactListener for CollisionLedger {
    fn begin_contact(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]) {
        let pair = BodyPair::new(a, b);
        match self.records.get_mut(&pair) {
            Some(record) => {
                record.contacts += 1;
                if !points.is_empty() {
                    record.points.clear();
                    record.points.extend_from_slice(points);
                }
            }
            None => {
                log::trace!("contact begin: {pair:?} ({} points)", points.len());
                self.records.insert(
                    pair,
                    CollisionRecord {
                        pair,
                        points: points.to_vec(),
                        contacts: 1,
                    },
                );
                self.events.push(CollisionEvent::Started(pair));
            }
        }
    }

    fn pre_solve(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]) {
        self.refresh_points(a, b, points);
    }

    fn post_solve(&mut self, a: BodyId, b: BodyId, points: &[Vector2<f32>]) {
        self.refresh_points(a, b, points);
    }

    fn end_contact(&mut self, a: BodyId, b: BodyId) {
        let pair = BodyPair::new(a, b);
        let Some(record) = self.records.get_mut(&pair) else {
            return;
        };
        record.contacts = record.contacts.saturating_sub(1);
        if record.contacts == 0 {
            self.records.remove(&pair);
            log::trace!("contact end: {pair:?}");
            self.events.push(CollisionEvent::Stopped(pair));
        }
    }
}
