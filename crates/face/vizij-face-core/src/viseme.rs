//! Viseme Layer: audio-clock position → active mouth shape.
//!
//! Looked up every tick (the clock moves continuously). The first cue in
//! track order whose `[start, end]` contains `t` wins, even when cues overlap.

use hashbrown::HashSet;
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::FaceConfig;
use crate::schedule::TargetBatch;

/// Symbol stored for cues whose value was empty; never mapped.
pub const UNREADABLE_SYMBOL: char = char::REPLACEMENT_CHARACTER;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisemeCue {
    pub start: f64,
    pub end: f64,
    pub symbol: char,
}

impl VisemeCue {
    pub fn new(start: f64, end: f64, symbol: char) -> Self {
        Self { start, end, symbol }
    }

    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Ordered cue list for one utterance. Replaced wholesale, never edited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CueTrack {
    cues: Vec<VisemeCue>,
    sorted: bool,
}

impl CueTrack {
    pub fn new(cues: Vec<VisemeCue>) -> Self {
        let sorted = cues.windows(2).all(|w| w[0].start <= w[1].start);
        Self { cues, sorted }
    }

    pub fn cues(&self) -> &[VisemeCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// First cue (in track order) containing `t`.
    ///
    /// For a track sorted by `start`, no cue past the partition point can
    /// contain `t`, so the scan stops there.
    pub fn select(&self, t: f64) -> Option<&VisemeCue> {
        let upper = if self.sorted {
            self.cues.partition_point(|c| c.start <= t)
        } else {
            self.cues.len()
        };
        self.cues[..upper].iter().find(|c| c.contains(t))
    }

    /// End of the last cue, or 0 for an empty track.
    pub fn duration(&self) -> f64 {
        self.cues.iter().fold(0.0, |acc, c| acc.max(c.end))
    }
}

/// Cue symbol → mouth shape name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisemeMap {
    map: IndexMap<char, String>,
}

impl Default for VisemeMap {
    /// Rhubarb mouth shapes onto the Oculus viseme set; `X` (rest) maps to
    /// the closed-lips viseme.
    fn default() -> Self {
        Self::from_pairs([
            ('A', "viseme_PP"),
            ('B', "viseme_kk"),
            ('C', "viseme_I"),
            ('D', "viseme_AA"),
            ('E', "viseme_O"),
            ('F', "viseme_U"),
            ('G', "viseme_FF"),
            ('H', "viseme_TH"),
            ('X', "viseme_PP"),
        ])
    }
}

impl VisemeMap {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        Self {
            map: pairs.into_iter().map(|(c, s)| (c, s.into())).collect(),
        }
    }

    pub fn shape_for(&self, symbol: char) -> Option<&str> {
        self.map.get(&symbol).map(String::as_str)
    }

    /// Distinct mapped shapes in first-mention order.
    pub fn shapes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.map.len());
        for shape in self.map.values() {
            if !out.contains(&shape.as_str()) {
                out.push(shape);
            }
        }
        out
    }
}

/// What the lookup found this tick. Only `Active` produces a target; the
/// other variants are kept apart so callers can tell "no lip-sync data" from
/// "between cues" from "symbol not in the map".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VisemeSelection {
    /// No cue track armed or no clock position available.
    Inactive,
    /// Clock position is outside every cue.
    Idle,
    Unmapped(char),
    Active { symbol: char, shape: String },
}

impl VisemeSelection {
    pub fn shape(&self) -> Option<&str> {
        match self {
            VisemeSelection::Active { shape, .. } => Some(shape),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VisemeLayer {
    map: VisemeMap,
    track: Option<CueTrack>,
    warned: HashSet<char>,
}

impl VisemeLayer {
    pub fn new(map: VisemeMap) -> Self {
        Self {
            map,
            track: None,
            warned: HashSet::new(),
        }
    }

    pub fn map(&self) -> &VisemeMap {
        &self.map
    }

    pub fn track(&self) -> Option<&CueTrack> {
        self.track.as_ref()
    }

    /// Replace the cue track atomically.
    pub fn arm(&mut self, track: CueTrack) {
        self.warned.clear();
        self.track = Some(track);
    }

    pub fn disarm(&mut self) {
        self.track = None;
    }

    pub fn is_armed(&self) -> bool {
        self.track.is_some()
    }

    pub fn select(&mut self, position: Option<f64>) -> VisemeSelection {
        let (Some(track), Some(t)) = (self.track.as_ref(), position) else {
            return VisemeSelection::Inactive;
        };
        let Some(cue) = track.select(t) else {
            return VisemeSelection::Idle;
        };
        match self.map.shape_for(cue.symbol) {
            Some(shape) => VisemeSelection::Active {
                symbol: cue.symbol,
                shape: shape.to_string(),
            },
            None => {
                if self.warned.insert(cue.symbol) {
                    warn!("viseme symbol {:?} has no mapped shape", cue.symbol);
                }
                VisemeSelection::Unmapped(cue.symbol)
            }
        }
    }

    /// Attack toward 1 on the active shape, release toward 0 on the rest.
    pub fn targets(
        &mut self,
        position: Option<f64>,
        cfg: &FaceConfig,
    ) -> (TargetBatch, VisemeSelection) {
        let selection = self.select(position);
        let active = selection.shape();
        let shapes = self.map.shapes();
        let mut batch = TargetBatch::with_capacity(shapes.len());
        for shape in shapes {
            if Some(shape) == active {
                batch.push(shape, 1.0, cfg.viseme_attack_rate);
            } else {
                batch.push(shape, 0.0, cfg.viseme_release_rate);
            }
        }
        (batch, selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlapping() -> CueTrack {
        CueTrack::new(vec![
            VisemeCue::new(0.0, 1.0, 'A'),
            VisemeCue::new(0.5, 1.5, 'B'),
        ])
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let track = overlapping();
        assert!(track.is_sorted());
        assert_eq!(track.select(0.7).map(|c| c.symbol), Some('A'));
        assert_eq!(track.select(1.2).map(|c| c.symbol), Some('B'));
        assert!(track.select(2.0).is_none());
        assert!(track.select(-0.1).is_none());
    }

    #[test]
    fn bounds_are_inclusive() {
        let track = overlapping();
        assert_eq!(track.select(0.0).map(|c| c.symbol), Some('A'));
        assert_eq!(track.select(1.0).map(|c| c.symbol), Some('A'));
        assert_eq!(track.select(1.5).map(|c| c.symbol), Some('B'));
    }

    #[test]
    fn unsorted_track_still_honours_track_order() {
        let track = CueTrack::new(vec![
            VisemeCue::new(0.5, 1.5, 'B'),
            VisemeCue::new(0.0, 1.0, 'A'),
        ]);
        assert!(!track.is_sorted());
        assert_eq!(track.select(0.7).map(|c| c.symbol), Some('B'));
        assert_eq!(track.select(0.2).map(|c| c.symbol), Some('A'));
    }

    #[test]
    fn default_map_dedups_closed_mouth() {
        let map = VisemeMap::default();
        let shapes = map.shapes();
        assert_eq!(shapes.len(), 8);
        assert_eq!(map.shape_for('X'), Some("viseme_PP"));
        assert_eq!(map.shape_for('Z'), None);
    }

    #[test]
    fn selection_states() {
        let mut layer = VisemeLayer::new(VisemeMap::default());
        assert_eq!(layer.select(Some(0.7)), VisemeSelection::Inactive);

        layer.arm(CueTrack::new(vec![
            VisemeCue::new(0.0, 1.0, 'D'),
            VisemeCue::new(1.0, 2.0, 'Q'),
        ]));
        assert_eq!(layer.select(None), VisemeSelection::Inactive);
        assert_eq!(
            layer.select(Some(0.5)),
            VisemeSelection::Active {
                symbol: 'D',
                shape: "viseme_AA".into()
            }
        );
        assert_eq!(layer.select(Some(1.5)), VisemeSelection::Unmapped('Q'));
        assert_eq!(layer.select(Some(3.0)), VisemeSelection::Idle);
    }

    #[test]
    fn only_active_shape_targets_one() {
        let cfg = FaceConfig::default();
        let mut layer = VisemeLayer::new(VisemeMap::default());
        layer.arm(overlapping());
        let (batch, sel) = layer.targets(Some(0.7), &cfg);
        assert_eq!(sel.shape(), Some("viseme_PP"));
        let hot: Vec<_> = batch.iter().filter(|w| w.target > 0.0).collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].shape, "viseme_PP");
        assert_eq!(hot[0].rate, cfg.viseme_attack_rate);
        assert!(batch
            .iter()
            .filter(|w| w.target == 0.0)
            .all(|w| w.rate == cfg.viseme_release_rate));

        let (batch, sel) = layer.targets(Some(2.0), &cfg);
        assert_eq!(sel, VisemeSelection::Idle);
        assert!(batch.iter().all(|w| w.target == 0.0));
    }
}
