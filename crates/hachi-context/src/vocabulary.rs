// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-player vocabulary progress.
//!
//! Every Japanese word the companion teaches is recorded against the
//! player. The first encounter is what the client sees as an unlocked
//! word; later encounters only move mastery.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// Encounters after which exposure stops raising mastery.
const FULL_EXPOSURE: f32 = 5.0;

/// Mastery decays linearly to its floor over this many seconds.
const RECENCY_WINDOW_SECS: f32 = 7.0 * 24.0 * 60.0 * 60.0;

const RECENCY_FLOOR: f32 = 0.5;

/// One player's history with one word.
#[derive(Debug, Clone, PartialEq)]
pub struct WordProgress {
    pub encounters: u32,
    pub understood: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl WordProgress {
    /// Mastery in `[0, 1]` at `now`.
    ///
    /// Accuracy, scaled by exposure (capped at five encounters) and by a
    /// recency factor that falls from 1 to 0.5 over a week.
    pub fn mastery_at(&self, now: DateTime<Utc>) -> f32 {
        if self.encounters == 0 {
            return 0.0;
        }
        let accuracy = self.understood as f32 / self.encounters as f32;
        let exposure = (self.encounters as f32 / FULL_EXPOSURE).min(1.0);
        let age = (now - self.last_seen).num_seconds().max(0) as f32;
        let recency = (1.0 - age / RECENCY_WINDOW_SECS).max(RECENCY_FLOOR);
        accuracy * exposure * recency
    }
}

/// Aggregate mastery across the words a player has met.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterySummary {
    pub encountered: usize,
    pub average_mastery: f32,
    /// Mastery of 0.8 and above.
    pub high: usize,
    /// Mastery in `[0.4, 0.8)`.
    pub medium: usize,
    pub low: usize,
}

/// In-memory vocabulary progress keyed by player id.
#[derive(Debug, Default)]
pub struct VocabularyTracker {
    players: DashMap<String, HashMap<String, WordProgress>>,
}

impl VocabularyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `player` met `word`. Returns `true` on the first encounter.
    pub fn record_encounter(&self, player: &str, word: &str, understood: bool) -> bool {
        self.record_encounter_at(player, word, understood, Utc::now())
    }

    pub fn record_encounter_at(
        &self,
        player: &str,
        word: &str,
        understood: bool,
        now: DateTime<Utc>,
    ) -> bool {
        let mut words = self.players.entry(player.to_string()).or_default();
        let mut first = false;
        let progress = words.entry(word.to_string()).or_insert_with(|| {
            first = true;
            WordProgress {
                encounters: 0,
                understood: 0,
                first_seen: now,
                last_seen: now,
            }
        });
        progress.encounters += 1;
        if understood {
            progress.understood += 1;
        }
        progress.last_seen = now;
        debug!(
            player,
            word,
            encounters = progress.encounters,
            first,
            "vocabulary encounter recorded"
        );
        first
    }

    pub fn progress(&self, player: &str, word: &str) -> Option<WordProgress> {
        self.players.get(player)?.get(word).cloned()
    }

    /// Current mastery of `word`, 0 when never met.
    pub fn mastery(&self, player: &str, word: &str) -> f32 {
        self.progress(player, word)
            .map(|p| p.mastery_at(Utc::now()))
            .unwrap_or(0.0)
    }

    pub fn summary(&self, player: &str) -> MasterySummary {
        self.summary_at(player, Utc::now())
    }

    pub fn summary_at(&self, player: &str, now: DateTime<Utc>) -> MasterySummary {
        let Some(words) = self.players.get(player) else {
            return MasterySummary::default();
        };
        let mut summary = MasterySummary {
            encountered: words.len(),
            ..MasterySummary::default()
        };
        let mut total = 0.0;
        for progress in words.values() {
            let mastery = progress.mastery_at(now);
            total += mastery;
            match mastery {
                m if m >= 0.8 => summary.high += 1,
                m if m >= 0.4 => summary.medium += 1,
                _ => summary.low += 1,
            }
        }
        if !words.is_empty() {
            summary.average_mastery = total / words.len() as f32;
        }
        summary
    }

    /// Words most worth revisiting: lowest mastery first, then least recently seen.
    pub fn review_queue(&self, player: &str, limit: usize) -> Vec<String> {
        self.review_queue_at(player, limit, Utc::now())
    }

    pub fn review_queue_at(&self, player: &str, limit: usize, now: DateTime<Utc>) -> Vec<String> {
        let Some(words) = self.players.get(player) else {
            return Vec::new();
        };
        let mut ranked: Vec<(&String, f32, DateTime<Utc>)> = words
            .iter()
            .map(|(word, p)| (word, p.mastery_at(now), p.last_seen))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(word, _, _)| word.clone())
            .collect()
    }
}
