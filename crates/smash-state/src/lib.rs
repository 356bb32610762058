use image::RgbImage;
use serde::{Deserialize, Serialize};
use smash_vision::{Player, PlayerStats};
use std::fmt;
use tracing::debug;

/// Stats for every player on one analyzed frame, in player order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Vec<PlayerStats>);

impl Snapshot {
    pub fn players(&self) -> &[PlayerStats] {
        &self.0
    }

    pub fn percents(&self) -> Vec<Option<u32>> {
        self.0.iter().map(|s| s.percent).collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .enumerate()
            .map(|(i, s)| match s.percent {
                Some(p) => format!("P{} {}%", i + 1, p),
                None => format!("P{} -", i + 1),
            })
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// One match: a fixed roster of players plus the history of what was read.
pub struct Game {
    players: Vec<Player>,
    stats: Vec<Snapshot>,
}

impl Game {
    pub fn new(players: Vec<Player>) -> Self {
        Self {
            players,
            stats: Vec::new(),
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Every snapshot recorded so far, oldest first.
    pub fn stats(&self) -> &[Snapshot] {
        &self.stats
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.stats.last()
    }

    /// Hand a new frame to every player.
    pub fn update_frame(&mut self, frame: &RgbImage) {
        for player in &mut self.players {
            player.update_frame(frame);
        }
    }

    /// Read every player and append the results as a new snapshot.
    pub fn analyze(&mut self) -> &Snapshot {
        for player in &mut self.players {
            player.analyze();
        }
        let snapshot = Snapshot(self.players.iter().map(|p| p.stats()).collect());
        debug!("Snapshot {}: {}", self.stats.len(), snapshot);
        self.stats.push(snapshot);
        &self.stats[self.stats.len() - 1]
    }
}
