use serde::Serialize;
use smash_state::Snapshot;
use std::io::Write;
use tracing::warn;

/// Receives every snapshot as soon as it is recorded.
pub trait SnapshotSink {
    /// `frame` is the zero-based index of the analyzed frame in the video.
    fn record(&mut self, game: usize, frame: u64, snapshot: &Snapshot);
}

impl<F> SnapshotSink for F
where
    F: FnMut(usize, u64, &Snapshot),
{
    fn record(&mut self, game: usize, frame: u64, snapshot: &Snapshot) {
        self(game, frame, snapshot)
    }
}

#[derive(Serialize)]
struct SnapshotLine<'a> {
    game: usize,
    frame: u64,
    players: &'a Snapshot,
}

/// Writes one JSON object per snapshot, one per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn record(&mut self, game: usize, frame: u64, snapshot: &Snapshot) {
        let line = SnapshotLine {
            game,
            frame,
            players: snapshot,
        };
        let result = serde_json::to_writer(&mut self.out, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to write snapshot for frame {}: {}", frame, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smash_vision::PlayerStats;

    #[test]
    fn test_json_lines_format() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(
            0,
            123,
            &Snapshot(vec![
                PlayerStats { percent: Some(24) },
                PlayerStats { percent: None },
            ]),
        );
        sink.record(1, 200, &Snapshot(vec![PlayerStats { percent: Some(0) }]));

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"game":0,"frame":123,"players":[{"percent":24},{"percent":null}]}"#,
                r#"{"game":1,"frame":200,"players":[{"percent":0}]}"#,
            ]
        );
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |game: usize, frame: u64, snapshot: &Snapshot| {
                seen.push((game, frame, snapshot.players().len()));
            };
            sink.record(2, 7, &Snapshot::default());
        }
        assert_eq!(seen, vec![(2, 7, 0)]);
    }
}
