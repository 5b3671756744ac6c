//! Radio mode: keeps the queue topped up with AI picks while it plays.
//!
//! This type only tracks phases. The caller launches the background work it
//! asks for and reports the results back tagged with the generation they
//! were started under, so results from a session that has since been
//! stopped or restarted are ignored.

use crate::models::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioPhase {
    Off,
    /// Provisional queue: the first song plays while the rest resolve.
    Starting,
    Listening,
    Extending,
}

/// What to do when playback runs off the end of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndAction {
    /// Radio is off: wrap like a normal playlist.
    Wrap,
    /// Launch an extension for this generation and wait for it.
    Extend(u64),
    /// An extension or the seed is already in flight; wait for it.
    Wait,
}

/// How a finished background job should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stale,
    /// `advance` is set when playback was waiting at the end of the queue.
    Applied { advance: bool },
}

/// Result of a background radio job, sent back to the owning task.
#[derive(Debug)]
pub enum RadioEvent {
    /// First playable song of a new session.
    Provisional { generation: u64, song: Song },
    /// The rest of the seed playlist.
    SeedLoaded { generation: u64, songs: Vec<Song> },
    /// Nothing from the seed playlist could be played.
    StartFailed { generation: u64, error: String },
    Extended { generation: u64, songs: Vec<Song> },
    ExtensionFailed { generation: u64, error: String },
}

#[derive(Debug)]
pub struct RadioState {
    phase: RadioPhase,
    generation: u64,
    pending_advance: bool,
    threshold: usize,
}

impl RadioState {
    pub fn new(threshold: usize) -> Self {
        Self {
            phase: RadioPhase::Off,
            generation: 0,
            pending_advance: false,
            threshold,
        }
    }

    pub fn phase(&self) -> RadioPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.phase != RadioPhase::Off
    }

    pub fn pending_advance(&self) -> bool {
        self.pending_advance
    }

    /// Begin a new session and return its generation.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.phase = RadioPhase::Starting;
        self.pending_advance = false;
        self.generation
    }

    /// Turn radio off. Work started under the old generation becomes stale.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.phase = RadioPhase::Off;
        self.pending_advance = false;
    }

    /// Whether a provisional song for `generation` should replace the queue.
    pub fn accepts_provisional(&self, generation: u64) -> bool {
        generation == self.generation && self.phase == RadioPhase::Starting
    }

    /// The seed could not produce a single song. Returns false when stale.
    pub fn start_failed(&mut self, generation: u64) -> bool {
        if !self.accepts_provisional(generation) {
            return false;
        }
        self.phase = RadioPhase::Off;
        self.pending_advance = false;
        true
    }

    /// The rest of the seed playlist has been resolved (possibly to nothing).
    pub fn seed_loaded(&mut self, generation: u64) -> Outcome {
        if generation != self.generation || self.phase != RadioPhase::Starting {
            return Outcome::Stale;
        }
        self.phase = RadioPhase::Listening;
        Outcome::Applied {
            advance: std::mem::take(&mut self.pending_advance),
        }
    }

    /// Called after every track change. Returns the generation to extend
    /// under when the queue is running low.
    pub fn should_extend(&mut self, remaining: usize) -> Option<u64> {
        if self.phase == RadioPhase::Listening && remaining <= self.threshold {
            self.phase = RadioPhase::Extending;
            return Some(self.generation);
        }
        None
    }

    /// Playback reached the end of the queue.
    pub fn at_end(&mut self) -> EndAction {
        match self.phase {
            RadioPhase::Off => EndAction::Wrap,
            RadioPhase::Listening => {
                self.pending_advance = true;
                self.phase = RadioPhase::Extending;
                EndAction::Extend(self.generation)
            }
            RadioPhase::Starting | RadioPhase::Extending => {
                self.pending_advance = true;
                EndAction::Wait
            }
        }
    }

    /// The user picked a track by hand, so a landing job must not move away
    /// from it.
    pub fn cancel_pending_advance(&mut self) {
        self.pending_advance = false;
    }

    /// An extension finished.
    pub fn on_extension(&mut self, generation: u64) -> Outcome {
        if generation != self.generation || self.phase != RadioPhase::Extending {
            return Outcome::Stale;
        }
        self.phase = RadioPhase::Listening;
        Outcome::Applied {
            advance: std::mem::take(&mut self.pending_advance),
        }
    }

    /// An extension failed. The caller wraps if `advance` is set.
    pub fn on_extension_failed(&mut self, generation: u64) -> Outcome {
        self.on_extension(generation)
    }
}

/// The request sent to the model when extending the radio queue.
pub fn extension_request(queued: &[Song]) -> String {
    let mut request = String::from(
        "Radio mode: keep the music going with songs that fit my listening history \
         and the mood of what is already playing.",
    );
    if !queued.is_empty() {
        request.push_str(" Do not include any of these songs: ");
        let names: Vec<String> = queued.iter().map(Song::display_name).collect();
        request.push_str(&names.join("; "));
        request.push('.');
    }
    request
}

/// The request used to seed a new radio session.
pub const SEED_REQUEST: &str =
    "Radio mode: start an open-ended station built from my listening history.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::tests::song;

    fn listening() -> RadioState {
        let mut radio = RadioState::new(3);
        let generation = radio.start();
        assert_eq!(radio.seed_loaded(generation), Outcome::Applied { advance: false });
        radio
    }

    #[test]
    fn test_start_and_seed() {
        let mut radio = RadioState::new(3);
        assert!(!radio.is_active());
        let generation = radio.start();
        assert_eq!(radio.phase(), RadioPhase::Starting);
        assert_eq!(radio.seed_loaded(generation), Outcome::Applied { advance: false });
        assert_eq!(radio.phase(), RadioPhase::Listening);
    }

    #[test]
    fn test_extends_at_threshold_only_once() {
        let mut radio = listening();
        assert_eq!(radio.should_extend(4), None);
        let generation = radio.generation();
        assert_eq!(radio.should_extend(3), Some(generation));
        assert_eq!(radio.phase(), RadioPhase::Extending);
        assert_eq!(radio.should_extend(2), None);

        assert_eq!(radio.on_extension(generation), Outcome::Applied { advance: false });
        assert_eq!(radio.phase(), RadioPhase::Listening);
    }

    #[test]
    fn test_start_failure() {
        let mut radio = RadioState::new(3);
        let old = radio.start();
        let generation = radio.start();
        assert!(!radio.accepts_provisional(old));
        assert!(!radio.start_failed(old));
        assert!(radio.accepts_provisional(generation));
        assert!(radio.start_failed(generation));
        assert!(!radio.is_active());
    }

    #[test]
    fn test_no_extension_while_starting() {
        let mut radio = RadioState::new(3);
        radio.start();
        assert_eq!(radio.should_extend(0), None);
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let mut radio = listening();
        let old = radio.should_extend(1).unwrap();
        radio.stop();
        let new = radio.start();
        assert_ne!(old, new);

        assert_eq!(radio.on_extension(old), Outcome::Stale);
        assert_eq!(radio.seed_loaded(old), Outcome::Stale);
        assert_eq!(radio.phase(), RadioPhase::Starting);
    }

    #[test]
    fn test_stop_invalidates_in_flight_work() {
        let mut radio = listening();
        let generation = radio.should_extend(0).unwrap();
        radio.stop();
        assert_eq!(radio.on_extension(generation), Outcome::Stale);
        assert_eq!(radio.phase(), RadioPhase::Off);
    }

    #[test]
    fn test_end_of_queue_waits_for_extension() {
        let mut radio = listening();
        let generation = radio.generation();
        assert_eq!(radio.at_end(), EndAction::Extend(generation));
        assert!(radio.pending_advance());
        // a second end event while extending does not launch another
        assert_eq!(radio.at_end(), EndAction::Wait);

        assert_eq!(radio.on_extension(generation), Outcome::Applied { advance: true });
        assert!(!radio.pending_advance());
    }

    #[test]
    fn test_cancelled_advance_does_not_move_on() {
        let mut radio = listening();
        let generation = radio.generation();
        assert_eq!(radio.at_end(), EndAction::Extend(generation));
        radio.cancel_pending_advance();
        assert_eq!(radio.on_extension(generation), Outcome::Applied { advance: false });
        assert_eq!(radio.phase(), RadioPhase::Listening);
    }

    #[test]
    fn test_end_while_extending_keeps_single_job() {
        let mut radio = listening();
        let generation = radio.should_extend(1).unwrap();
        assert_eq!(radio.at_end(), EndAction::Wait);
        assert_eq!(
            radio.on_extension_failed(generation),
            Outcome::Applied { advance: true }
        );
        assert_eq!(radio.phase(), RadioPhase::Listening);
    }

    #[test]
    fn test_end_during_provisional_queue() {
        let mut radio = RadioState::new(3);
        let generation = radio.start();
        assert_eq!(radio.at_end(), EndAction::Wait);
        assert_eq!(radio.seed_loaded(generation), Outcome::Applied { advance: true });
    }

    #[test]
    fn test_end_with_radio_off_wraps() {
        let mut radio = RadioState::new(3);
        assert_eq!(radio.at_end(), EndAction::Wrap);
        assert!(!radio.pending_advance());
    }

    #[test]
    fn test_extension_request_lists_queued_songs() {
        let request = extension_request(&[song("a", 1), song("b", 1)]);
        assert!(request.contains("Title a by Artist; Title b by Artist"));
        assert!(!extension_request(&[]).contains("Do not include"));
    }
}
