//! Playback session phases.

/// Phase of a playback session.
///
/// A session that reaches end of input walks forward through every phase;
/// a user quit jumps straight to [`Phase::Stopped`] from anywhere, skipping
/// the flush and drain work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading packets, decoding and presenting.
    Running,
    /// Input exhausted; decoders are being drained of buffered frames.
    Flushing,
    /// Everything decoded; waiting for the audio queue to empty.
    DrainingAudio,
    /// Session over.
    Stopped,
}

impl Phase {
    pub fn is_running(&self) -> bool {
        matches!(self, Phase::Running)
    }

    pub fn is_flushing(&self) -> bool {
        matches!(self, Phase::Flushing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Phase::Stopped)
    }

    /// The phase that follows when the current one finishes its work.
    pub fn advance(self) -> Phase {
        match self {
            Phase::Running => Phase::Flushing,
            Phase::Flushing => Phase::DrainingAudio,
            Phase::DrainingAudio | Phase::Stopped => Phase::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_advance_in_order() {
        assert_eq!(Phase::Running.advance(), Phase::Flushing);
        assert_eq!(Phase::Flushing.advance(), Phase::DrainingAudio);
        assert_eq!(Phase::DrainingAudio.advance(), Phase::Stopped);
        assert_eq!(Phase::Stopped.advance(), Phase::Stopped);
    }

    #[test]
    fn test_predicates_match_their_phase() {
        assert!(Phase::Running.is_running());
        assert!(!Phase::Running.is_stopped());
        assert!(Phase::Flushing.is_flushing());
        assert!(Phase::Stopped.is_stopped());
    }
}
