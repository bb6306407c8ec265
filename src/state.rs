/// Playback state of a [`Player`](crate::Player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerState {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
    /// End of stream was reached. The decoder has been released.
    Ended,
}

impl PlayerState {
    /// A worker is alive for this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Paused)
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped | Self::Ended)
    }

    /// Anything that is not actively advancing frames counts as paused.
    pub fn is_paused(self) -> bool {
        self != Self::Playing
    }

    /// State reached once the source opened successfully.
    pub(crate) fn after_open(play_requested: bool) -> Self {
        if play_requested {
            Self::Playing
        } else {
            Self::Paused
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stopped() {
        assert_eq!(PlayerState::default(), PlayerState::Stopped);
    }

    #[test]
    fn ended_counts_as_stopped() {
        assert!(PlayerState::Ended.is_stopped());
        assert!(!PlayerState::Ended.is_active());
        assert!(PlayerState::Stopped.is_stopped());
    }

    #[test]
    fn only_playing_is_unpaused() {
        for state in [
            PlayerState::Stopped,
            PlayerState::Loading,
            PlayerState::Paused,
            PlayerState::Ended,
        ] {
            assert!(state.is_paused(), "{state:?}");
        }
        assert!(!PlayerState::Playing.is_paused());
    }

    #[test]
    fn open_honors_play_intent() {
        assert_eq!(PlayerState::after_open(true), PlayerState::Playing);
        assert_eq!(PlayerState::after_open(false), PlayerState::Paused);
    }
}
