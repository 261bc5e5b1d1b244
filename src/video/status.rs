//! Playback status derived from mpv properties.

/// Coarse state shown by the playback screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Buffering,
    Ready,
    Ended,
    Error(String),
}

impl PlayerStatus {
    pub fn is_buffering(&self) -> bool {
        matches!(self, PlayerStatus::Buffering)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PlayerStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Snapshot of the player gathered on each poll tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerProbe {
    /// A file was handed to mpv.
    pub requested: bool,
    /// mpv reported `FileLoaded` for the current file.
    pub loaded: bool,
    /// mpv has no file open (after a stop).
    pub idle_active: bool,
    pub paused_for_cache: bool,
    pub seeking: bool,
    pub eof_reached: bool,
    /// Sticky until the next file is requested.
    pub error: Option<String>,
}

impl PlayerProbe {
    pub fn status(&self) -> PlayerStatus {
        if let Some(error) = &self.error {
            return PlayerStatus::Error(error.clone());
        }
        if !self.loaded {
            return if self.requested {
                PlayerStatus::Buffering
            } else {
                PlayerStatus::Idle
            };
        }
        if self.eof_reached {
            PlayerStatus::Ended
        } else if self.idle_active {
            PlayerStatus::Idle
        } else if self.paused_for_cache || self.seeking {
            PlayerStatus::Buffering
        } else {
            PlayerStatus::Ready
        }
    }

    /// Reset for a freshly requested file.
    pub fn begin(&mut self) {
        *self = PlayerProbe {
            requested: true,
            ..PlayerProbe::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_probe_is_idle() {
        assert_eq!(PlayerProbe::default().status(), PlayerStatus::Idle);
    }

    #[test]
    fn test_requested_but_not_loaded_is_buffering() {
        let mut probe = PlayerProbe::default();
        probe.begin();
        assert!(probe.status().is_buffering());
    }

    #[test]
    fn test_loaded_states() {
        let mut probe = PlayerProbe {
            requested: true,
            loaded: true,
            ..Default::default()
        };
        assert_eq!(probe.status(), PlayerStatus::Ready);

        probe.seeking = true;
        assert_eq!(probe.status(), PlayerStatus::Buffering);

        probe.seeking = false;
        probe.paused_for_cache = true;
        assert_eq!(probe.status(), PlayerStatus::Buffering);

        probe.eof_reached = true;
        assert_eq!(probe.status(), PlayerStatus::Ended);

        probe.eof_reached = false;
        probe.paused_for_cache = false;
        probe.idle_active = true;
        assert_eq!(probe.status(), PlayerStatus::Idle);
    }

    #[test]
    fn test_error_wins_until_next_file() {
        let mut probe = PlayerProbe {
            requested: true,
            loaded: true,
            error: Some("unrecognized file format".into()),
            ..Default::default()
        };
        assert_eq!(
            probe.status().error_message(),
            Some("unrecognized file format")
        );

        probe.begin();
        assert_eq!(probe.status(), PlayerStatus::Buffering);
    }
}
