//! User-facing strings.
//!
//! The gallery ships English and Russian messages; the locale is picked once
//! at start-up from the usual POSIX locale variables.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Russian,
}

impl Locale {
    /// Resolve from `LC_ALL`, `LC_MESSAGES`, then `LANG`.
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .map(|value| Self::from_tag(&value))
            .unwrap_or_default()
    }

    /// Parse a POSIX locale tag such as `ru_RU.UTF-8`.
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag
            .split(['_', '.', '@', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match lang.as_str() {
            "ru" => Self::Russian,
            _ => Self::English,
        }
    }

    pub fn load_failed(self, cause: &str) -> String {
        match self {
            Self::English => format!("Failed to load videos: {cause}"),
            Self::Russian => format!("Не удалось загрузить видео: {cause}"),
        }
    }

    pub fn folder_load_failed(self, cause: &str) -> String {
        match self {
            Self::English => format!("Failed to load videos from folder: {cause}"),
            Self::Russian => format!("Не удалось загрузить видео из папки: {cause}"),
        }
    }

    pub fn permission_denied(self) -> &'static str {
        match self {
            Self::English => {
                "The gallery needs read access to your video library. \
                 Please grant access to the library folders and try again."
            }
            Self::Russian => {
                "Для работы приложения необходим доступ к видео в галерее. \
                 Пожалуйста, предоставьте разрешения в настройках устройства."
            }
        }
    }

    /// mpv sometimes ends a file without a reason; that reads as unknown.
    pub fn playback_failed(self, cause: &str) -> String {
        if cause.is_empty() {
            return self.unknown_playback_error().to_string();
        }
        match self {
            Self::English => format!("Playback error: {cause}"),
            Self::Russian => format!("Ошибка воспроизведения: {cause}"),
        }
    }

    pub fn unknown_playback_error(self) -> &'static str {
        match self {
            Self::English => "Unknown playback error",
            Self::Russian => "Неизвестная ошибка воспроизведения",
        }
    }

    pub fn error_title(self) -> &'static str {
        match self {
            Self::English => "Error",
            Self::Russian => "Ошибка",
        }
    }

    pub fn no_videos(self) -> &'static str {
        match self {
            Self::English => "No videos found",
            Self::Russian => "Видео не найдены",
        }
    }

    pub fn all_videos_tab(self) -> &'static str {
        match self {
            Self::English => "All Videos",
            Self::Russian => "Все видео",
        }
    }

    pub fn folders_tab(self) -> &'static str {
        match self {
            Self::English => "Folders",
            Self::Russian => "Папки",
        }
    }

    pub fn dismiss(self) -> &'static str {
        match self {
            Self::English => "Dismiss",
            Self::Russian => "Закрыть",
        }
    }

    pub fn scanning(self) -> &'static str {
        match self {
            Self::English => "Scanning library...",
            Self::Russian => "Сканирование библиотеки...",
        }
    }

    pub fn video_count(self, count: usize) -> String {
        match self {
            Self::English if count == 1 => "1 video".to_string(),
            Self::English => format!("{count} videos"),
            Self::Russian => format!("{count} видео"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_locale_tags() {
        assert_eq!(Locale::from_tag("ru_RU.UTF-8"), Locale::Russian);
        assert_eq!(Locale::from_tag("ru"), Locale::Russian);
        assert_eq!(Locale::from_tag("en_US.UTF-8"), Locale::English);
        assert_eq!(Locale::from_tag("C"), Locale::English);
        assert_eq!(Locale::from_tag(""), Locale::English);
    }

    #[test]
    fn test_permission_message_is_fixed() {
        assert_eq!(
            Locale::English.permission_denied(),
            Locale::English.permission_denied()
        );
        assert!(Locale::Russian.permission_denied().starts_with("Для работы"));
    }

    #[test]
    fn test_playback_failed_without_cause() {
        assert_eq!(
            Locale::English.playback_failed("unrecognized file format"),
            "Playback error: unrecognized file format"
        );
        assert_eq!(
            Locale::English.playback_failed(""),
            Locale::English.unknown_playback_error()
        );
        assert_eq!(
            Locale::Russian.playback_failed(""),
            Locale::Russian.unknown_playback_error()
        );
    }

    #[test]
    fn test_messages_carry_cause() {
        assert_eq!(
            Locale::English.load_failed("index locked"),
            "Failed to load videos: index locked"
        );
        assert!(Locale::Russian.folder_load_failed("x").ends_with(": x"));
        assert_eq!(Locale::English.video_count(1), "1 video");
        assert_eq!(Locale::English.video_count(3), "3 videos");
    }
}
