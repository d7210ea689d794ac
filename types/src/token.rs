use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One word of an announcement.
///
/// Announcements are ordered token sequences; sinks decide how to render
/// them (audio clips, text). [`Token::stem`] gives the stable symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// A trait's own display/voice token
    Trait(String),
    /// "The hunter used ..."
    HunterUsed,
    /// Closes a use announcement
    UsedSuffix,
    Remaining,
    Seconds(u32),
    Ready,
    /// Stack is full
    Full,
    /// Number of charges now held
    Charged(u8),
    MatchStarted,
    MatchEnded,
}

impl Token {
    pub fn stem(&self) -> Cow<'_, str> {
        match self {
            Self::Trait(token) => Cow::Borrowed(token.as_str()),
            Self::HunterUsed => Cow::Borrowed("hunter_ga"),
            Self::UsedSuffix => Cow::Borrowed("wo_shiyou"),
            Self::Remaining => Cow::Borrowed("nokori"),
            Self::Seconds(secs) => Cow::Owned(format!("{secs}byo")),
            Self::Ready => Cow::Borrowed("tsukae_masu"),
            Self::Full => Cow::Borrowed("mantan"),
            Self::Charged(1) => Cow::Borrowed("hitotsu_kaifuku"),
            Self::Charged(2) => Cow::Borrowed("futatsu_kaifuku"),
            Self::Charged(n) => Cow::Owned(format!("{n}_kaifuku")),
            Self::MatchStarted => Cow::Borrowed("shiai_kaishi"),
            Self::MatchEnded => Cow::Borrowed("shiai_shuuryou"),
        }
    }

    pub fn for_trait(token: &str) -> Self {
        Self::Trait(token.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}
