//! Placeholder strings per display language.

/// Languages with a translated "no data" placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Polish.
    Pl,
    /// German.
    De,
}

impl Locale {
    /// Pick a locale from a language tag such as `en-GB` or `pl`.
    ///
    /// Only the first two characters are considered; unknown languages fall
    /// back to English.
    #[must_use]
    pub fn from_language(tag: &str) -> Self {
        let prefix: String = tag.chars().take(2).collect::<String>().to_ascii_lowercase();
        match prefix.as_str() {
            "pl" => Self::Pl,
            "de" => Self::De,
            _ => Self::En,
        }
    }

    /// Text shown in place of a value when an entity has no usable state.
    #[must_use]
    pub const fn no_data(self) -> &'static str {
        match self {
            Self::En | Self::De => "N/A",
            Self::Pl => "Brak",
        }
    }
}
