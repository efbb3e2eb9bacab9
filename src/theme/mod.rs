//! Intensity thresholds and the static theme catalog.
//!
//! A [`CarbonReading`](crate::carbon::CarbonReading)'s low-carbon percentage
//! maps to exactly one [`Intensity`] through contiguous, non-overlapping
//! bands. Each intensity resolves to a fixed [`ThemeSpec`] bundling the
//! accent colors, logo variant, and image policy applied by the rewrite
//! pipeline. The catalog is defined once and never mutated.

use serde::{Deserialize, Serialize};

/// Grid intensity classification for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    /// Clean grid: full experience.
    Low,
    /// Mixed grid: low-resolution images.
    Moderate,
    /// Dirty grid: images hidden behind a reveal control.
    High,
    /// No usable carbon data: origin styling untouched.
    Unknown,
}

/// How content images are treated under a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolicy {
    /// Leave image attributes untouched.
    Full,
    /// Rewrite `src`/`srcset` date paths to the low-res variant.
    LowRes,
    /// Hide the image behind an alt-text placeholder with a reveal control.
    HiddenReveal,
}

/// Accent color triple injected as CSS custom properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentColors {
    pub background: &'static str,
    pub highlight: &'static str,
    pub text: &'static str,
}

/// Static presentation bundle for one intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeSpec {
    pub accent: AccentColors,
    pub logo_variant: &'static str,
    pub image_policy: ImagePolicy,
}

const LOW_THEME: ThemeSpec = ThemeSpec {
    accent: AccentColors {
        background: "#0c3d2e",
        highlight: "#7ce3a1",
        text: "#eef7f0",
    },
    logo_variant: "green",
    image_policy: ImagePolicy::Full,
};

const MODERATE_THEME: ThemeSpec = ThemeSpec {
    accent: AccentColors {
        background: "#0e2a47",
        highlight: "#7cc4e3",
        text: "#edf4fa",
    },
    logo_variant: "blue",
    image_policy: ImagePolicy::LowRes,
};

const HIGH_THEME: ThemeSpec = ThemeSpec {
    accent: AccentColors {
        background: "#45260b",
        highlight: "#e3a05c",
        text: "#faf2ea",
    },
    logo_variant: "orange",
    image_policy: ImagePolicy::HiddenReveal,
};

// Unknown keeps the origin's own styling: no accent override, no logo swap,
// full images. The switcher chrome is still injected.
const UNKNOWN_THEME: ThemeSpec = ThemeSpec {
    accent: AccentColors {
        background: "",
        highlight: "",
        text: "",
    },
    logo_variant: "",
    image_policy: ImagePolicy::Full,
};

impl Intensity {
    /// Map a low-carbon percentage to an intensity.
    ///
    /// Bands: `p < 50` is High, `50 <= p < 70` is Moderate, `70 <= p <= 100`
    /// is Low. Values outside `0..=100` (or NaN) have no defined band and
    /// resolve to Unknown.
    #[must_use]
    pub fn from_low_carbon_percentage(percentage: f64) -> Self {
        if !(0.0..=100.0).contains(&percentage) {
            return Self::Unknown;
        }
        if percentage < 50.0 {
            Self::High
        } else if percentage < 70.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Parse a switcher cookie value.
    ///
    /// `live` is recognized but returns None: it means "follow the grid",
    /// i.e. resolution continues as if no override were set.
    #[must_use]
    pub fn from_override(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// The label echoed in the UI and used as the switcher option value.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Unknown => "live",
        }
    }

    /// CSS class appended to `<body>`, if any.
    #[must_use]
    pub const fn body_class(self) -> Option<&'static str> {
        match self {
            Self::Low => Some("low-grid-intensity"),
            Self::Moderate => Some("moderate-grid-intensity"),
            Self::High => Some("high-grid-intensity"),
            Self::Unknown => None,
        }
    }

    /// Look up the static theme for this intensity.
    #[must_use]
    pub const fn spec(self) -> &'static ThemeSpec {
        match self {
            Self::Low => &LOW_THEME,
            Self::Moderate => &MODERATE_THEME,
            Self::High => &HIGH_THEME,
            Self::Unknown => &UNKNOWN_THEME,
        }
    }

    /// Whether this intensity carries accent colors and a logo variant.
    #[must_use]
    pub const fn has_styling(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}
