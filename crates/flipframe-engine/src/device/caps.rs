use std::fmt;

/// Direct3D-style feature level tiers, ordered from lowest to highest.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FeatureLevel {
    L10_0,
    L10_1,
    L11_0,
    L11_1,
}

/// Top-tier device request, highest level first.
pub const FEATURE_LEVELS: [FeatureLevel; 4] = [
    FeatureLevel::L11_1,
    FeatureLevel::L11_0,
    FeatureLevel::L10_1,
    FeatureLevel::L10_0,
];

/// Retry list used when a runtime rejects the top-tier request outright.
pub const FEATURE_LEVELS_FALLBACK: [FeatureLevel; 3] = [
    FeatureLevel::L11_0,
    FeatureLevel::L10_1,
    FeatureLevel::L10_0,
];

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureLevel::L10_0 => "10_0",
            FeatureLevel::L10_1 => "10_1",
            FeatureLevel::L11_0 => "11_0",
            FeatureLevel::L11_1 => "11_1",
        };
        f.write_str(s)
    }
}

/// Presentation technique of a swap chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SwapEffect {
    /// Flip model, buffer contents discarded after present.
    FlipDiscard,
    /// Flip model, buffer contents preserved.
    FlipSequential,
    /// Legacy blit model.
    Discard,
}

impl SwapEffect {
    pub fn is_flip(self) -> bool {
        matches!(self, SwapEffect::FlipDiscard | SwapEffect::FlipSequential)
    }
}

/// Swap-chain creation flags.
///
/// Stored as booleans rather than bitflags, like `input::Modifiers`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct SwapChainFlags {
    pub allow_mode_switch:      bool,
    pub frame_latency_waitable: bool,
    pub allow_tearing:          bool,
}

/// Full description handed to a backend when creating or resizing a swap chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwapChainDesc {
    pub width:        u32,
    pub height:       u32,
    pub buffer_count: u32,
    pub effect:       SwapEffect,
    pub flags:        SwapChainFlags,
}

/// Capabilities negotiated by `PresentationSurface::create`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SurfaceCaps {
    /// Feature level the device was created at.
    pub feature_level: Option<FeatureLevel>,

    /// The device reached feature level 11_1.
    pub feature_level_11_1: bool,

    /// Presenting outside of vblank is allowed when vsync is off.
    pub allow_tearing: bool,

    /// A flip-model swap chain was created.
    pub swap_effect_flip: bool,

    /// The swap chain exposes a frame-latency waitable object.
    pub frame_latency_waitable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_levels_are_descending() {
        assert!(FEATURE_LEVELS.windows(2).all(|w| w[0] > w[1]));
        assert!(FEATURE_LEVELS_FALLBACK.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn fallback_list_drops_only_the_top_tier() {
        assert_eq!(&FEATURE_LEVELS[1..], &FEATURE_LEVELS_FALLBACK[..]);
    }

    #[test]
    fn blit_is_not_flip() {
        assert!(SwapEffect::FlipDiscard.is_flip());
        assert!(SwapEffect::FlipSequential.is_flip());
        assert!(!SwapEffect::Discard.is_flip());
    }
}
