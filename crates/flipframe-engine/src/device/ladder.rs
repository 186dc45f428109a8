//! Declarative swap-chain fallback ladder.
//!
//! Each rung removes exactly one optional capability from the rung above it.
//! `PresentationSurface::create` walks the rungs in order and keeps the first
//! swap chain that the backend manages to create.

use super::caps::{SwapChainDesc, SwapChainFlags, SwapEffect};

/// One swap-chain creation attempt.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SwapChainAttempt {
    pub name:     &'static str,
    pub effect:   SwapEffect,
    pub waitable: bool,
    /// Request the tearing flag when the platform reported support.
    pub tearing:  bool,
}

pub const SWAP_CHAIN_LADDER: [SwapChainAttempt; 4] = [
    SwapChainAttempt {
        name: "flip-discard + waitable",
        effect: SwapEffect::FlipDiscard,
        waitable: true,
        tearing: true,
    },
    SwapChainAttempt {
        name: "flip-discard",
        effect: SwapEffect::FlipDiscard,
        waitable: false,
        tearing: true,
    },
    SwapChainAttempt {
        name: "flip-sequential",
        effect: SwapEffect::FlipSequential,
        waitable: false,
        tearing: true,
    },
    SwapChainAttempt {
        name: "legacy blit",
        effect: SwapEffect::Discard,
        waitable: false,
        tearing: false,
    },
];

impl SwapChainAttempt {
    /// Flags this rung passes to the backend.
    ///
    /// The legacy rung only ever carries the mode-switch flag.
    pub fn flags(&self, tearing_supported: bool) -> SwapChainFlags {
        SwapChainFlags {
            allow_mode_switch: true,
            frame_latency_waitable: self.waitable,
            allow_tearing: self.tearing && tearing_supported,
        }
    }

    /// Builds the swap-chain description for this rung.
    pub fn desc(&self, width: u32, height: u32, buffer_count: u32, tearing_supported: bool) -> SwapChainDesc {
        SwapChainDesc {
            width,
            height,
            buffer_count,
            effect: self.effect,
            flags: self.flags(tearing_supported),
        }
    }

    /// Whether this rung can be tried on a device with the given flip support.
    pub fn applicable(&self, flip_capable: bool) -> bool {
        flip_capable || !self.effect.is_flip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optional_caps(a: &SwapChainAttempt) -> u32 {
        a.waitable as u32 + (a.effect == SwapEffect::FlipDiscard) as u32 + a.effect.is_flip() as u32
    }

    #[test]
    fn each_rung_drops_one_capability() {
        for pair in SWAP_CHAIN_LADDER.windows(2) {
            assert_eq!(optional_caps(&pair[0]), optional_caps(&pair[1]) + 1, "{} -> {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn legacy_rung_only_allows_mode_switch() {
        let legacy = SWAP_CHAIN_LADDER[3];
        let flags = legacy.flags(true);
        assert!(flags.allow_mode_switch);
        assert!(!flags.allow_tearing);
        assert!(!flags.frame_latency_waitable);
    }

    #[test]
    fn tearing_flag_follows_support() {
        assert!(SWAP_CHAIN_LADDER[0].flags(true).allow_tearing);
        assert!(!SWAP_CHAIN_LADDER[0].flags(false).allow_tearing);
    }

    #[test]
    fn flip_rungs_need_flip_capability() {
        let usable: Vec<_> = SWAP_CHAIN_LADDER.iter().filter(|a| a.applicable(false)).collect();
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].effect, SwapEffect::Discard);
    }
}
