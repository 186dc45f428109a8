//! Graphics device + presentation surface management.
//!
//! This module is responsible for:
//! - negotiating a device at the highest available feature level
//! - walking the swap-chain fallback ladder and recording what was achieved
//! - driving the surface lifecycle (resize, vblank wait, bind, present, loss)
//!
//! Backends (`PortableBackend` everywhere, `DxgiBackend` on Windows) only
//! provide primitive steps; every decision lives in `PresentationSurface`.

mod backend;
mod caps;
mod error;
mod init;
mod ladder;
mod portable;
mod surface;

#[cfg(windows)]
mod dxgi;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{PresentBackend, WaitOutcome};
pub use caps::{
    FEATURE_LEVELS, FEATURE_LEVELS_FALLBACK, FeatureLevel, SurfaceCaps, SwapChainDesc, SwapChainFlags, SwapEffect,
};
pub use error::{GraphicsError, SurfaceError, SurfaceErrorAction};
pub use init::SurfaceInit;
pub use ladder::{SWAP_CHAIN_LADDER, SwapChainAttempt};
pub use portable::{PortableBackend, PortableDevice, PortableTarget};
pub use surface::{PresentationSurface, SurfaceState, clamp_extent};

#[cfg(windows)]
pub use dxgi::{DxgiBackend, DxgiDevice, DxgiTarget};
