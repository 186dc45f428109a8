//! Imm32 input-method backend, loaded at runtime.

use std::collections::HashMap;
use std::ffi::c_void;

use raw_window_handle::RawWindowHandle;
use windows::Win32::Foundation::{FreeLibrary, HMODULE, HWND};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::core::{PCSTR, s, w};

use crate::window::NativeWindow;

use super::adapter::ImeBackend;

type Himc = *mut c_void;

const IME_CMODE_NOCONVERSION: u32 = 0x0100;
const IME_CMODE_FIXED: u32 = 0x0800;
const IME_CMODE: u32 = IME_CMODE_FIXED | IME_CMODE_NOCONVERSION;
const IME_SMODE_NONE: u32 = 0;

type ImmGetContextFn = unsafe extern "system" fn(HWND) -> Himc;
type ImmReleaseContextFn = unsafe extern "system" fn(HWND, Himc) -> i32;
type ImmSetOpenStatusFn = unsafe extern "system" fn(Himc, i32) -> i32;
type ImmGetOpenStatusFn = unsafe extern "system" fn(Himc) -> i32;
type ImmSetConversionStatusFn = unsafe extern "system" fn(Himc, u32, u32) -> i32;
type ImmAssociateContextFn = unsafe extern "system" fn(HWND, Himc) -> Himc;

/// Function table resolved from `imm32.dll`.
pub struct Imm32Backend {
    module: HMODULE,
    get_context: ImmGetContextFn,
    release_context: ImmReleaseContextFn,
    set_open_status: ImmSetOpenStatusFn,
    get_open_status: ImmGetOpenStatusFn,
    set_conversion_status: ImmSetConversionStatusFn,
    associate_context: ImmAssociateContextFn,
    // Contexts detached by `toggle_association`, keyed by HWND.
    detached: HashMap<usize, usize>,
}

// SAFETY: the module handle and input contexts are process-wide handles; Imm32
// marshals calls made from threads other than the window's owner.
unsafe impl Send for Imm32Backend {}

unsafe fn resolve<F>(module: HMODULE, name: PCSTR) -> Option<F> {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<usize>());
    let proc = unsafe { GetProcAddress(module, name) }?;
    Some(unsafe { std::mem::transmute_copy(&proc) })
}

impl Imm32Backend {
    /// Loads the library; `None` when it or any entry point is missing.
    pub fn load() -> Option<Self> {
        let module = unsafe { LoadLibraryW(w!("imm32.dll")) }.ok()?;
        let table = unsafe {
            (|| {
                Some(Self {
                    module,
                    get_context: resolve(module, s!("ImmGetContext"))?,
                    release_context: resolve(module, s!("ImmReleaseContext"))?,
                    set_open_status: resolve(module, s!("ImmSetOpenStatus"))?,
                    get_open_status: resolve(module, s!("ImmGetOpenStatus"))?,
                    set_conversion_status: resolve(module, s!("ImmSetConversionStatus"))?,
                    associate_context: resolve(module, s!("ImmAssociateContext"))?,
                    detached: HashMap::new(),
                })
            })()
        };
        if table.is_none() {
            let _ = unsafe { FreeLibrary(module) };
        }
        table
    }

    fn hwnd(window: &dyn NativeWindow) -> Option<HWND> {
        match window.raw_handle()? {
            RawWindowHandle::Win32(h) => Some(HWND(h.hwnd.get() as *mut c_void)),
            _ => None,
        }
    }

    /// Runs `f` with the window's input context, releasing it afterwards.
    fn with_context<R>(&self, window: &dyn NativeWindow, f: impl FnOnce(Himc) -> R) -> Option<R> {
        let hwnd = Self::hwnd(window)?;
        let imc = unsafe { (self.get_context)(hwnd) };
        if imc.is_null() {
            return None;
        }
        let result = f(imc);
        unsafe { (self.release_context)(hwnd, imc) };
        Some(result)
    }
}

impl Drop for Imm32Backend {
    fn drop(&mut self) {
        let _ = unsafe { FreeLibrary(self.module) };
    }
}

impl ImeBackend for Imm32Backend {
    fn set_open(&mut self, window: &dyn NativeWindow, open: bool) -> bool {
        let set_open = self.set_open_status;
        self.with_context(window, |imc| unsafe { set_open(imc, open as i32) } != 0)
            .unwrap_or(false)
    }

    fn open_status(&self, window: &dyn NativeWindow) -> bool {
        let get_open = self.get_open_status;
        self.with_context(window, |imc| unsafe { get_open(imc) } != 0)
            .unwrap_or(false)
    }

    fn set_non_converting(&mut self, window: &dyn NativeWindow) -> bool {
        let set_conversion = self.set_conversion_status;
        self.with_context(window, |imc| unsafe { set_conversion(imc, IME_CMODE, IME_SMODE_NONE) } != 0)
            .unwrap_or(false)
    }

    fn toggle_association(&mut self, window: &dyn NativeWindow) -> bool {
        let Some(hwnd) = Self::hwnd(window) else {
            return false;
        };
        let key = hwnd.0 as usize;
        let attach = self.detached.remove(&key).unwrap_or(0) as Himc;
        let previous = unsafe { (self.associate_context)(hwnd, attach) };
        if !previous.is_null() {
            self.detached.insert(key, previous as usize);
        }
        log::debug!(
            "input context {}",
            if attach.is_null() { "detached" } else { "reattached" }
        );
        true
    }
}
