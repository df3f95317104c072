//! Per-thread COM initialisation guard.

use crate::error::{CoreError, CoreResult};
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

/// Keeps COM initialised on the current thread for as long as it lives.
///
/// If the thread already joined a multithreaded apartment the guard borrows
/// it and does not uninitialise on drop.
pub struct ComApartment {
    owned: bool,
    // COM apartments are thread-affine.
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ComApartment {
    pub fn enter() -> CoreResult<Self> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr.is_ok() {
            return Ok(Self {
                owned: true,
                _not_send: std::marker::PhantomData,
            });
        }
        if hr == RPC_E_CHANGED_MODE {
            return Ok(Self {
                owned: false,
                _not_send: std::marker::PhantomData,
            });
        }
        Err(CoreError::Failed(format!("CoInitializeEx failed: {hr:?}")))
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}
