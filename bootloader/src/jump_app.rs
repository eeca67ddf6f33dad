// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use bootloader_core::{BootRegion, ExecutableImage};
use consts::{BOOT_RAM_BASE, BOOT_RAM_SIZE};
use cortex_m::peripheral::NVIC;
use defmt::info;
use embassy_nrf::interrupt::Interrupt;

/// The top of RAM, outside of what the linker hands out (see `build.rs`).
/// Verified firmware is decrypted here and executed in place.
pub struct RamBootRegion {
    memory: &'static mut [u8],
}

impl RamBootRegion {
    /// # Safety
    ///
    /// Must be called at most once, and the boot RAM must not be part of the
    /// linker's RAM region.
    pub unsafe fn take() -> Self {
        Self {
            memory: core::slice::from_raw_parts_mut(BOOT_RAM_BASE as *mut u8, BOOT_RAM_SIZE as usize),
        }
    }
}

impl BootRegion for RamBootRegion {
    fn base(&self) -> u32 {
        BOOT_RAM_BASE
    }

    fn memory(&mut self) -> &mut [u8] {
        &mut *self.memory
    }

    fn jump(&mut self, image: ExecutableImage) -> ! {
        info!("starting {=usize} byte image at {=u32:x}", image.len(), image.entry());

        // Disable active interrupts
        NVIC::mask(Interrupt::UARTE0_UART0);

        // The image was written through the data bus, make it visible to
        // instruction fetches before branching into it.
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        // SAFETY: `image` only exists after its plaintext in this region hashed
        // to the committed digest. The entry address carries the Thumb bit.
        unsafe {
            // These instructions perform the following operations:
            //
            // * Set link register to not return (0xFF)
            // * Branch to the image entry point
            core::arch::asm!(
                "mov lr, {new_lr}",
                "bx {entry}",
                new_lr = in(reg) 0xFFFFFFFFu32,
                entry = in(reg) image.entry(),
                options(noreturn),
            )
        }
    }
}
