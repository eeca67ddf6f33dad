// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]
mod jump_app;
mod uart;

// global logger
use defmt_rtt as _;
use panic_probe as _;

use bootloader_core::{Bootloader, Config, Layout};
use consts::{
    CONFIGURATION_CAPACITY, DEVELOPMENT_AES_KEY, FIRMWARE_CAPACITY, FLASH_PAGE_SIZE, OLDEST_VERSION, STORAGE_BASE, STORAGE_END,
};
use cortex_m_rt::entry;
use defmt::{info, panic};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::{bind_interrupts, peripherals, uarte};
use jump_app::RamBootRegion;
use static_cell::StaticCell;
use uart::Uart;

bind_interrupts!(struct Irqs {
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
});

const LAYOUT: Layout = Layout::new(STORAGE_BASE, FLASH_PAGE_SIZE, FIRMWARE_CAPACITY, CONFIGURATION_CAPACITY);
const _: () = assert!(LAYOUT.end() == STORAGE_END);

#[cfg(feature = "no-dbg-access")]
#[used]
#[link_section = ".uicr_approtect"]
pub static APP_PROTECTION: u32 = 0xFFFF_FF00;

static BOOTLOADER: StaticCell<Bootloader<Uart<'static>, Nvmc<'static>, RamBootRegion>> = StaticCell::new();

#[entry]
fn main() -> ! {
    let p = embassy_nrf::init(Default::default());

    let mut config_uart = uarte::Config::default();
    config_uart.parity = uarte::Parity::EXCLUDED;
    config_uart.baudrate = uarte::Baudrate::BAUD115200;

    // Uarte config
    let uart = uarte::Uarte::new(p.UARTE0, Irqs, p.P0_08, p.P0_06, config_uart);

    // FLASH
    let flash = Nvmc::new(p.NVMC);

    // SAFETY: taken once, and `build.rs` keeps the boot RAM out of the RAM region.
    let region = unsafe { RamBootRegion::take() };

    let config = Config {
        key: DEVELOPMENT_AES_KEY,
        oldest_version: OLDEST_VERSION,
    };

    info!("bootloader ready");
    match Bootloader::new(Uart::new(uart), flash, region, LAYOUT, config) {
        Ok(bootloader) => BOOTLOADER.init(bootloader).run(),
        Err(e) => panic!("storage layout rejected: {}", e),
    }
}
