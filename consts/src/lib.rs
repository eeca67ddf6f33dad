// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

/// Size of a flash memory page in bytes (4KB) on the nRF52840.
/// Erase and program operations of the bootloader always work on whole pages,
/// so every storage region below starts on a multiple of this value.
pub const FLASH_PAGE_SIZE: u32 = 4096;

/// Total size of the internal flash of the nRF52840 (1MB).
pub const FLASH_SIZE: u32 = 0x10_0000;

/// Start address of the bootloader code in flash memory.
/// The bootloader runs straight out of reset, there is no MBR or SoftDevice.
pub const BASE_BOOTLOADER_ADDR: u32 = 0x0000_0000;

/// Flash reserved for the bootloader code (64KB).
pub const BOOTLOADER_SIZE: u32 = 0x1_0000;

/// First address of the persistent storage managed by the bootloader.
/// Firmware slots and configuration live between this address and
/// [`STORAGE_END`].
pub const STORAGE_BASE: u32 = BASE_BOOTLOADER_ADDR + BOOTLOADER_SIZE;

/// Capacity of one firmware body (16KB). An update declaring a bigger size is
/// rejected before anything is written.
pub const FIRMWARE_CAPACITY: u32 = 16 * 1024;

/// Capacity of the configuration body (64KB).
pub const CONFIGURATION_CAPACITY: u32 = 64 * 1024;

/// Pages in front of every firmware body: one hash page and two metadata pages.
pub const FIRMWARE_HEADER_PAGES: u32 = 3;

/// Size of one firmware slot (header pages and body).
pub const FIRMWARE_SLOT_SIZE: u32 = FIRMWARE_HEADER_PAGES * FLASH_PAGE_SIZE + FIRMWARE_CAPACITY;

/// Size of the configuration region (metadata page and body).
pub const CONFIGURATION_REGION_SIZE: u32 = FLASH_PAGE_SIZE + CONFIGURATION_CAPACITY;

/// End of the persistent storage (exclusive). Two firmware slots followed by
/// the configuration region.
pub const STORAGE_END: u32 = STORAGE_BASE + 2 * FIRMWARE_SLOT_SIZE + CONFIGURATION_REGION_SIZE;

/// Base of the RAM on the nRF52840.
pub const RAM_BASE: u32 = 0x2000_0000;

/// Total RAM of the nRF52840 (256KB).
pub const RAM_SIZE: u32 = 0x4_0000;

/// Executable RAM the verified firmware is copied into before the jump.
/// The top 64KB of RAM are kept away from the bootloader stack and statics.
pub const BOOT_RAM_BASE: u32 = 0x2003_0000;

/// Size of the boot RAM region. Must hold a full firmware body.
pub const BOOT_RAM_SIZE: u32 = 0x1_0000;

/// Version reported when no firmware has ever been committed. Updates below it
/// are rejected, version 0 keeps it.
pub const OLDEST_VERSION: u32 = 1;

/// AES-128 key the firmware images are encrypted with.
///
/// This is a development placeholder shared by the device and the host tools,
/// a static key with a zero IV gives no semantic security. Production devices
/// need a provisioned key.
pub const DEVELOPMENT_AES_KEY: [u8; 16] = [
    0x1a, 0x2a, 0x3a, 0x4a, 0x5a, 0x6a, 0x7a, 0x8a, 0x1a, 0x2a, 0x3a, 0x4a, 0x5a, 0x6a, 0x7a, 0x8a,
];

const _: () = assert!(STORAGE_BASE % FLASH_PAGE_SIZE == 0);
const _: () = assert!(FIRMWARE_CAPACITY % FLASH_PAGE_SIZE == 0);
const _: () = assert!(CONFIGURATION_CAPACITY % FLASH_PAGE_SIZE == 0);
const _: () = assert!(STORAGE_END <= FLASH_SIZE);
const _: () = assert!(BOOT_RAM_SIZE >= FIRMWARE_CAPACITY);
const _: () = assert!(BOOT_RAM_BASE + BOOT_RAM_SIZE <= RAM_BASE + RAM_SIZE);
