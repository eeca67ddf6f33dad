// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Renders `memory.x` from the board constants into a directory on the linker
//! search path.
//!
//! The bootloader owns the first flash partition. RAM stops at the boot RAM,
//! which is kept out of the linker's reach so the stack and statics never
//! overlap the firmware staged there.

use consts::{BASE_BOOTLOADER_ADDR, BOOTLOADER_SIZE, BOOT_RAM_BASE, RAM_BASE};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    let memory_x_content = format!(
        r##"
        MEMORY
        {{
            /* NOTE 1 K = 1 KiBi = 1024 bytes */
            FLASH (rx) : ORIGIN = {flash_origin:#X}, LENGTH = {flash_length:#X}
            RAM (rwx) : ORIGIN = {ram_origin:#X}, LENGTH = {ram_length:#X}
            uicr_approtect (r) : ORIGIN = 0x10001208, LENGTH = 0x4
        }}

        SECTIONS {{
            .uicr_approtect : {{
                KEEP(*(.uicr_approtect))
                . = ALIGN(4);
            }} > uicr_approtect
        }};
        "##,
        flash_origin = BASE_BOOTLOADER_ADDR,
        flash_length = BOOTLOADER_SIZE,
        ram_origin = RAM_BASE,
        ram_length = BOOT_RAM_BASE - RAM_BASE,
    );
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(memory_x_content.as_bytes())
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../consts/src/lib.rs");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
