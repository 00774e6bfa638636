use kernel_info::memory;
use std::{env, path::PathBuf};

fn main() {
    let phys_load = memory::PHYS_LOAD;
    assert_eq!(
        phys_load & 0xfff,
        0,
        "PHYS_LOAD must be 4 KiB aligned (got {phys_load:#x})"
    );
    assert!(
        memory::KERNEL_RESERVED_END > phys_load,
        "kernel image window must end above PHYS_LOAD"
    );

    // Host builds (unit tests) link normally.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let ld = manifest_dir.join("kernel.ld");

    println!("cargo:rerun-if-changed={}", ld.display());
    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());
    println!("cargo:rustc-link-arg-bins=--defsym=KERNEL_PHYS_LOAD={phys_load:#x}");
    println!(
        "cargo:rustc-link-arg-bins=--defsym=KERNEL_IMAGE_END={:#x}",
        memory::KERNEL_RESERVED_END
    );
}
