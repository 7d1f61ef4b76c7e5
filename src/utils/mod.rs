//! Filesystem and download helpers shared by the package model and toolchain.

pub mod fs;
pub mod http;
