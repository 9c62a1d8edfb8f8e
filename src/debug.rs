// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Build-time debug configuration.

/// True if the build is configured with debug assertions on.
pub const DEBUG: bool = cfg!(debug_assertions);

/// Whether runtime invariant checks that cost extra register reads are
/// compiled in.
pub const ENABLE_ASSERTIONS: bool = DEBUG;
