// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

pub const NAME: &str = "pebble";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling for materializer workers
pub const MAX_BLIT_WORKERS: usize = 32;

/// A store entry younger than this suppresses duplicate-install messages
pub const RECENT_INSTALL_WINDOW: Duration = Duration::from_secs(5);

/// Set non-empty for sibling-scan diagnostics
pub const DEBUG_ENV: &str = "PEBBLE_DEBUG";

/// Overrides the configured install root
pub const INSTALL_ROOT_ENV: &str = "PEBBLE_INSTALL_ROOT";
