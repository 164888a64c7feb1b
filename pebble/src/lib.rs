// SPDX-FileCopyrightText: Copyright © 2020-2024 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

pub use self::client::Client;
pub use self::config::Config;
pub use self::installation::Installation;
pub use self::package::Package;
pub use self::registry::Registry;
pub use self::store::Store;

pub mod client;
pub mod config;
pub mod dependency;
pub mod environment;
pub mod installation;
pub mod package;
pub mod registry;
pub mod store;
