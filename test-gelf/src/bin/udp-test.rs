// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// gelf-tracing is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with gelf-tracing.  If
// not, see <http://www.gnu.org/licenses/>.

//! Test writing to a GELF receiver; port 12201 on the local host unless the environment says
//! otherwise (see `Config::from_env`).

use gelf_tracing::{config::Config, layer::Layer};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let config = Config::from_env().unwrap();
    // Setup the real subsriber...
    let subscriber = Registry::default().with(Layer::from_config(&config).unwrap());
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!("Hello, 世界!");
    info!(user = "bob", attempts = 3, "Hello, 世界!");
    warn!("Hello, 世界!");
    error!("Hello, 世界!");

    // Big & noisy enough that it won't compress into a single datagram
    let noise: String = (0..40_000u32)
        .map(|i| char::from(b'!' + (i.wrapping_mul(2654435761) >> 27) as u8))
        .collect();
    info!(noise = noise.as_str(), "A chunked message");
}
