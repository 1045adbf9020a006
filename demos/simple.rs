//Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

// Run with `RUST_LOG=simple_secret_service=debug cargo run --example simple`

use simple_secret_service::{Error, SimpleService};
use std::collections::HashMap;
use std::str;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if !SimpleService::is_available() {
        eprintln!("no secret service provider on the session bus");
        return;
    }

    if let Err(err) = run() {
        // something went wrong
        eprintln!("error: {err}");
    }
    // every secret fetched in `run` has been wiped by now
}

fn run() -> Result<(), Error> {
    let mut collection = SimpleService::new().connect_to("My Collection", "super secret")?;

    // define unique attributes
    let attributes = HashMap::from([("uuid", "42")]);

    // create and forget
    collection.create_item_with_attributes("My Item", "secret", attributes.clone())?;

    // find by attributes
    let items = collection.get_items(attributes)?;
    println!("Found items: {items:?}");
    let Some(item) = items.first() else {
        return Err(Error::NoResult);
    };

    println!("Label: {:?}", collection.get_label(item)?);
    println!("Attributes: {:?}", collection.get_attributes(item)?);
    if let Some(secret) = collection.get_secret(item)? {
        println!("Retrieved secret: {:?}", str::from_utf8(secret));
    }

    collection.delete_item(item)?;
    collection.delete()?;
    collection.close()
}
