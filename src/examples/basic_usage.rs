//! Basic usage against a running Terrastore server
//!
//! Run with: cargo run -p terrastore-rs --example basic_usage
//!
//! Expects a server on http://localhost:8080 (override with TERRASTORE_HOST).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use terrastore_rs::terrastore_core::{MergeDescriptor, Values};
use terrastore_rs::{ClientError, TerrastoreClient};

#[derive(Debug, Serialize, Deserialize)]
struct Customer {
    name: String,
    city: String,
    orders: u32,
}

fn main() -> terrastore_rs::Result<()> {
    let host =
        std::env::var("TERRASTORE_HOST").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let client = TerrastoreClient::new(host)?;
    let customers = client.bucket("customers");

    println!("=== Put and get ===");
    customers.key("sergio").put(&Customer {
        name: "Sergio".to_string(),
        city: "Rome".to_string(),
        orders: 1,
    })?;
    let sergio: Customer = customers.key("sergio").get()?;
    println!("{:?}", sergio);

    println!("\n=== Bulk put ===");
    let mut batch = Values::new();
    for (key, name, city) in [("jane", "Jane", "London"), ("pat", "Pat", "Berlin")] {
        batch.insert(
            key,
            Customer {
                name: name.to_string(),
                city: city.to_string(),
                orders: 0,
            },
        );
    }
    let stored = customers.bulk().put(batch)?;
    println!("Stored keys: {:?}", stored);

    println!("\n=== Range query ===");
    let range: Values<Customer> = customers.range().from("a").to("p").limit(10).get()?;
    for (key, customer) in range.iter() {
        println!("  {} -> {}", key, customer.name);
    }

    println!("\n=== Predicate query ===");
    let in_rome: Values<Customer> = customers.predicate("jxpath:/city[.='Rome']").get()?;
    println!("{} customer(s) in Rome", in_rome.len());

    println!("\n=== Merge ===");
    let mut changes = Map::new();
    changes.insert("city".to_string(), json!("Milan"));
    let merged: Customer = customers
        .key("sergio")
        .merge(MergeDescriptor::new().replace(changes))
        .execute_and_get()?;
    println!("{:?}", merged);

    println!("\n=== Missing keys ===");
    match customers.key("nobody").get::<Customer>() {
        Err(ClientError::NoSuchKey { message, .. }) => println!("Not found: {}", message),
        other => println!("Unexpected: {:?}", other),
    }

    customers.clear()?;
    println!("\nBuckets: {:?}", client.buckets().list()?);
    Ok(())
}
