//! List store walkthrough
//!
//! Run with `RUST_LOG=list_store=trace` to see every notification round.

use list_store::{new_list_store, List};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("list_store=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    println!("=== List Store Example ===\n");

    let lists = new_list_store();
    let names = lists.map(|lists| {
        lists
            .iter()
            .map(|list| list.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    });

    let sidebar = lists.subscribe(|lists| {
        println!("Sidebar now shows {} lists", lists.len());
    });
    let _header = names.subscribe(|names| println!("Header: {names}"));

    println!("\nAdding a list...");
    lists.update(|current| [current.clone(), vec![List::new("list-4", "List 4")]].concat());

    println!("\nRenaming list-2...");
    lists.modify(|lists| {
        if let Some(list) = lists.iter_mut().find(|list| list.id == "list-2") {
            list.name = "Groceries".to_string();
        }
    });

    sidebar.unsubscribe();

    println!("\nClearing...");
    lists.set(Vec::new());

    println!("\nFinal state: {:#?}", lists.get());
}
