//! Environment readiness check.

use std::path::Path;

use anyhow::Result;

use crate::browser::check_socket;
use crate::config::Config;

/// Print the effective config and whether the browser endpoint answers.
pub async fn run(config_path: Option<&Path>, config: &Config) -> Result<()> {
    println!("Saved Places Doctor");
    println!("===================");
    println!();

    match config_path {
        Some(path) => println!("[OK] Config: {}", path.display()),
        None => println!("[OK] Config: built-in defaults"),
    }
    println!("     Bookmarks: {}", config.bookmarks_url);
    println!("     Save control: {}", config.classifier.control_selector);
    match config.classifier.target_list {
        Some(list) => println!("     Target list: {list:?}"),
        None => println!("     Target list: default"),
    }
    println!();

    let endpoint = &config.endpoint;
    let reachable = check_socket(&endpoint.host, endpoint.port, config.probe_timeout()).await;
    if reachable {
        println!("[OK] Remote debugging endpoint {} is reachable", endpoint.http_url());
    } else {
        println!(
            "[!!] Remote debugging endpoint {} is NOT reachable",
            endpoint.http_url()
        );
    }

    println!();
    if reachable {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!(
            "  Start Chrome with --remote-debugging-port={} and log in.",
            endpoint.port
        );
    }

    Ok(())
}
