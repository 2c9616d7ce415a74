use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use keyrelay::cli::CliArgs;
use keyrelay::config::RelayConfig;
use keyrelay::injector::{HostInjector, InputInjector, MemoryInjector};
use keyrelay::protocol::Session;
use keyrelay::server::RelayServer;
use keyrelay::{net, rules};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    keyrelay::tracing::init(!args.no_log_file);

    let config = match &args.config {
        Some(path) => RelayConfig::load_from(path),
        None => RelayConfig::load(),
    };
    let startup = args.into_startup(config);

    let rules = rules::load_rules(startup.rules_file.as_deref());
    let rule_count = rules.len();

    let injector: Box<dyn InputInjector> = if startup.dry_run {
        tracing::info!("Dry run: input will be logged, not typed");
        Box::new(MemoryInjector::new())
    } else {
        tracing::info!(
            "Pasting with {} (settle {:?})",
            startup.paste_shortcut,
            startup.paste_settle
        );
        Box::new(HostInjector::new(startup.paste_shortcut, startup.paste_settle))
    };

    let session = Arc::new(Session::new(rules, injector));
    let server = RelayServer::bind(startup.addr, session)
        .with_context(|| format!("Failed to start server on {}", startup.addr))?;
    let addr = server.local_addr().unwrap_or(startup.addr);

    println!();
    println!("Server started!");
    println!("Open on your phone: {}", net::phone_url(addr));
    println!("Loaded {} replacement rule(s)", rule_count);
    println!("Note: the phone and this computer must be on the same network");
    println!();

    server.run();
    Ok(())
}
