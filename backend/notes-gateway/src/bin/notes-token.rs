//! Issue a credential for a user id using the configured JWT_SECRET
//!
//! Usage: notes-token <user-id>

use anyhow::{bail, Context};
use crypto_core::jwt::Identity;
use notes_gateway::config::Config;
use std::env;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage:");
        eprintln!("  notes-token <user-id>");
        std::process::exit(1);
    }

    let user_id = args[1].trim();
    if user_id.is_empty() {
        bail!("user id must not be empty");
    }

    let codec = Config::jwt_from_env()
        .and_then(|jwt| jwt.credential_codec())
        .context("Failed to load credential configuration")?;

    let credential = codec
        .sign(&Identity::new(user_id))
        .context("Failed to sign credential")?;

    println!("{}", credential);
    Ok(())
}
