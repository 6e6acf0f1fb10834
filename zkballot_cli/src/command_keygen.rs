use crate::config::Config;
use crate::{write_file, ELECTION_PUBLIC, ELECTION_SECRET};
use anyhow::Result;
use rand::rngs::OsRng;
use tracing::info;
use zkballot::*;

pub fn command_keygen(matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    if matches.is_present("signing") {
        let (secret, public) = generate_keypair();
        println!("secret-key: {}", hex::encode(secret.to_bytes()));
        println!("public-key: {}", hex::encode(public.to_bytes()));
        return Ok(());
    }

    let keys = KeyPair::generate(&mut OsRng);
    let public = serde_json::to_string(&keys.public)?;

    write_file(
        &config.path(ELECTION_SECRET),
        hex::encode(scalar_to_bytes(keys.secret())),
    )?;
    write_file(&config.path(ELECTION_PUBLIC), &public)?;
    info!(dir = %config.data_dir.display(), "wrote election keypair");

    println!("public-key: {}", public.trim_matches('"'));
    Ok(())
}
