use crate::config::Config;
use crate::*;
use anyhow::{Context, Result};
use rand::rngs::OsRng;
use std::path::PathBuf;

pub fn command_vote<const N: usize>(matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    let candidate = matches.value_of("CANDIDATE").unwrap_or_default();
    let candidate: u64 = candidate
        .parse()
        .with_context(|| format!("invalid candidate: {}", candidate))?;

    let proving_key = load_proving_key(config, VOTE_PROVING_KEY)?;
    let election_public = load_election_public(config)?;

    let (ballot, secret) = cast_ballot::<N, _>(&proving_key, &election_public, candidate, &mut OsRng)?;

    if let Some(path) = matches.value_of("secret-out") {
        let path = PathBuf::from(expand(path));
        write_file(&path, serde_json::to_string_pretty(&secret)?)?;
    }

    println!("{}", serde_json::to_string_pretty(&ballot)?);
    Ok(())
}

pub fn command_verify_vote(matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    let ballot: Ballot = read_json(matches.value_of("BALLOT").unwrap_or_default())?;
    let num_candidates = candidates(matches, config)?;

    let verifying_key = load_verifying_key(config, VOTE_VERIFYING_KEY)?;
    let election_public = load_election_public(config)?;

    ballot.verify(&verifying_key, num_candidates, &election_public)?;

    println!("> Ballot verified OK");
    println!("  commitment: {}", fq_to_hex(&ballot.commitment));
    Ok(())
}
