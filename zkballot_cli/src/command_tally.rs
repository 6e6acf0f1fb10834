use crate::config::Config;
use crate::*;
use anyhow::{bail, Result};
use rand::rngs::OsRng;
use tracing::info;

pub fn command_tally<const N: usize>(matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    let ballots = read_ballots(matches)?;
    let keys = load_election_keypair(config)?;
    let proving_key = load_proving_key(config, TALLY_PROVING_KEY)?;
    info!(ballots = ballots.len(), "tallying");

    let solver = match matches.value_of("election") {
        Some(path) => {
            let election: Signed<ElectionTransaction> = read_json(path)?;
            if election.encryption_public != keys.public {
                bail!("election {} is encrypted to a different key", election.id);
            }
            if ballots.len() as u64 > election.max_votes {
                bail!(
                    "{} ballots exceed the {} votes election {} allows",
                    ballots.len(),
                    election.max_votes,
                    election.id
                );
            }
            election.solver()
        }
        // No candidate can receive more votes than there are ballots
        None => BabyStepGiantStep::new(ballots.len() as u64),
    };

    let ciphertexts: Vec<Vec<Ciphertext>> = ballots.into_iter().map(|b| b.ciphertexts).collect();
    let tally = tally_ballots::<N, _, _>(&proving_key, &keys, &ciphertexts, &solver, &mut OsRng)?;

    println!("{}", serde_json::to_string_pretty(&tally)?);
    Ok(())
}

pub fn command_verify_tally(matches: &clap::ArgMatches, config: &Config) -> Result<()> {
    let tally: Tally = read_json(matches.value_of("TALLY").unwrap_or_default())?;
    let ballots = read_ballots(matches)?;
    let num_candidates = tally.num_candidates();

    let vote_key = load_verifying_key(config, VOTE_VERIFYING_KEY)?;
    let tally_key = load_verifying_key(config, TALLY_VERIFYING_KEY)?;
    let election_public = load_election_public(config)?;

    // Only well-formed ballots count towards the aggregate
    for ballot in &ballots {
        ballot.verify(&vote_key, num_candidates, &election_public)?;
    }

    let ciphertexts: Vec<Vec<Ciphertext>> = ballots.iter().map(|b| b.ciphertexts.clone()).collect();
    let aggregate = aggregate_votes(&ciphertexts, num_candidates)?;
    tally.check(&tally_key, &election_public, &aggregate, ballots.len() as u64)?;

    println!("> Tally verified OK");
    for (candidate, total) in tally.results.iter().enumerate() {
        println!("  candidate {} got {} votes", candidate, total);
    }
    Ok(())
}
