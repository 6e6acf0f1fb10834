use crate::config::Config;
use crate::*;
use anyhow::Result;
use rand::rngs::OsRng;
use tracing::info;

/// Generate and store the Groth16 keys for `N` candidates
pub fn command_setup<const N: usize>(config: &Config) -> Result<()> {
    let mut rng = OsRng;

    info!(candidates = N, "generating vote circuit keys");
    let vote = setup_vote::<N, _>(&mut rng)?;
    write_file(&config.path(VOTE_PROVING_KEY), vote.proving.to_bytes()?)?;
    write_file(&config.path(VOTE_VERIFYING_KEY), vote.verifying.to_bytes()?)?;

    info!(candidates = N, "generating tally circuit keys");
    let tally = setup_tally::<N, _>(&mut rng)?;
    write_file(&config.path(TALLY_PROVING_KEY), tally.proving.to_bytes()?)?;
    write_file(&config.path(TALLY_VERIFYING_KEY), tally.verifying.to_bytes()?)?;

    println!(
        "> Circuit keys for {} candidates written to {}",
        N,
        config.data_dir.display()
    );
    Ok(())
}
