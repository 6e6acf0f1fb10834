use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, SubCommand};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use zkballot::*;

/// Monomorphize a `const N` command for the requested candidate count
macro_rules! with_candidates {
    ($n:expr, $command:ident ( $($arg:expr),* )) => {
        match $n {
            1 => $command::<1>($($arg),*),
            2 => $command::<2>($($arg),*),
            3 => $command::<3>($($arg),*),
            4 => $command::<4>($($arg),*),
            5 => $command::<5>($($arg),*),
            6 => $command::<6>($($arg),*),
            7 => $command::<7>($($arg),*),
            8 => $command::<8>($($arg),*),
            9 => $command::<9>($($arg),*),
            10 => $command::<10>($($arg),*),
            11 => $command::<11>($($arg),*),
            12 => $command::<12>($($arg),*),
            13 => $command::<13>($($arg),*),
            14 => $command::<14>($($arg),*),
            15 => $command::<15>($($arg),*),
            16 => $command::<16>($($arg),*),
            n => Err(anyhow!(
                "{} candidates is unsupported (must be between 1 and {})",
                n,
                MAX_CANDIDATES
            )),
        }
    };
}

mod command_audit;
mod command_e2e;
mod command_keygen;
mod command_setup;
mod command_tally;
mod command_vote;
mod config;

use command_audit::*;
use command_e2e::*;
use command_keygen::*;
use command_setup::*;
use command_tally::*;
use command_vote::*;
use config::Config;

pub const ELECTION_SECRET: &str = "election.key";
pub const ELECTION_PUBLIC: &str = "election.pub";
pub const VOTE_PROVING_KEY: &str = "vote.pk";
pub const VOTE_VERIFYING_KEY: &str = "vote.vk";
pub const TALLY_PROVING_KEY: &str = "tally.pk";
pub const TALLY_VERIFYING_KEY: &str = "tally.vk";

fn main() -> Result<()> {
    let candidates_arg = Arg::with_name("candidates")
        .long("candidates")
        .short("n")
        .takes_value(true)
        .help("Number of candidates - can also be set with ZKBALLOT_CANDIDATES");

    let matches = App::new("zkballot CLI")
        .version("1.0")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Verifiable homomorphic elections with zero-knowledge proofs")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("keygen")
                .about("Generate an election encryption keypair")
                .arg(
                    Arg::with_name("signing")
                        .long("signing")
                        .help("Print an ed25519 signing keypair instead"),
                ),
        )
        .subcommand(
            SubCommand::with_name("setup")
                .about("Generate Groth16 keys for the vote and tally circuits")
                .arg(candidates_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("vote")
                .about("Encrypt and prove a ballot")
                .arg(candidates_arg.clone())
                .arg(
                    Arg::with_name("CANDIDATE")
                        .index(1)
                        .required(true)
                        .help("Candidate index, starting at 0"),
                )
                .arg(
                    Arg::with_name("secret-out")
                        .long("secret-out")
                        .takes_value(true)
                        .help("Where to keep the ballot secret for later self-audit"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify-vote")
                .about("Verify a ballot and its proof")
                .arg(candidates_arg.clone())
                .arg(
                    Arg::with_name("BALLOT")
                        .index(1)
                        .required(true)
                        .help("Ballot file in JSON format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("tally")
                .about("Decrypt the aggregate of a set of ballots and prove the result")
                .arg(candidates_arg.clone())
                .arg(
                    Arg::with_name("election")
                        .long("election")
                        .takes_value(true)
                        .help("Signed election transaction whose max_votes bounds decryption"),
                )
                .arg(
                    Arg::with_name("BALLOTS")
                        .index(1)
                        .multiple(true)
                        .help("Ballot files, each a ballot or a list of ballots"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify-tally")
                .about("Verify a tally against the ballots it claims to count")
                .arg(
                    Arg::with_name("TALLY")
                        .index(1)
                        .required(true)
                        .help("Tally file in JSON format"),
                )
                .arg(
                    Arg::with_name("BALLOTS")
                        .index(2)
                        .multiple(true)
                        .help("Ballot files, each a ballot or a list of ballots"),
                ),
        )
        .subcommand(
            SubCommand::with_name("audit")
                .about("Build or check an audit bundle")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("build")
                        .about("Build an audit bundle from ledger vote events")
                        .arg(
                            Arg::with_name("EVENTS")
                                .index(1)
                                .required(true)
                                .help("JSON list of vote events"),
                        ),
                )
                .subcommand(
                    SubCommand::with_name("verify")
                        .about("Verify every entry of an audit bundle")
                        .arg(
                            Arg::with_name("BUNDLE")
                                .index(1)
                                .required(true)
                                .help("Audit bundle in JSON format"),
                        )
                        .arg(
                            Arg::with_name("commitment")
                                .long("commitment")
                                .takes_value(true)
                                .help("Also locate and check the entry for this commitment"),
                        ),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a complete election on an in-memory ledger")
                .arg(candidates_arg)
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .help("Number of voters (default 5)"),
                ),
        )
        .get_matches();

    let level = match matches.occurrences_of("v") {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches, &config),
        ("setup", Some(matches)) => {
            with_candidates!(candidates(matches, &config)?, command_setup(&config))
        }
        ("vote", Some(matches)) => {
            with_candidates!(candidates(matches, &config)?, command_vote(matches, &config))
        }
        ("verify-vote", Some(matches)) => command_verify_vote(matches, &config),
        ("tally", Some(matches)) => {
            with_candidates!(candidates(matches, &config)?, command_tally(matches, &config))
        }
        ("verify-tally", Some(matches)) => command_verify_tally(matches, &config),
        ("audit", Some(matches)) => command_audit(matches),
        ("e2e", Some(matches)) => {
            with_candidates!(candidates(matches, &config)?, command_e2e(matches))
        }
        _ => Ok(()),
    }
}

/// Candidate count from `--candidates`, falling back to the environment
fn candidates(matches: &clap::ArgMatches, config: &Config) -> Result<usize> {
    match matches.value_of("candidates") {
        Some(n) => n
            .parse()
            .with_context(|| format!("invalid candidate count: {}", n)),
        None => Ok(config.candidates),
    }
}

/// Expand `~` and environment variables in a user supplied path
pub fn expand(path: &str) -> String {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let path = expand(path);
    let bytes = std::fs::read(&path).with_context(|| format!("unable to read {}", path))?;
    serde_json::from_slice(&bytes).with_context(|| format!("unable to parse {}", path))
}

pub fn write_file<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("unable to create {}", dir.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("unable to write {}", path.display()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| {
        format!(
            "unable to read {} - run `zkballot keygen` and `zkballot setup` first",
            path.display()
        )
    })
}

pub fn load_election_keypair(config: &Config) -> Result<KeyPair> {
    let encoded = read_file(&config.path(ELECTION_SECRET))?;
    let bytes = hex::decode(String::from_utf8_lossy(&encoded).trim())?;
    Ok(KeyPair::from_secret(scalar_from_bytes(&bytes)?))
}

pub fn load_election_public(config: &Config) -> Result<Point> {
    let bytes = read_file(&config.path(ELECTION_PUBLIC))?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn load_proving_key(config: &Config, name: &str) -> Result<CircuitProvingKey> {
    Ok(CircuitProvingKey::from_bytes(&read_file(&config.path(name))?)?)
}

pub fn load_verifying_key(config: &Config, name: &str) -> Result<CircuitVerifyingKey> {
    Ok(CircuitVerifyingKey::from_bytes(&read_file(&config.path(name))?)?)
}

/// Ballots from files holding either one ballot or a list of them
pub fn read_ballots(matches: &clap::ArgMatches) -> Result<Vec<Ballot>> {
    let mut ballots = Vec::new();
    for path in matches.values_of("BALLOTS").into_iter().flatten() {
        let value: serde_json::Value = read_json(path)?;
        if value.is_array() {
            ballots.extend(serde_json::from_value::<Vec<Ballot>>(value)?);
        } else {
            ballots.push(serde_json::from_value(value)?);
        }
    }
    Ok(ballots)
}
