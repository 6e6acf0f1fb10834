use crate::read_json;
use anyhow::{anyhow, bail, Result};
use zkballot::*;

pub fn command_audit(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("build", Some(matches)) => command_audit_build(matches),
        ("verify", Some(matches)) => command_audit_verify(matches),
        _ => Ok(()),
    }
}

fn command_audit_build(matches: &clap::ArgMatches) -> Result<()> {
    let events: Vec<VoteEvent> = read_json(matches.value_of("EVENTS").unwrap_or_default())?;
    let bundle = AuditBundle::build(&events)?;
    println!("{}", bundle.to_json()?);
    Ok(())
}

fn command_audit_verify(matches: &clap::ArgMatches) -> Result<()> {
    let bundle: AuditBundle = read_json(matches.value_of("BUNDLE").unwrap_or_default())?;

    if !bundle.verify_all() {
        bail!("audit bundle failed verification");
    }
    println!(
        "> Audit bundle verified OK ({} ballots, root {})",
        bundle.total_leaves,
        hex::encode(bundle.root)
    );

    if let Some(commitment) = matches.value_of("commitment") {
        let commitment = fq_from_hex(commitment)?;
        let entry = bundle
            .find_by_commitment(&commitment)
            .ok_or_else(|| anyhow!("commitment not found in audit bundle"))?;
        if !bundle.verify_entry(entry.index) {
            bail!("inclusion proof for entry {} is invalid", entry.index);
        }
        println!(
            "> Ballot included at index {} (block {}, log {})",
            entry.index, entry.block_number, entry.log_index
        );
    }
    Ok(())
}
