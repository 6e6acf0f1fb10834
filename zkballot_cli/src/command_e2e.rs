use crate::*;
use anyhow::{bail, Result};
use rand::rngs::OsRng;
use rand::Rng;
use tracing::info;

/// Run a whole election against an in-memory ledger and check every artifact it produces
pub fn command_e2e<const N: usize>(matches: &clap::ArgMatches) -> Result<()> {
    let num_voters: usize = matches.value_of("voters").unwrap_or("5").parse()?;
    if num_voters == 0 {
        bail!("an election needs at least one voter");
    }
    let mut rng = OsRng;

    // Election authority and trusted setup
    let (authority_secret, authority_public) = generate_keypair();
    let encryption = KeyPair::generate(&mut rng);
    let vote_keys = setup_vote::<N, _>(&mut rng)?;
    let tally_keys = setup_tally::<N, _>(&mut rng)?;

    let voters: Vec<_> = (0..num_voters).map(|_| generate_keypair()).collect();
    let candidates: Vec<String> = (0..N).map(|i| format!("candidate-{}", i)).collect();

    let mut election = ElectionTransaction::new(
        authority_public,
        candidates.clone(),
        encryption.public,
        vote_keys.verifying.clone(),
        tally_keys.verifying.clone(),
    );
    election.voters = voters.iter().map(|(_, public)| *public).collect();
    election.max_votes = num_voters as u64;
    let election_id = election.id;

    let mut ledger = Ledger::new();
    ledger.apply(Signed::sign(&authority_secret, election)?.into())?;

    let start = VotingStartTransaction::new(election_id, authority_public);
    ledger.apply(Signed::sign(&authority_secret, start)?.into())?;
    println!("> Election {} open", election_id);

    // Voting
    let mut expected = vec![0u64; N];
    let mut ciphertexts = Vec::with_capacity(num_voters);
    for (voter_secret, voter_public) in &voters {
        let choice = rng.gen_range(0..N as u64);
        let (ballot, _) =
            cast_ballot::<N, _>(&vote_keys.proving, &encryption.public, choice, &mut rng)?;
        ciphertexts.push(ballot.ciphertexts.clone());
        expected[choice as usize] += 1;

        let vote = VoteTransaction::new(election_id, *voter_public, ballot);
        ledger.apply(Signed::sign(voter_secret, vote)?.into())?;
    }
    info!(ballots = num_voters, "all ballots accepted");

    let end = VotingEndTransaction::new(election_id, authority_public);
    ledger.apply(Signed::sign(&authority_secret, end)?.into())?;

    // Tally
    let solver = ledger.store().get_election(election_id)?.solver();
    let tally = tally_ballots::<N, _, _>(
        &tally_keys.proving,
        &encryption,
        &ciphertexts,
        &solver,
        &mut rng,
    )?;
    if tally.results != expected {
        bail!(
            "tally {:?} does not match the ballots cast {:?}",
            tally.results,
            expected
        );
    }
    let totals = tally.totals(&candidates);
    let winners = tally.winners(&candidates);

    let tally = TallyTransaction::new(election_id, authority_public, tally);
    ledger.apply(Signed::sign(&authority_secret, tally)?.into())?;

    // Audit
    let bundle = ledger.audit_bundle(election_id)?;
    if !bundle.verify_all() {
        bail!("audit bundle failed verification");
    }

    println!("> Election verified OK");
    println!("Tally:");
    for (candidate, num_votes) in totals.iter() {
        println!("  {} got {} votes", candidate, num_votes);
    }
    println!("Results:");
    println!("  The winner is {}", winners.join(", "));
    println!("Audit:");
    println!(
        "  {} ballots under root {}",
        bundle.total_leaves,
        hex::encode(bundle.root)
    );
    Ok(())
}
