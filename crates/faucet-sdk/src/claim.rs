use crate::contract::CompiledFaucet;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::plan::{Destination, Output, TransactionPlan, lenient_locktime};
use crate::token::PLAIN_DUST;
use crate::utxo::Utxo;

/// Fixed fee of a claim transaction.
pub const CLAIM_TX_FEE: u64 = 300;

/// Parameters for a single claim against one contract UTXO.
#[derive(Debug, Clone)]
pub struct ClaimParams {
    pub utxo: Utxo,
    pub recipient: Destination,
    pub passcode: String,
    /// Applied only when it fits `0..=u32::MAX`.
    pub locktime: Option<i64>,
}

/// Build the claim plan: output 0 pays the payout to the claimant, output 1 (when
/// the remainder is spendable) returns the rest to the contract.
pub fn build_claim(
    contract: &CompiledFaucet,
    network: Network,
    params: &ClaimParams,
) -> Result<TransactionPlan> {
    let payout = contract.params().payout_sats;
    let utxo = &params.utxo;

    let remainder = i128::from(utxo.value) - i128::from(CLAIM_TX_FEE) - i128::from(payout);
    if remainder < 0 {
        return Err(Error::InsufficientFunds {
            shortfall: remainder.unsigned_abs() as u64,
        });
    }
    let remainder = remainder as u64;

    // A token can't be dropped into the fee; its change must clear the token floor.
    let floor = utxo.payload.dust_floor();
    if utxo.has_token() && remainder < floor {
        return Err(Error::InsufficientFunds {
            shortfall: floor - remainder,
        });
    }

    let call = contract.claim_call(&params.passcode)?;
    let mut plan = TransactionPlan::new(call, contract.redeem_script().to_vec())
        .with_input(utxo.clone())
        .with_output(Output::new(params.recipient.clone(), payout))
        .with_hardcoded_fee(CLAIM_TX_FEE);

    if remainder >= PLAIN_DUST {
        let change_address = if utxo.has_token() {
            contract.token_address(network)
        } else {
            contract.address(network)
        };
        plan = plan.with_output(
            Output::new(change_address, remainder).with_payload(utxo.payload.clone()),
        );
    } else {
        log::debug!("claim remainder of {remainder} sats is below dust, adding it to the fee");
    }

    if let Some(locktime) = lenient_locktime(params.locktime) {
        plan = plan.with_locktime(locktime);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FaucetParams;
    use crate::token::{Category, Payload};
    use crate::utxo::{Outpoint, Txid};

    fn contract() -> CompiledFaucet {
        CompiledFaucet::new(FaucetParams {
            payout_sats: 1000,
            owner_pkh: [0x33; 20],
            passcode: "open sesame".into(),
        })
        .unwrap()
    }

    fn params(value: u64) -> ClaimParams {
        ClaimParams {
            utxo: Utxo::new(
                Outpoint {
                    txid: Txid([9; 32]),
                    vout: 1,
                },
                value,
            ),
            recipient: Destination::Script(vec![0x76, 0xa9]),
            passcode: "open sesame".into(),
            locktime: None,
        }
    }

    #[test]
    fn change_returns_to_contract() {
        let faucet = contract();
        let plan = build_claim(&faucet, Network::Testnet, &params(10_000)).unwrap();
        assert_eq!(plan.outputs().len(), 2);
        assert_eq!(plan.outputs()[0].value, 1000);
        assert_eq!(plan.outputs()[1].value, 8700);
        assert_eq!(plan.outputs()[1].locking_script(), faucet.locking_script());
        assert_eq!(plan.output_total(), 10_000 - CLAIM_TX_FEE);
        assert_eq!(plan.fee(), CLAIM_TX_FEE);
    }

    #[test]
    fn short_utxo_is_rejected() {
        let err = build_claim(&contract(), Network::Testnet, &params(1200)).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { shortfall: 100 }));
    }

    #[test]
    fn dust_remainder_goes_to_fee() {
        let plan = build_claim(&contract(), Network::Testnet, &params(1400)).unwrap();
        assert_eq!(plan.outputs().len(), 1);
        assert_eq!(plan.fee(), 400);

        // Exactly at the floor keeps the change.
        let plan = build_claim(&contract(), Network::Testnet, &params(1846)).unwrap();
        assert_eq!(plan.outputs()[1].value, 546);
    }

    #[test]
    fn token_change_keeps_payload() {
        let payload = Payload::Fungible {
            category: Category([4; 32]),
            amount: 50,
        };
        let mut p = params(3000);
        p.utxo = p.utxo.with_payload(payload.clone());
        let plan = build_claim(&contract(), Network::Testnet, &p).unwrap();
        assert_eq!(plan.outputs()[1].payload, payload);
        assert_eq!(plan.outputs()[1].value, 1700);
        assert!(plan.outputs()[0].payload == Payload::Plain);

        // Below the token floor the token would be burned.
        let mut p = params(2000);
        p.utxo = p.utxo.with_payload(payload);
        let err = build_claim(&contract(), Network::Testnet, &p).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { shortfall: 300 }));
    }

    #[test]
    fn locktime_is_lenient() {
        let mut p = params(10_000);
        p.locktime = Some(850_000);
        let plan = build_claim(&contract(), Network::Testnet, &p).unwrap();
        assert_eq!(plan.locktime(), Some(850_000));

        p.locktime = Some(-1);
        let plan = build_claim(&contract(), Network::Testnet, &p).unwrap();
        assert_eq!(plan.locktime(), None);
    }

    #[test]
    fn deterministic() {
        let faucet = contract();
        let a = build_claim(&faucet, Network::Testnet, &params(5000)).unwrap();
        let b = build_claim(&faucet, Network::Testnet, &params(5000)).unwrap();
        assert_eq!(a, b);
    }
}
