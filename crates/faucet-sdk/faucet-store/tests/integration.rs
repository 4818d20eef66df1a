use chrono::{NaiveDate, NaiveDateTime};
use faucet_sdk::{CompiledFaucet, FaucetParams, Network};

use faucet_store::{FaucetFilter, FaucetStore, NewClaim, StoreError, parse_timestamp};

// ==================== Test Helpers ====================

fn test_params() -> FaucetParams {
    FaucetParams {
        payout_sats: 1000,
        owner_pkh: [0xaa; 20],
        passcode: "swordfish".into(),
    }
}

fn test_params_2() -> FaucetParams {
    FaucetParams {
        payout_sats: 5000,
        owner_pkh: [0xbb; 20],
        passcode: "swordfish".into(),
    }
}

fn at(hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

fn claim(faucet_id: i32, ip: Option<&str>, created_at: NaiveDateTime) -> NewClaim {
    NewClaim {
        faucet_id,
        network: Network::Testnet,
        txid: "ab".repeat(32),
        recipient: "bchtest:qpm2qsznhks23z7629mms6s4cwef74vcwvhanqgjxu".into(),
        satoshis: 1000,
        ip: ip.map(str::to_string),
        created_at,
    }
}

// ==================== Basic Store Tests ====================

#[test]
fn test_open_in_memory() {
    let store = FaucetStore::open_in_memory();
    assert!(store.is_ok());
}

#[test]
fn test_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faucet.db");
    let store = FaucetStore::open(path.to_str().unwrap());
    assert!(store.is_ok());
}

#[test]
fn test_faucets_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("faucet.db").to_str().unwrap().to_string();

    let id = {
        let mut store = FaucetStore::open(&db_path).unwrap();
        store
            .insert_faucet(&test_params(), Network::Testnet, Some(3))
            .unwrap()
    };

    let mut store = FaucetStore::open(&db_path).unwrap();
    let info = store.get_faucet(id).unwrap().unwrap();
    assert_eq!(info.params, test_params());
    assert_eq!(info.max_claim_count, Some(3));
}

// ==================== Faucet Tests ====================

#[test]
fn test_insert_and_get_faucet() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();

    let info = store.get_faucet(id).unwrap().unwrap();
    let compiled = CompiledFaucet::new(test_params()).unwrap();
    assert_eq!(info.network, Network::Testnet);
    assert_eq!(info.address, compiled.address(Network::Testnet).to_string());
    assert_eq!(
        info.token_address,
        compiled.token_address(Network::Testnet).to_string()
    );
    assert_eq!(
        info.owner_address,
        test_params().owner_address(Network::Testnet).to_string()
    );
    assert_eq!(info.claim_count, 0);
    assert_eq!(info.balance_sats, 0);
    assert!(!info.is_exhausted());
    assert_eq!(info.remaining_claims(), None);
    parse_timestamp(&info.created_at).unwrap();
}

#[test]
fn test_insert_faucet_idempotent() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id1 = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();
    let id2 = store
        .insert_faucet(&test_params(), Network::Testnet, Some(10))
        .unwrap();
    assert_eq!(id1, id2);

    // The first registration wins.
    let info = store.get_faucet(id1).unwrap().unwrap();
    assert_eq!(info.max_claim_count, None);
}

#[test]
fn test_same_params_on_two_networks() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let test_id = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();
    let main_id = store
        .insert_faucet(&test_params(), Network::Mainnet, None)
        .unwrap();
    assert_ne!(test_id, main_id);
}

#[test]
fn test_insert_faucet_rejects_dust_payout() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let mut params = test_params();
    params.payout_sats = 100;
    let err = store
        .insert_faucet(&params, Network::Testnet, None)
        .unwrap_err();
    assert!(matches!(err, StoreError::Sdk(_)));
}

#[test]
fn test_get_nonexistent_faucet() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    assert!(store.get_faucet(42).unwrap().is_none());
}

#[test]
fn test_get_faucet_by_either_address() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();
    let info = store.get_faucet(id).unwrap().unwrap();

    let by_plain = store.get_faucet_by_address(&info.address).unwrap().unwrap();
    let by_token = store
        .get_faucet_by_address(&info.token_address)
        .unwrap()
        .unwrap();
    assert_eq!(by_plain.id, id);
    assert_eq!(by_token.id, id);
    assert!(store.get_faucet_by_address("bchtest:nothing").unwrap().is_none());
}

#[test]
fn test_list_faucets_with_filters() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let a = store
        .insert_faucet(&test_params(), Network::Testnet, Some(1))
        .unwrap();
    let b = store
        .insert_faucet(&test_params_2(), Network::Testnet, None)
        .unwrap();
    let c = store
        .insert_faucet(&test_params(), Network::Mainnet, None)
        .unwrap();

    let all = store.list_faucets(&FaucetFilter::default()).unwrap();
    let ids: Vec<i32> = all.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![a, b, c]);

    let testnet = store
        .list_faucets(&FaucetFilter {
            network: Some(Network::Testnet),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(testnet.len(), 2);

    let owned = store
        .list_faucets(&FaucetFilter {
            owner_address: Some(test_params_2().owner_address(Network::Testnet).to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, b);

    store
        .record_claim(&claim(a, None, at(10, 0)))
        .unwrap();
    let claimable = store
        .list_faucets(&FaucetFilter {
            claimable_only: true,
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<i32> = claimable.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![b, c]);

    let limited = store
        .list_faucets(&FaucetFilter {
            limit: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_find_claimable_skips_exhausted() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let first = store
        .insert_faucet(&test_params(), Network::Testnet, Some(1))
        .unwrap();
    let second = store
        .insert_faucet(&test_params_2(), Network::Testnet, None)
        .unwrap();

    let found = store
        .find_claimable(Network::Testnet, "swordfish")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first);

    store
        .record_claim(&claim(first, None, at(10, 0)))
        .unwrap();
    let exhausted = store.get_faucet(first).unwrap().unwrap();
    assert!(exhausted.is_exhausted());
    assert_eq!(exhausted.remaining_claims(), Some(0));

    let found = store
        .find_claimable(Network::Testnet, "swordfish")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, second);
}

#[test]
fn test_find_claimable_matches_network_and_passcode() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();

    assert!(
        store
            .find_claimable(Network::Mainnet, "swordfish")
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .find_claimable(Network::Testnet, "wrong")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_update_balance() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();

    store.update_balance(id, 123_456).unwrap();
    assert_eq!(store.get_faucet(id).unwrap().unwrap().balance_sats, 123_456);

    let err = store.update_balance(999, 1).unwrap_err();
    assert!(matches!(err, StoreError::FaucetNotFound(999)));
}

// ==================== Claim Tests ====================

#[test]
fn test_record_claim_increments_count() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, Some(5))
        .unwrap();

    let c1 = store.record_claim(&claim(id, Some("1.2.3.4"), at(9, 0))).unwrap();
    let c2 = store.record_claim(&claim(id, Some("5.6.7.8"), at(9, 30))).unwrap();
    assert_ne!(c1, c2);

    let info = store.get_faucet(id).unwrap().unwrap();
    assert_eq!(info.claim_count, 2);
    assert_eq!(info.remaining_claims(), Some(3));

    let claims = store.claims_for_faucet(id).unwrap();
    assert_eq!(claims.len(), 2);
    assert_eq!(claims[0].id, c2);
    assert_eq!(claims[0].created_at, at(9, 30));
    assert_eq!(claims[1].ip.as_deref(), Some("1.2.3.4"));
}

#[test]
fn test_record_claim_for_missing_faucet_rolls_back() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let err = store
        .record_claim(&claim(7, Some("1.2.3.4"), at(9, 0)))
        .unwrap_err();
    assert!(matches!(err, StoreError::FaucetNotFound(7)));
    assert!(store.recent_claims(10).unwrap().is_empty());
}

#[test]
fn test_record_claim_respects_claim_limit() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, Some(1))
        .unwrap();

    store.record_claim(&claim(id, Some("1.2.3.4"), at(9, 0))).unwrap();
    let err = store
        .record_claim(&claim(id, Some("5.6.7.8"), at(9, 0)))
        .unwrap_err();
    assert!(matches!(err, StoreError::ClaimLimitReached(i) if i == id));

    let info = store.get_faucet(id).unwrap().unwrap();
    assert_eq!(info.claim_count, 1);
    assert_eq!(store.claims_for_faucet(id).unwrap().len(), 1);
}

#[test]
fn test_claims_by_ip_since() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let id = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();

    store.record_claim(&claim(id, Some("1.2.3.4"), at(8, 0))).unwrap();
    store.record_claim(&claim(id, Some("1.2.3.4"), at(12, 0))).unwrap();
    store.record_claim(&claim(id, Some("9.9.9.9"), at(12, 0))).unwrap();
    store.record_claim(&claim(id, None, at(12, 0))).unwrap();

    let recent = store.claims_by_ip_since("1.2.3.4", at(10, 0)).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].created_at, at(12, 0));

    // The boundary is inclusive.
    let inclusive = store.claims_by_ip_since("1.2.3.4", at(8, 0)).unwrap();
    assert_eq!(inclusive.len(), 2);
    assert_eq!(inclusive[0].created_at, at(12, 0));

    assert!(store.claims_by_ip_since("0.0.0.0", at(0, 0)).unwrap().is_empty());
}

#[test]
fn test_recent_claims_across_faucets() {
    let mut store = FaucetStore::open_in_memory().unwrap();
    let a = store
        .insert_faucet(&test_params(), Network::Testnet, None)
        .unwrap();
    let b = store
        .insert_faucet(&test_params_2(), Network::Testnet, None)
        .unwrap();

    store.record_claim(&claim(a, None, at(9, 0))).unwrap();
    store.record_claim(&claim(b, None, at(9, 5))).unwrap();
    store.record_claim(&claim(a, None, at(9, 10))).unwrap();

    let recent = store.recent_claims(2).unwrap();
    let faucets: Vec<i32> = recent.iter().map(|c| c.faucet_id).collect();
    assert_eq!(faucets, vec![a, b]);
    assert_eq!(recent[0].satoshis, 1000);
    assert_eq!(recent[0].network, Network::Testnet);
}
