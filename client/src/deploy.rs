//! Deployment parameter builder.
//!
//! Turns user-entered backup data into the exact argument tuple and value of
//! `TezoroService.deployBackupContract`. Everything here is pure; submitting the
//! call is left to [`crate::transaction::TransactionManager`].

use crate::abi;
use crate::address::{non_zero, or_sentinel, parse_address};
use crate::error::{Result, TezoroError};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed-point unit of a beneficiary share: `percent * PIECE`.
pub const PIECE: u64 = 10_000;

/// Number of beneficiary slots in the contract ABI
pub const BENEFICIARY_SLOTS: usize = 4;

/// Beneficiary as entered by the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Beneficiary address
    pub address: Address,
    /// Share of the backed-up tokens, in percent
    pub percent: f64,
}

impl Beneficiary {
    /// Create a beneficiary from an address string
    pub fn parse(address: &str, percent: f64) -> Result<Self> {
        Ok(Self {
            address: parse_address(address)?,
            percent,
        })
    }
}

/// User-supplied data for a backup deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployData {
    /// Executor as entered; absent, malformed or zero means "no executor"
    pub executor: Option<String>,
    /// Beneficiaries in the order entered
    pub beneficiaries: Vec<Beneficiary>,
    /// Token to back up
    pub token_address: Address,
    /// Launch date (unix seconds)
    pub launch_date: u64,
    /// Discounts applied to the service fee, each a fraction
    pub discounts: Option<Vec<f64>>,
    /// Inactivity trigger, in months
    pub inactive_period: Option<u32>,
    /// Backend commitment of the owner's email
    pub email_hash: B256,
    /// Backend commitment of the backup metadata
    pub meta_id_encrypted: B256,
}

/// Beneficiary address with its encoded share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeneficiaryShare {
    /// Beneficiary address
    pub address: Address,
    /// `percent * PIECE`
    pub share: U256,
}

/// The four positional beneficiary slots of `deployBackupContract`.
///
/// Slots 1-3 carry an address and a share; slot 4 carries only an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedBeneficiarySlots {
    shared: [Option<BeneficiaryShare>; 3],
    fourth: Option<Address>,
}

impl FixedBeneficiarySlots {
    /// Fill the slots from the first four beneficiaries, in input order
    pub fn from_beneficiaries(beneficiaries: &[Beneficiary]) -> Result<Self> {
        if beneficiaries.len() > BENEFICIARY_SLOTS {
            warn!(
                "{} beneficiaries supplied, only the first {} are deployed",
                beneficiaries.len(),
                BENEFICIARY_SLOTS
            );
        }

        let mut slots = Self::default();
        for (index, beneficiary) in beneficiaries.iter().take(BENEFICIARY_SLOTS).enumerate() {
            if index < 3 {
                slots.shared[index] = Some(BeneficiaryShare {
                    address: beneficiary.address,
                    share: encode_share(beneficiary.percent)?,
                });
            } else {
                slots.fourth = Some(beneficiary.address);
            }
        }

        Ok(slots)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.shared.iter().filter(|slot| slot.is_some()).count() + usize::from(self.fourth.is_some())
    }

    /// True when no beneficiary was supplied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses of all four slots, sentinel-padded
    pub fn addresses(&self) -> [Address; BENEFICIARY_SLOTS] {
        [
            or_sentinel(self.shared[0].map(|slot| slot.address)),
            or_sentinel(self.shared[1].map(|slot| slot.address)),
            or_sentinel(self.shared[2].map(|slot| slot.address)),
            or_sentinel(self.fourth),
        ]
    }

    /// Shares of slots 1-3, zero-padded
    pub fn shares(&self) -> [U256; 3] {
        self.shared
            .map(|slot| slot.map(|slot| slot.share).unwrap_or(U256::ZERO))
    }
}

/// Ordered argument tuple of `deployBackupContract`:
/// `(addr1, share1, addr2, share2, addr3, share3, addr4, token, executor,
/// email_hash, meta_id_encrypted)`
pub type DeployBackupCallArgs = (
    Address,
    U256,
    Address,
    U256,
    Address,
    U256,
    Address,
    Address,
    Address,
    B256,
    B256,
);

/// Everything needed to submit a backup deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParams {
    /// Beneficiary slots
    pub slots: FixedBeneficiarySlots,
    /// Token to back up
    pub token_address: Address,
    /// Executor, `None` when there is none
    pub executor: Option<Address>,
    /// Backend commitment of the owner's email
    pub email_hash: B256,
    /// Backend commitment of the backup metadata
    pub meta_id_encrypted: B256,
    /// Service fee to attach to the transaction (wei)
    pub value: U256,
}

impl DeploymentParams {
    /// The call tuple, with sentinels substituted
    pub fn call_args(&self) -> DeployBackupCallArgs {
        let [addr1, addr2, addr3, addr4] = self.slots.addresses();
        let [share1, share2, share3] = self.slots.shares();
        (
            addr1,
            share1,
            addr2,
            share2,
            addr3,
            share3,
            addr4,
            self.token_address,
            or_sentinel(self.executor),
            self.email_hash,
            self.meta_id_encrypted,
        )
    }

    /// ABI-encoded `deployBackupContract` call
    pub fn calldata(&self) -> Result<Bytes> {
        let (a1, s1, a2, s2, a3, s3, a4, token, executor, email_hash, meta_id) = self.call_args();
        abi::encode_call(
            abi::service_function(abi::DEPLOY_BACKUP_CONTRACT)?,
            &[
                abi::address_token(a1),
                abi::uint_token(s1),
                abi::address_token(a2),
                abi::uint_token(s2),
                abi::address_token(a3),
                abi::uint_token(s3),
                abi::address_token(a4),
                abi::address_token(token),
                abi::address_token(executor),
                abi::bytes32_token(email_hash),
                abi::bytes32_token(meta_id),
            ],
        )
    }
}

/// Apply discounts one after another: `fee -= fee * discount`, then round
/// half away from zero.
///
/// Each discount must be a fraction in `[0, 1]`.
pub fn apply_discounts(service_fee_base_wei: u128, discounts: &[f64]) -> Result<U256> {
    if let Some(discount) = discounts
        .iter()
        .find(|discount| !(0.0..=1.0).contains(*discount))
    {
        return Err(TezoroError::InvalidFeeComputation(format!(
            "discount {} is not a fraction in [0, 1]",
            discount
        )));
    }

    let mut fee = service_fee_base_wei as f64;
    for discount in discounts {
        fee -= fee * discount;
    }

    let rounded = fee.round();
    if !rounded.is_finite() || rounded < 0.0 || rounded >= u128::MAX as f64 {
        return Err(TezoroError::InvalidFeeComputation(format!(
            "service fee is {} (base {} wei, discounts {:?})",
            fee, service_fee_base_wei, discounts
        )));
    }

    Ok(U256::from(rounded as u128))
}

/// Encode a percentage as the contract's integer share
pub fn encode_share(percent: f64) -> Result<U256> {
    let scaled = (percent * PIECE as f64).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u128::MAX as f64 {
        return Err(TezoroError::InvalidFeeComputation(format!(
            "beneficiary share {}% cannot be encoded",
            percent
        )));
    }
    Ok(U256::from(scaled as u128))
}

/// Executor as entered, `None` unless it is a valid non-zero address
pub fn normalize_executor(executor: Option<&str>) -> Option<Address> {
    executor
        .and_then(|value| parse_address(value).ok())
        .and_then(non_zero)
}

/// Build the `deployBackupContract` parameters and fee for `deploy_data`
pub fn build_deployment_params(
    deploy_data: &DeployData,
    service_fee_base_wei: u128,
) -> Result<DeploymentParams> {
    let discounts = deploy_data.discounts.as_deref().unwrap_or_default();
    let value = apply_discounts(service_fee_base_wei, discounts)?;
    let slots = FixedBeneficiarySlots::from_beneficiaries(&deploy_data.beneficiaries)?;
    let executor = normalize_executor(deploy_data.executor.as_deref());

    let summary: Vec<String> = deploy_data
        .beneficiaries
        .iter()
        .map(|b| format!("{} ({}%)", b.address, b.percent))
        .collect();
    debug!(
        beneficiaries = ?summary,
        token = %deploy_data.token_address,
        email_hash = %deploy_data.email_hash,
        launch_date = deploy_data.launch_date,
        discounts = ?discounts,
        service_fee = %value,
        executor = ?executor,
        "Prepared backup deployment"
    );

    Ok(DeploymentParams {
        slots,
        token_address: deploy_data.token_address,
        executor,
        email_hash: deploy_data.email_hash,
        meta_id_encrypted: deploy_data.meta_id_encrypted,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{decode_call, selector, service_function, token_to_address, token_to_bytes32};
    use assert_matches::assert_matches;
    use test_case::test_case;

    fn beneficiary(byte: u8, percent: f64) -> Beneficiary {
        Beneficiary {
            address: Address::repeat_byte(byte),
            percent,
        }
    }

    fn deploy_data(beneficiaries: Vec<Beneficiary>) -> DeployData {
        DeployData {
            executor: None,
            beneficiaries,
            token_address: Address::repeat_byte(0xee),
            launch_date: 1_700_000_000,
            discounts: None,
            inactive_period: Some(6),
            email_hash: B256::repeat_byte(0x01),
            meta_id_encrypted: B256::repeat_byte(0x02),
        }
    }

    #[test]
    fn test_discounts_compound_in_order() {
        let fee = apply_discounts(1_000_000, &[0.1, 0.2]).unwrap();
        assert_eq!(fee, U256::from(720_000u64));

        // summing the discounts would give 700_000
        let summed = apply_discounts(1_000_000, &[0.3]).unwrap();
        assert_eq!(summed, U256::from(700_000u64));
        assert_ne!(fee, summed);
    }

    #[test]
    fn test_fee_without_discounts_is_base() {
        assert_eq!(
            apply_discounts(3_000_000_000_000_000, &[]).unwrap(),
            U256::from(3_000_000_000_000_000u64)
        );
    }

    #[test]
    fn test_fee_is_rounded() {
        // 1001 * 0.5 = 500.5 -> 501
        assert_eq!(apply_discounts(1001, &[0.5]).unwrap(), U256::from(501u64));
    }

    #[test_case(1_000_000, &[], 1_000_000 ; "no discounts")]
    #[test_case(1_000_000, &[0.1], 900_000 ; "single discount")]
    #[test_case(1_000_000, &[0.1, 0.2, 0.25], 540_000 ; "three discounts")]
    #[test_case(999, &[0.1, 0.1], 809 ; "fractional intermediate")]
    #[test_case(3, &[0.5], 2 ; "tie rounds up")]
    #[test_case(5, &[0.5], 3 ; "tie rounds away from zero")]
    #[test_case(1_000_000, &[0.0, 1.0], 0 ; "full discount")]
    #[test_case(0, &[0.3], 0 ; "zero base")]
    #[test_case(3_000_000_000_000_000, &[0.1], 2_700_000_000_000_000 ; "large base")]
    #[test_case(3_000_000_000_000_000, &[0.1, 0.2, 0.05], 2_052_000_000_000_000 ; "large base three discounts")]
    fn test_discount_table(base: u128, discounts: &[f64], expected: u128) {
        assert_eq!(apply_discounts(base, discounts).unwrap(), U256::from(expected));
    }

    #[test_case(&[f64::NAN] ; "nan discount")]
    #[test_case(&[f64::INFINITY] ; "infinite discount")]
    #[test_case(&[1.5] ; "discount above one")]
    #[test_case(&[-0.1] ; "negative discount")]
    #[test_case(&[0.1, -0.5] ; "negative discount after valid one")]
    fn test_malformed_discount_fails(discounts: &[f64]) {
        assert_matches!(
            apply_discounts(1_000_000, discounts),
            Err(TezoroError::InvalidFeeComputation(_))
        );
    }

    #[test_case(0 ; "no beneficiaries")]
    #[test_case(1 ; "one beneficiary")]
    #[test_case(2 ; "two beneficiaries")]
    #[test_case(3 ; "three beneficiaries")]
    #[test_case(4 ; "four beneficiaries")]
    fn test_slots_are_always_four(count: u8) {
        let beneficiaries: Vec<_> = (1..=count).map(|i| beneficiary(i, 10.0)).collect();
        let slots = FixedBeneficiarySlots::from_beneficiaries(&beneficiaries).unwrap();

        let addresses = slots.addresses();
        let shares = slots.shares();
        assert_eq!(addresses.len(), 4);
        assert_eq!(slots.len(), count as usize);

        for (index, address) in addresses.iter().enumerate() {
            if index < count as usize {
                assert_eq!(*address, Address::repeat_byte(index as u8 + 1));
            } else {
                assert_eq!(*address, Address::ZERO);
            }
        }
        for (index, share) in shares.iter().enumerate() {
            if index < count as usize {
                assert_eq!(*share, U256::from(10 * PIECE));
            } else {
                assert_eq!(*share, U256::ZERO);
            }
        }
    }

    #[test]
    fn test_fifth_beneficiary_is_dropped_and_fourth_has_no_share() {
        let beneficiaries: Vec<_> = (1..=5).map(|i| beneficiary(i, 20.0)).collect();
        let slots = FixedBeneficiarySlots::from_beneficiaries(&beneficiaries).unwrap();

        assert_eq!(slots.len(), 4);
        assert_eq!(slots.addresses()[3], Address::repeat_byte(4));
        assert!(!slots.addresses().contains(&Address::repeat_byte(5)));
        assert_eq!(slots.shares().len(), 3);
    }

    #[test]
    fn test_input_order_is_preserved() {
        let beneficiaries = vec![beneficiary(9, 70.0), beneficiary(3, 25.5), beneficiary(7, 4.5)];
        let slots = FixedBeneficiarySlots::from_beneficiaries(&beneficiaries).unwrap();

        assert_eq!(
            slots.addresses(),
            [
                Address::repeat_byte(9),
                Address::repeat_byte(3),
                Address::repeat_byte(7),
                Address::ZERO
            ]
        );
        assert_eq!(
            slots.shares(),
            [
                U256::from(700_000u64),
                U256::from(255_000u64),
                U256::from(45_000u64)
            ]
        );
    }

    #[test_case(None ; "absent")]
    #[test_case(Some("0x0000000000000000000000000000000000000000") ; "zero address")]
    #[test_case(Some("not-an-address") ; "malformed")]
    #[test_case(Some("0x1234") ; "too short")]
    fn test_executor_normalizes_to_sentinel(executor: Option<&str>) {
        let mut data = deploy_data(vec![beneficiary(1, 100.0)]);
        data.executor = executor.map(str::to_string);

        let params = build_deployment_params(&data, 1_000).unwrap();
        assert_eq!(params.executor, None);
        assert_eq!(params.call_args().8, Address::ZERO);
    }

    #[test]
    fn test_valid_executor_is_kept() {
        let mut data = deploy_data(vec![beneficiary(1, 100.0)]);
        data.executor = Some("0xd9be6af8cc9553ffa6402939befaa63108366a06".to_string());

        let params = build_deployment_params(&data, 1_000).unwrap();
        assert_eq!(
            params.executor,
            Some(parse_address("0xd9be6af8cc9553ffa6402939befaa63108366a06").unwrap())
        );
    }

    #[test]
    fn test_call_args_order() {
        let mut data = deploy_data(vec![beneficiary(1, 50.0), beneficiary(2, 50.0)]);
        data.discounts = Some(vec![0.5]);

        let params = build_deployment_params(&data, 2_000).unwrap();
        let args = params.call_args();

        assert_eq!(params.value, U256::from(1_000u64));
        assert_eq!(args.0, Address::repeat_byte(1));
        assert_eq!(args.1, U256::from(50 * PIECE));
        assert_eq!(args.2, Address::repeat_byte(2));
        assert_eq!(args.3, U256::from(50 * PIECE));
        assert_eq!(args.4, Address::ZERO);
        assert_eq!(args.5, U256::ZERO);
        assert_eq!(args.6, Address::ZERO);
        assert_eq!(args.7, Address::repeat_byte(0xee));
        assert_eq!(args.8, Address::ZERO);
        assert_eq!(args.9, B256::repeat_byte(0x01));
        assert_eq!(args.10, B256::repeat_byte(0x02));
    }

    #[test]
    fn test_calldata_encodes_eleven_words() {
        let params = build_deployment_params(&deploy_data(vec![beneficiary(1, 100.0)]), 0).unwrap();
        let data = params.calldata().unwrap();
        let function = service_function(abi::DEPLOY_BACKUP_CONTRACT).unwrap();

        assert_eq!(data.len(), 4 + 11 * 32);
        assert_eq!(&data[..4], selector(function).as_slice());
        let args = decode_call(function, &data).unwrap();
        assert_eq!(args.len(), 11);
        assert_eq!(token_to_address(&args[0]).unwrap(), Address::repeat_byte(1));
        assert_eq!(token_to_address(&args[7]).unwrap(), Address::repeat_byte(0xee));
        assert_eq!(token_to_bytes32(&args[10]).unwrap(), B256::repeat_byte(0x02));
    }

    #[test]
    fn test_invalid_share_fails() {
        let data = deploy_data(vec![beneficiary(1, f64::NAN)]);
        assert_matches!(
            build_deployment_params(&data, 1_000),
            Err(TezoroError::InvalidFeeComputation(_))
        );
    }

    #[test]
    fn test_beneficiary_parse_rejects_bad_address() {
        assert_matches!(
            Beneficiary::parse("0xnope", 10.0),
            Err(TezoroError::InvalidAddress(_))
        );
        assert!(Beneficiary::parse("0xd9be6af8cc9553ffa6402939befaa63108366a06", 10.0).is_ok());
    }
}
