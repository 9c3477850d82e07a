//! Conversions between ledger values and contract integers, and the
//! sending-precision truncation shared by both bridging directions.
//!
//! Every relayer must produce the same integers for the same inputs, so all
//! arithmetic here is exact: `BigRational` end to end, integer division
//! truncating toward zero, no floats anywhere. The contract stores amounts
//! as `uint128` and the home chain's integer type tops out at 256 bits;
//! both ceilings are enforced on the way in.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use thiserror::Error;

use xrpl_primitives::{Address, Amount, Currency, Value, XRP_ISSUER};

/// Fixed decimal count of XRPL-originated tokens on the home chain.
pub const XRPL_TOKEN_DECIMALS: u32 = 15;

/// Home-chain decimal count of the native asset (drops).
pub const XRP_DECIMALS: u32 = 6;

/// Scale of the ledger's transfer rate: 1_000_000_000 is the identity.
pub const TRANSFER_RATE_SCALE: u64 = 1_000_000_000;

/// Bit width of the home chain's big-integer type.
const SDK_INT_MAX_BITS: u64 = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountConversionError {
    #[error("amount does not fit the contract's uint128")]
    ContractUint128OutOfBounds,
    #[error("amount does not fit the home chain's 256-bit integer")]
    SdkMathIntOutOfBounds,
    #[error("amount is negative")]
    NegativeAmount,
    #[error("amount is zero after applying the sending precision")]
    AmountSentIsZeroAfterTruncation,
    #[error("amount cannot cover the bridging fee")]
    CannotCoverBridgingFees,
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

fn bounded_to_u128(n: &BigInt) -> Result<u128, AmountConversionError> {
    if n.is_negative() {
        return Err(AmountConversionError::NegativeAmount);
    }
    if n.bits() > SDK_INT_MAX_BITS {
        return Err(AmountConversionError::SdkMathIntOutOfBounds);
    }
    n.to_u128()
        .ok_or(AmountConversionError::ContractUint128OutOfBounds)
}

/// Ledger amount -> contract integer.
///
/// Native values are already integer-scaled (drops); issued values are
/// brought to the fixed 15-decimal home representation.
pub fn convert_xrpl_to_coreum(amount: Option<&Amount>) -> Result<u128, AmountConversionError> {
    let Some(amount) = amount else {
        return Ok(0);
    };
    if amount.is_native() {
        return bounded_to_u128(amount.value.numerator());
    }
    let rat = amount.value.rat();
    let scaled = rat.numer() * pow10(XRPL_TOKEN_DECIMALS) / rat.denom();
    bounded_to_u128(&scaled)
}

/// Contract integer -> ledger amount.
///
/// The sentinel `(issuer, currency)` pair denotes the native asset; its
/// integer is a drop count and converts verbatim. Everything else becomes a
/// 15-decimal token value rendered with the ledger's 16-significant-digit
/// mantissa.
pub fn convert_coreum_to_xrpl(
    amount: u128,
    issuer: &Address,
    currency: &Currency,
) -> Amount {
    if issuer.as_str() == XRP_ISSUER && currency.is_xrp() {
        return Amount::drops(BigInt::from(amount));
    }
    let value = Value::token(BigRational::new(
        BigInt::from(amount),
        pow10(XRPL_TOKEN_DECIMALS),
    ));
    Amount::issued(value, currency.clone(), issuer.clone())
}

/// Truncate `q` toward zero at decimal position `precision`.
///
/// `precision > 0` keeps that many fractional digits, `0` keeps whole units
/// (and maps exact ones to zero, matching the contract), negative values
/// coarsen to multiples of `10^-precision`. Idempotent, never rounds up, so
/// dust cannot be accumulated through repeated bridging.
pub fn truncate_by_sending_precision(q: &BigRational, precision: i32) -> BigRational {
    let n = q.numer();
    let d = q.denom();
    if precision > 0 {
        let k = pow10(precision as u32);
        let dk = d / &k;
        if dk.is_zero() {
            return q.clone();
        }
        let truncated = (n / &dk) * &dk;
        BigRational::new(truncated, d.clone())
    } else if precision == 0 {
        if n > d {
            BigRational::from_integer(n / d)
        } else {
            BigRational::zero()
        }
    } else {
        if n > d {
            let k = pow10(precision.unsigned_abs());
            BigRational::from_integer((n / d) / &k * &k)
        } else {
            BigRational::zero()
        }
    }
}

/// What arrives on the ledger for a home-chain send: apply the ledger's
/// transfer rate, deduct the bridging fee, truncate by the token's sending
/// precision.
///
/// `transfer_rate` is scaled by [`TRANSFER_RATE_SCALE`]; `None` means no
/// rate is set on the trust line.
pub fn compute_received_on_xrpl(
    amount: u128,
    token_decimals: u32,
    bridging_fee: u128,
    sending_precision: i32,
    transfer_rate: Option<u64>,
) -> Result<BigRational, AmountConversionError> {
    let scale = pow10(token_decimals);
    let value = BigRational::new(BigInt::from(amount), scale.clone());

    let after_rate = match transfer_rate {
        Some(rate) => {
            let rate = BigRational::new(BigInt::from(rate), BigInt::from(TRANSFER_RATE_SCALE));
            let fee_allocation = &value * &rate - &value;
            &value - &fee_allocation
        }
        None => value,
    };

    let after_fee = after_rate - BigRational::new(BigInt::from(bridging_fee), scale);
    if after_fee.is_negative() {
        return Err(AmountConversionError::CannotCoverBridgingFees);
    }

    let truncated = truncate_by_sending_precision(&after_fee, sending_precision);
    if truncated.is_zero() {
        return Err(AmountConversionError::AmountSentIsZeroAfterTruncation);
    }
    Ok(truncated)
}

/// What the home chain credits for a ledger deposit: truncate first, scale
/// to the token's decimals, then deduct the bridging fee.
pub fn compute_received_on_coreum(
    value: &Value,
    token_decimals: u32,
    bridging_fee: u128,
    sending_precision: i32,
) -> Result<u128, AmountConversionError> {
    let truncated = truncate_by_sending_precision(value.rat(), sending_precision);
    if truncated.is_zero() {
        return Err(AmountConversionError::AmountSentIsZeroAfterTruncation);
    }
    let scaled = truncated * BigRational::from_integer(pow10(token_decimals));
    let credited = scaled.to_integer() - BigInt::from(bridging_fee);
    if credited.is_negative() {
        return Err(AmountConversionError::CannotCoverBridgingFees);
    }
    bounded_to_u128(&credited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrpl_primitives::Value;

    fn issuer() -> Address {
        Address::from_account_id([4u8; 20])
    }

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn issued(value: &str) -> Amount {
        Amount::issued(Value::parse(value, false).unwrap(), usd(), issuer())
    }

    #[test]
    fn absent_amount_converts_to_zero() {
        assert_eq!(convert_xrpl_to_coreum(None).unwrap(), 0);
    }

    #[test]
    fn native_amount_converts_drop_for_drop() {
        let amount = Amount::drops(123_456_789);
        assert_eq!(convert_xrpl_to_coreum(Some(&amount)).unwrap(), 123_456_789);
    }

    #[test]
    fn issued_amount_scales_to_fifteen_decimals() {
        assert_eq!(
            convert_xrpl_to_coreum(Some(&issued("1.5"))).unwrap(),
            1_500_000_000_000_000
        );
        assert_eq!(
            convert_xrpl_to_coreum(Some(&issued("0.000000000000001"))).unwrap(),
            1
        );
    }

    #[test]
    fn oversized_values_fail_with_the_matching_bound() {
        // 34e23 * 10^15 exceeds uint128 but not 256 bits.
        assert_eq!(
            convert_xrpl_to_coreum(Some(&issued("34e23"))),
            Err(AmountConversionError::ContractUint128OutOfBounds)
        );
        // 1e80 * 10^15 exceeds even the 256-bit working width.
        assert_eq!(
            convert_xrpl_to_coreum(Some(&issued("1e80"))),
            Err(AmountConversionError::SdkMathIntOutOfBounds)
        );
    }

    #[test]
    fn round_trip_is_identity_for_all_uint128() {
        for amount in [
            1u128,
            999_999_999_999_999u128,
            1_000_000_000_000_000_000u128,
            u128::MAX,
            u128::MAX - 1,
            340_282_366_920_938_463_463_374_607u128,
        ] {
            let xrpl = convert_coreum_to_xrpl(amount, &issuer(), &usd());
            assert_eq!(convert_xrpl_to_coreum(Some(&xrpl)).unwrap(), amount);
        }
    }

    #[test]
    fn round_trip_survives_the_wire_for_representable_mantissas() {
        // Values whose mantissa fits sixteen digits survive rendering to
        // the canonical string and reparsing.
        for amount in [1u128, 25_000_000u128, 9_999_999_999_999_999u128, 5_000_000_000_000_000_000u128] {
            let xrpl = convert_coreum_to_xrpl(amount, &issuer(), &usd());
            let json = serde_json::to_string(&xrpl).unwrap();
            let back: Amount = serde_json::from_str(&json).unwrap();
            assert_eq!(convert_xrpl_to_coreum(Some(&back)).unwrap(), amount);
        }
    }

    #[test]
    fn native_sentinels_produce_drops() {
        let native = convert_coreum_to_xrpl(
            77,
            &Address::new(XRP_ISSUER).unwrap(),
            &Currency::xrp(),
        );
        assert!(native.is_native());
        assert_eq!(native.value.to_string(), "77");
    }

    fn rat(s: &str) -> BigRational {
        Value::parse(s, false).unwrap().rat().clone()
    }

    #[test]
    fn truncation_keeps_the_requested_fractional_digits() {
        assert_eq!(truncate_by_sending_precision(&rat("1111.001111"), 3), rat("1111.001"));
        assert_eq!(truncate_by_sending_precision(&rat("0.00099"), 3), rat("0"));
        // Already coarse enough: unchanged.
        assert_eq!(truncate_by_sending_precision(&rat("5.25"), 4), rat("5.25"));
    }

    #[test]
    fn zero_precision_keeps_whole_units_above_one() {
        assert_eq!(truncate_by_sending_precision(&rat("12.9"), 0), rat("12"));
        // Exactly one maps to zero; the contract rejects such sends.
        assert_eq!(truncate_by_sending_precision(&rat("1"), 0), rat("0"));
        assert_eq!(truncate_by_sending_precision(&rat("0.7"), 0), rat("0"));
    }

    #[test]
    fn negative_precision_coarsens_to_powers_of_ten() {
        assert_eq!(truncate_by_sending_precision(&rat("123456"), -3), rat("123000"));
        assert_eq!(truncate_by_sending_precision(&rat("999"), -3), rat("0"));
    }

    #[test]
    fn truncation_is_idempotent_and_never_grows() {
        for (value, precision) in [("1111.001111", 3), ("98765.4321", 0), ("123456789", -4)] {
            let q = rat(value);
            let once = truncate_by_sending_precision(&q, precision);
            assert!(once <= q);
            assert_eq!(truncate_by_sending_precision(&once, precision), once);
        }
    }

    #[test]
    fn deposit_with_positive_precision_and_fee() {
        // truncate(1111.001111, 3) = 1111.001; * 10^5 = 111_100_100; - 1000.
        let value = Value::parse("1111.001111", false).unwrap();
        assert_eq!(
            compute_received_on_coreum(&value, 5, 1_000, 3).unwrap(),
            111_099_100
        );
    }

    #[test]
    fn deposit_with_minimum_precision_high_value() {
        let value = Value::parse("1111111121321111.0", false).unwrap();
        assert_eq!(
            compute_received_on_coreum(&value, 5, 0, -15).unwrap(),
            100_000_000_000_000_000_000
        );
    }

    #[test]
    fn deposit_rejected_when_everything_truncates_away() {
        let value = Value::parse("0.0009", false).unwrap();
        assert_eq!(
            compute_received_on_coreum(&value, 6, 0, 3),
            Err(AmountConversionError::AmountSentIsZeroAfterTruncation)
        );
    }

    #[test]
    fn deposit_rejected_when_fee_exceeds_amount() {
        let value = Value::parse("2", false).unwrap();
        assert_eq!(
            compute_received_on_coreum(&value, 2, 1_000, 0),
            Err(AmountConversionError::CannotCoverBridgingFees)
        );
    }

    #[test]
    fn withdrawal_applies_rate_fee_and_precision() {
        // 1000.00 with identity rate, fee 10.00, precision 1.
        let received = compute_received_on_xrpl(100_000, 2, 1_000, 1, Some(1_000_000_000)).unwrap();
        assert_eq!(received, rat("990"));

        // 1% transfer rate: 1000 -> 990 after rate, 980 after fee.
        let received = compute_received_on_xrpl(100_000, 2, 1_000, 1, Some(1_010_000_000)).unwrap();
        assert_eq!(received, rat("980"));
    }

    #[test]
    fn withdrawal_rejects_zero_after_truncation() {
        assert_eq!(
            compute_received_on_xrpl(50, 2, 0, 0, None),
            Err(AmountConversionError::AmountSentIsZeroAfterTruncation)
        );
    }
}
