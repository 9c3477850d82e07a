//! Ledger amounts.
//!
//! The ledger represents the native asset as an integer number of drops and
//! every issued token as a decimal mantissa of at most sixteen significant
//! digits with a signed exponent. [`Value`] keeps both shapes as an exact
//! `BigRational` so that independent relayers doing the same conversion
//! always agree bit for bit; nothing in this module touches floating point.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::{Address, AddressError};

/// Currency code of the native asset.
pub const XRP_CURRENCY: &str = "XRP";

/// Issuer sentinel the bridge contract registers for the native asset. Not
/// a spendable account; its checksum is deliberately invalid.
pub const XRP_ISSUER: &str = "rrrrrrrrrrrrrrrrrrrrrho";

/// Mantissa precision of issued token values.
pub const VALUE_SIGNIFICANT_DIGITS: usize = 16;

/// Largest exponent magnitude accepted when parsing a value.
const MAX_PARSE_EXPONENT: i64 = 1_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("empty value")]
    Empty,
    #[error("value contains a non-digit character")]
    BadDigit,
    #[error("value exponent is malformed or out of range")]
    BadExponent,
    #[error("native value must be a whole number of drops")]
    FractionalDrops,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Issuer(#[from] AddressError),
    #[error("invalid currency code: {0:?}")]
    Currency(String),
}

/// A currency code: `XRP`, a three-character ASCII code, or the forty-hex
/// form used for non-standard codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self, AmountError> {
        let code = code.into();
        let valid = match code.len() {
            3 => code.chars().all(|c| c.is_ascii_graphic()),
            40 => code.chars().all(|c| c.is_ascii_hexdigit()),
            _ => false,
        };
        if !valid {
            return Err(AmountError::Currency(code));
        }
        Ok(Self(code))
    }

    pub fn xrp() -> Self {
        Self(XRP_CURRENCY.to_owned())
    }

    pub fn is_xrp(&self) -> bool {
        self.0 == XRP_CURRENCY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = AmountError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// An exact ledger value.
///
/// Native values hold the drop count as an integer rational; issued values
/// hold the token amount itself. Display renders the canonical string the
/// whole federation must agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    rat: BigRational,
    native: bool,
}

impl Value {
    /// A native value from a whole number of drops.
    pub fn drops(drops: impl Into<BigInt>) -> Self {
        Self {
            rat: BigRational::from_integer(drops.into()),
            native: true,
        }
    }

    /// An issued-token value from an exact rational.
    pub fn token(rat: BigRational) -> Self {
        Self { rat, native: false }
    }

    /// Parse a decimal string, optionally in exponential notation
    /// (`"1111.001111"`, `"34e23"`). Native values must be whole drops.
    pub fn parse(s: &str, native: bool) -> Result<Self, ValueError> {
        let rat = parse_rational(s)?;
        if native && !rat.is_integer() {
            return Err(ValueError::FractionalDrops);
        }
        Ok(Self { rat, native })
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn is_zero(&self) -> bool {
        self.rat.is_zero()
    }

    pub fn rat(&self) -> &BigRational {
        &self.rat
    }

    /// Numerator of the reduced rational. For native values this is the
    /// drop count itself.
    pub fn numerator(&self) -> &BigInt {
        self.rat.numer()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.native {
            // Constructed from whole drops; truncation is a no-op.
            f.write_str(&self.rat.to_integer().to_string())
        } else {
            f.write_str(&format_token(&self.rat))
        }
    }
}

/// A `(value, currency, issuer)` amount triple. The native asset carries
/// the [`XRP_CURRENCY`] / [`XRP_ISSUER`] sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AmountWire", into = "AmountWire")]
pub struct Amount {
    pub value: Value,
    pub currency: Currency,
    pub issuer: Address,
}

impl Amount {
    pub fn issued(value: Value, currency: Currency, issuer: Address) -> Self {
        Self {
            value,
            currency,
            issuer,
        }
    }

    /// A native amount from a whole number of drops.
    pub fn drops(drops: impl Into<BigInt>) -> Self {
        Self {
            value: Value::drops(drops),
            currency: Currency::xrp(),
            // Sentinel shape-validates even though its checksum does not.
            issuer: Address::new(XRP_ISSUER).expect("sentinel issuer is well formed"),
        }
    }

    pub fn is_native(&self) -> bool {
        self.currency.is_xrp()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.value, self.currency, self.issuer)
    }
}

#[derive(Serialize, Deserialize)]
struct AmountWire {
    value: String,
    currency: String,
    issuer: String,
}

impl TryFrom<AmountWire> for Amount {
    type Error = AmountError;

    fn try_from(wire: AmountWire) -> Result<Self, Self::Error> {
        let currency = Currency::new(wire.currency)?;
        let value = Value::parse(&wire.value, currency.is_xrp())?;
        let issuer = Address::new(wire.issuer)?;
        Ok(Self {
            value,
            currency,
            issuer,
        })
    }
}

impl From<Amount> for AmountWire {
    fn from(amount: Amount) -> Self {
        Self {
            value: amount.value.to_string(),
            currency: amount.currency.into(),
            issuer: amount.issuer.into(),
        }
    }
}

fn parse_rational(s: &str) -> Result<BigRational, ValueError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValueError::Empty);
    }
    let (s, negative) = match s.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (s.strip_prefix('+').unwrap_or(s), false),
    };

    let (base, exp) = match s.split_once(['e', 'E']) {
        Some((base, exp)) => {
            let exp: i64 = exp.parse().map_err(|_| ValueError::BadExponent)?;
            (base, exp)
        }
        None => (s, 0),
    };
    if exp.abs() > MAX_PARSE_EXPONENT {
        return Err(ValueError::BadExponent);
    }

    let (int_part, frac_part) = match base.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (base, ""),
    };
    let digits: String = [int_part, frac_part].concat();
    if digits.is_empty() || digits.bytes().any(|b| !b.is_ascii_digit()) {
        return Err(ValueError::BadDigit);
    }

    let mantissa: BigInt = digits.parse().map_err(|_| ValueError::BadDigit)?;
    let mantissa = if negative { -mantissa } else { mantissa };
    let exponent = exp - frac_part.len() as i64;

    let rat = if exponent >= 0 {
        BigRational::from_integer(mantissa * pow10(exponent as u32))
    } else {
        BigRational::new(mantissa, pow10(-exponent as u32))
    };
    Ok(rat)
}

pub(crate) fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

/// Canonical rendering of an issued value: at most sixteen significant
/// digits, truncated toward zero, plain decimal when short enough and
/// `<mantissa>e<exponent>` otherwise.
fn format_token(rat: &BigRational) -> String {
    if rat.is_zero() {
        return "0".to_owned();
    }
    let negative = rat.is_negative();
    let n = rat.numer().magnitude().clone();
    let d = rat.denom().magnitude().clone();

    // Locate e with 10^e <= |value| < 10^(e+1).
    let mut e = decimal_digits(&n) as i64 - decimal_digits(&d) as i64;
    if !at_least_pow10(&n, &d, e) {
        e -= 1;
    }

    // Mantissa truncated toward zero, exactly sixteen digits.
    let shift = (VALUE_SIGNIFICANT_DIGITS as i64 - 1) - e;
    let mantissa: BigUint = if shift >= 0 {
        n * pow10_u(shift as u32) / d
    } else {
        n / (d * pow10_u(-shift as u32))
    };

    let mut mantissa = mantissa;
    let mut exp = e - (VALUE_SIGNIFICANT_DIGITS as i64 - 1);
    let ten = BigUint::from(10u32);
    while !mantissa.is_zero() && (&mantissa % &ten).is_zero() {
        mantissa /= &ten;
        exp += 1;
    }

    render_decimal(&mantissa.to_string(), exp, negative)
}

fn render_decimal(digits: &str, exp: i64, negative: bool) -> String {
    let len = digits.len() as i64;
    let body = if exp >= 0 {
        if exp + len <= 20 {
            let mut s = digits.to_owned();
            s.extend(std::iter::repeat('0').take(exp as usize));
            s
        } else {
            format!("{digits}e{exp}")
        }
    } else if -exp < len {
        let point = (len + exp) as usize;
        format!("{}.{}", &digits[..point], &digits[point..])
    } else if -exp - len <= 5 {
        let leading = (-exp - len) as usize;
        format!("0.{}{}", "0".repeat(leading), digits)
    } else {
        format!("{digits}e{exp}")
    };
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

fn pow10_u(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

fn decimal_digits(n: &BigUint) -> usize {
    if n.is_zero() {
        1
    } else {
        n.to_string().len()
    }
}

/// Whether `n/d >= 10^e`.
fn at_least_pow10(n: &BigUint, d: &BigUint, e: i64) -> bool {
    if e >= 0 {
        *n >= d * pow10_u(e as u32)
    } else {
        n * pow10_u(-e as u32) >= *d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> Value {
        Value::parse(s, false).unwrap()
    }

    #[test]
    fn parses_plain_and_exponential_forms() {
        assert_eq!(token("1111.001111").rat(), &BigRational::new(1_111_001_111.into(), 1_000_000.into()));
        assert_eq!(token("34e23").rat(), &BigRational::from_integer(BigInt::from(34) * pow10(23)));
        assert_eq!(token("-0.5").rat(), &BigRational::new((-1).into(), 2.into()));
        assert_eq!(token("1e80").rat(), &BigRational::from_integer(pow10(80)));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(Value::parse("", false), Err(ValueError::Empty));
        assert_eq!(Value::parse("12a4", false), Err(ValueError::BadDigit));
        assert_eq!(Value::parse("1e9999", false), Err(ValueError::BadExponent));
        assert_eq!(Value::parse("1.5", true), Err(ValueError::FractionalDrops));
    }

    #[test]
    fn renders_canonical_strings() {
        assert_eq!(token("0").to_string(), "0");
        assert_eq!(token("1111.001111").to_string(), "1111.001111");
        assert_eq!(token("0.000001").to_string(), "0.000001");
        assert_eq!(token("-12.50").to_string(), "-12.5");
        assert_eq!(token("1e80").to_string(), "1e80");
        assert_eq!(token("1234567890123456000").to_string(), "1234567890123456000");
        assert_eq!(Value::drops(25_000_000).to_string(), "25000000");
    }

    #[test]
    fn truncates_past_sixteen_significant_digits() {
        // The seventeenth digit is dropped, not rounded.
        assert_eq!(token("1.2345678901234567").to_string(), "1.234567890123456");
        assert_eq!(token("99999999999999999").to_string(), "99999999999999990");
    }

    #[test]
    fn display_round_trips_through_parse() {
        for s in ["1111.001111", "1e80", "0.000001", "123456789.987", "-42"] {
            let v = token(s);
            assert_eq!(token(&v.to_string()), v);
        }
    }

    #[test]
    fn amount_serde_uses_wire_triple() {
        let amount = Amount::issued(
            token("12.5"),
            Currency::new("USD").unwrap(),
            Address::from_account_id([3u8; 20]),
        );
        let json = serde_json::to_value(&amount).unwrap();
        assert_eq!(json["value"], "12.5");
        assert_eq!(json["currency"], "USD");
        let back: Amount = serde_json::from_value(json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn native_amount_uses_sentinels() {
        let amount = Amount::drops(77);
        assert!(amount.is_native());
        assert_eq!(amount.currency.as_str(), XRP_CURRENCY);
        assert_eq!(amount.issuer.as_str(), XRP_ISSUER);
        let json = serde_json::to_value(&amount).unwrap();
        assert_eq!(json["value"], "77");
    }
}
