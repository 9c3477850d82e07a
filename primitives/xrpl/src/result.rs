//! Engine result codes.
//!
//! A transaction observed by the scanner is only worth attesting once its
//! result can no longer change. The rules: `tes` success and every `tec`
//! (applied, fee consumed, effects reverted) are final once in a validated
//! ledger; `tem` malformed codes are final unless the protocol itself
//! changes; of the `tef` family only `tefPAST_SEQ` (superseded by another
//! transaction with the same sequence) and `tefMAX_LEDGER` (submission
//! window expired) are terminal. Everything else may still be retried by
//! the network and is skipped until the scanner re-delivers it.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const TES_SUCCESS: &str = "tesSUCCESS";
pub const TEF_NO_TICKET: &str = "tefNO_TICKET";
pub const TEF_PAST_SEQ: &str = "tefPAST_SEQ";
pub const TEF_MAX_LEDGER: &str = "tefMAX_LEDGER";
pub const TEL_INSUF_FEE_P: &str = "telINSUF_FEE_P";

/// Code-prefix classes defined by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    /// `tes` — applied and successful.
    Success,
    /// `tec` — applied, fee claimed, effects reverted.
    ClaimedCostOnly,
    /// `tem` — malformed.
    Malformed,
    /// `tef` — failed, not applied.
    Failure,
    /// `tel` — local node error.
    LocalError,
    /// `ter` — retriable.
    Retry,
    /// Unrecognised prefix.
    Unknown,
}

/// A textual engine result code, e.g. `tesSUCCESS` or `tecPATH_DRY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionResult(String);

impl TransactionResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn class(&self) -> ResultClass {
        match self.0.get(..3) {
            Some("tes") => ResultClass::Success,
            Some("tec") => ResultClass::ClaimedCostOnly,
            Some("tem") => ResultClass::Malformed,
            Some("tef") => ResultClass::Failure,
            Some("tel") => ResultClass::LocalError,
            Some("ter") => ResultClass::Retry,
            _ => ResultClass::Unknown,
        }
    }

    pub fn is_success(&self) -> bool {
        self.0 == TES_SUCCESS
    }

    /// Whether the outcome can no longer change.
    pub fn is_final(&self) -> bool {
        match self.class() {
            ResultClass::Success | ResultClass::ClaimedCostOnly | ResultClass::Malformed => true,
            ResultClass::Failure => self.0 == TEF_PAST_SEQ || self.0 == TEF_MAX_LEDGER,
            ResultClass::LocalError | ResultClass::Retry | ResultClass::Unknown => false,
        }
    }
}

impl fmt::Display for TransactionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionResult {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finality_matches_the_code_table() {
        let cases = [
            ("tesSUCCESS", true),
            ("tecPATH_DRY", true),
            ("tecUNFUNDED_PAYMENT", true),
            ("temBAD_FEE", true),
            ("temMALFORMED", true),
            ("tefPAST_SEQ", true),
            ("tefMAX_LEDGER", true),
            ("tefNO_TICKET", false),
            ("tefALREADY", false),
            ("telINSUF_FEE_P", false),
            ("terRETRY", false),
            ("terQUEUED", false),
            ("banana", false),
        ];
        for (code, expected) in cases {
            assert_eq!(
                TransactionResult::new(code).is_final(),
                expected,
                "finality of {code}"
            );
        }
    }

    #[test]
    fn classes_follow_prefixes() {
        assert_eq!(TransactionResult::new("tesSUCCESS").class(), ResultClass::Success);
        assert_eq!(TransactionResult::new("tecKILLED").class(), ResultClass::ClaimedCostOnly);
        assert_eq!(TransactionResult::new("temBAD_FEE").class(), ResultClass::Malformed);
        assert_eq!(TransactionResult::new("tefPAST_SEQ").class(), ResultClass::Failure);
        assert_eq!(TransactionResult::new("telCAN_NOT_QUEUE").class(), ResultClass::LocalError);
        assert_eq!(TransactionResult::new("terPRE_SEQ").class(), ResultClass::Retry);
        assert_eq!(TransactionResult::new("oops").class(), ResultClass::Unknown);
    }
}
