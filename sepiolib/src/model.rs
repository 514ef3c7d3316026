//! Доменные модели — единый «нормализованный» слой между XML и табличным выводом.

use crate::error::{Result, SepioError};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Направление движения: знак суммы всегда в этом поле, сама сумма — модуль.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CreditDebit {
    Credit,
    Debit,
}

impl CreditDebit {
    pub fn as_code(self) -> &'static str {
        match self {
            CreditDebit::Credit => "CRDT",
            CreditDebit::Debit => "DBIT",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "CRDT" => Ok(CreditDebit::Credit),
            "DBIT" => Ok(CreditDebit::Debit),
            other => Err(SepioError::Parse(format!("CdtDbtInd {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryStatus {
    Booked,
    Pending,
}

impl EntryStatus {
    pub fn as_code(self) -> &'static str {
        match self {
            EntryStatus::Booked => "BOOK",
            EntryStatus::Pending => "PDNG",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "BOOK" => Ok(EntryStatus::Booked),
            "PDNG" => Ok(EntryStatus::Pending),
            other => Err(SepioError::Parse(format!("Sts {other}"))),
        }
    }
}

/// Коды балансов CAMT.053 и их расшифровки.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BalanceCode {
    Opbd,
    Clbd,
    Clav,
    Prcd,
    Fwav,
}

impl BalanceCode {
    pub fn as_code(self) -> &'static str {
        match self {
            BalanceCode::Opbd => "OPBD",
            BalanceCode::Clbd => "CLBD",
            BalanceCode::Clav => "CLAV",
            BalanceCode::Prcd => "PRCD",
            BalanceCode::Fwav => "FWAV",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BalanceCode::Opbd => "Opening booked balance",
            BalanceCode::Clbd => "Closing booked balance",
            BalanceCode::Clav => "Closing available balance",
            BalanceCode::Prcd => "Previously closed booked balance",
            BalanceCode::Fwav => "Forward available balance",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "OPBD" => Ok(BalanceCode::Opbd),
            "CLBD" => Ok(BalanceCode::Clbd),
            "CLAV" => Ok(BalanceCode::Clav),
            "PRCD" => Ok(BalanceCode::Prcd),
            "FWAV" => Ok(BalanceCode::Fwav),
            other => Err(SepioError::Parse(format!("balance code {other}"))),
        }
    }
}

/// Одно нарушение схемы: позиция в исходном тексте плюс сообщение.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Итог проверки документа; после создания не меняется.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            valid: true,
            violations: Vec::new(),
        }
    }

    pub fn failed(violations: Vec<Violation>) -> Self {
        ValidationResult {
            valid: false,
            violations,
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "valid");
        }
        write!(f, "{} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "; line {}, column {}: {}", v.line, v.column, v.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceRecord {
    pub code: BalanceCode,
    pub amount: Decimal,
    pub currency: String,
    pub credit_debit: CreditDebit,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryRecord {
    pub booking_date: NaiveDate,
    pub value_date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub credit_debit: CreditDebit,
    pub status: EntryStatus,
    pub remittance_info: Option<String>,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
}

impl EntryRecord {
    /// Подписанное движение: кредит положителен, дебет отрицателен.
    pub fn signed_amount(&self) -> Decimal {
        match self.credit_debit {
            CreditDebit::Credit => self.amount,
            CreditDebit::Debit => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementRecord {
    pub statement_id: String,
    pub account_iban: String,
    pub created: Option<NaiveDateTime>,
    pub balances: Vec<BalanceRecord>,
    pub entries: Vec<EntryRecord>,
}

impl StatementRecord {
    pub fn stats(&self) -> StatementStats {
        let net_amount = self
            .entries
            .iter()
            .map(EntryRecord::signed_amount)
            .sum::<Decimal>();
        StatementStats {
            account_iban: self.account_iban.clone(),
            created: self.created,
            entry_count: self.entries.len(),
            net_amount,
        }
    }
}

/// Сводка по выписке: счёт, время создания, число записей, нетто-сумма.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementStats {
    pub account_iban: String,
    pub created: Option<NaiveDateTime>,
    pub entry_count: usize,
    pub net_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyInfo {
    pub name: String,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInstruction {
    pub message_id: String,
    pub creation_datetime: NaiveDateTime,
    pub initiating_party: PartyInfo,
    pub payment_info: Vec<PaymentInfoBlock>,
}

impl PaymentInstruction {
    pub fn transaction_count(&self) -> usize {
        self.payment_info.iter().map(|b| b.transactions.len()).sum()
    }

    pub fn control_sum(&self) -> Decimal {
        self.payment_info
            .iter()
            .flat_map(|b| &b.transactions)
            .map(|t| t.amount)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentInfoBlock {
    pub payment_id: String,
    pub requested_execution_date: NaiveDate,
    pub debtor: PartyInfo,
    pub debtor_account_iban: String,
    pub transactions: Vec<CreditTransferTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditTransferTransaction {
    pub end_to_end_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub creditor: PartyInfo,
    pub creditor_account_iban: String,
    pub remittance_info: Option<String>,
}
