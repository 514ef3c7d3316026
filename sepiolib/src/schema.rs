//! Реестр схем: версия сообщения из namespace корня + скомпилированные
//! таблицы правил для поддерживаемых версий.
//!
//! «Скомпилированная схема» — это индексированная таблица
//! (путь элемента, кардинальность, фасет) плюс заранее собранные regex;
//! добавление версии — новая таблица, а не новый обходчик.

use crate::error::{Result, SepioError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::{events::Event, Reader};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Закрытый набор семейств — никакого строкового диспатча.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    Camt053,
    Pain001,
}

impl MessageFamily {
    fn urn_tag(self) -> &'static str {
        match self {
            MessageFamily::Camt053 => "camt",
            MessageFamily::Pain001 => "pain",
        }
    }
}

impl fmt::Display for MessageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFamily::Camt053 => write!(f, "camt.053"),
            MessageFamily::Pain001 => write!(f, "pain.001"),
        }
    }
}

const NS_PREFIX: &str = "urn:iso:std:iso:20022:tech:xsd:";

/// Семейство + строка версии, например "053.001.02". Фиксируется один раз
/// при разборе namespace корня документа.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageVersion {
    pub family: MessageFamily,
    pub version: String,
}

impl MessageVersion {
    pub fn camt_053_v2() -> Self {
        MessageVersion {
            family: MessageFamily::Camt053,
            version: "053.001.02".into(),
        }
    }

    pub fn pain_001_v3() -> Self {
        MessageVersion {
            family: MessageFamily::Pain001,
            version: "001.001.03".into(),
        }
    }

    pub fn namespace(&self) -> String {
        format!("{NS_PREFIX}{}.{}", self.family.urn_tag(), self.version)
    }

    pub fn from_namespace(ns: &str) -> Result<Self> {
        let tail = ns
            .strip_prefix(NS_PREFIX)
            .ok_or_else(|| SepioError::UnrecognizedNamespace(ns.to_string()))?;
        if let Some(v) = tail.strip_prefix("camt.") {
            if v.starts_with("053.") {
                return Ok(MessageVersion {
                    family: MessageFamily::Camt053,
                    version: v.to_string(),
                });
            }
        }
        if let Some(v) = tail.strip_prefix("pain.") {
            if v.starts_with("001.") {
                return Ok(MessageVersion {
                    family: MessageFamily::Pain001,
                    version: v.to_string(),
                });
            }
        }
        Err(SepioError::UnrecognizedNamespace(ns.to_string()))
    }

    /// Снимает версию с атрибута xmlns корневого <Document>.
    pub fn of_document(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if name != "Document" {
                        return Err(SepioError::UnrecognizedNamespace(format!(
                            "root element <{name}> is not <Document>"
                        )));
                    }
                    for a in e.attributes() {
                        let a = a.map_err(|e| SepioError::MalformedXml(e.to_string()))?;
                        if a.key.as_ref() == b"xmlns" {
                            let ns = String::from_utf8(a.value.into_owned())
                                .map_err(|e| SepioError::MalformedXml(e.to_string()))?;
                            return Self::from_namespace(&ns);
                        }
                    }
                    return Err(SepioError::UnrecognizedNamespace(
                        "document root declares no default namespace".into(),
                    ));
                }
                Ok(Event::Eof) => return Err(SepioError::MalformedXml("empty document".into())),
                Ok(_) => {}
                Err(e) => return Err(SepioError::MalformedXml(e.to_string())),
            }
            buf.clear();
        }
    }
}

impl fmt::Display for MessageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.family.urn_tag(), self.version)
    }
}

/* --------------------------- таблицы правил ------------------------------ */

/// Фасет листового элемента (или None для контейнера).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    None,
    Text { max: usize },
    Decimal { max_frac: u32 },
    Date,
    DateTime,
    Code(&'static [&'static str]),
    Currency,
    Country,
    Iban,
    Bic,
    Number,
    Bool,
}

#[derive(Debug)]
pub struct ElementSpec {
    pub path: &'static str,
    pub min: u8,
    pub many: bool,
    pub facet: Facet,
    /// Обязательный атрибут Ccy (суммы с валютой).
    pub ccy_attr: bool,
}

/// XSD-choice: внутри parent должен встретиться хотя бы один из any_of.
#[derive(Debug)]
pub struct Choice {
    pub parent: &'static str,
    pub any_of: &'static [&'static str],
}

const fn el(path: &'static str, min: u8, many: bool, facet: Facet) -> ElementSpec {
    ElementSpec {
        path,
        min,
        many,
        facet,
        ccy_attr: false,
    }
}

const fn amt(path: &'static str, min: u8) -> ElementSpec {
    ElementSpec {
        path,
        min,
        many: false,
        facet: Facet::Decimal { max_frac: 5 },
        ccy_attr: true,
    }
}

const CDT_DBT: &[&str] = &["CRDT", "DBIT"];
const ENTRY_STS: &[&str] = &["BOOK", "PDNG"];
const BAL_CODES: &[&str] = &["OPBD", "CLBD", "CLAV", "PRCD", "FWAV"];
const CHRG_BR: &[&str] = &["DEBT", "CRED", "SHAR", "SLEV"];
const PMT_MTD: &[&str] = &["TRF", "CHK"];

const T4: Facet = Facet::Text { max: 4 };
const T34: Facet = Facet::Text { max: 34 };
const T35: Facet = Facet::Text { max: 35 };
const T70: Facet = Facet::Text { max: 70 };
const T140: Facet = Facet::Text { max: 140 };
const T500: Facet = Facet::Text { max: 500 };
const SUM17: Facet = Facet::Decimal { max_frac: 17 };

static CAMT_053_001_02: &[ElementSpec] = &[
    el("Document", 1, false, Facet::None),
    el("Document/BkToCstmrStmt", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/GrpHdr", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/GrpHdr/MsgId", 1, false, T35),
    el("Document/BkToCstmrStmt/GrpHdr/CreDtTm", 1, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/GrpHdr/MsgPgntn", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/GrpHdr/MsgPgntn/PgNb", 1, false, Facet::Number),
    el("Document/BkToCstmrStmt/GrpHdr/MsgPgntn/LastPgInd", 1, false, Facet::Bool),
    el("Document/BkToCstmrStmt/GrpHdr/AddtlInf", 0, false, T500),
    el("Document/BkToCstmrStmt/Stmt", 1, true, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Id", 1, false, T35),
    el("Document/BkToCstmrStmt/Stmt/ElctrncSeqNb", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/LglSeqNb", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/CreDtTm", 1, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/FrToDt", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/FrToDt/FrDtTm", 1, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/FrToDt/ToDtTm", 1, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/Acct", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Id", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Id/IBAN", 0, false, Facet::Iban),
    el("Document/BkToCstmrStmt/Stmt/Acct/Id/Othr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Id/Othr/Id", 1, false, T34),
    el("Document/BkToCstmrStmt/Stmt/Acct/Ccy", 0, false, Facet::Currency),
    el("Document/BkToCstmrStmt/Stmt/Acct/Nm", 0, false, T70),
    el("Document/BkToCstmrStmt/Stmt/Acct/Ownr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Ownr/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Acct/Svcr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Svcr/FinInstnId", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Acct/Svcr/FinInstnId/BIC", 0, false, Facet::Bic),
    el("Document/BkToCstmrStmt/Stmt/Acct/Svcr/FinInstnId/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Bal", 1, true, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Bal/Tp", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Bal/Tp/CdOrPrtry", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Bal/Tp/CdOrPrtry/Cd", 1, false, Facet::Code(BAL_CODES)),
    amt("Document/BkToCstmrStmt/Stmt/Bal/Amt", 1),
    el("Document/BkToCstmrStmt/Stmt/Bal/CdtDbtInd", 1, false, Facet::Code(CDT_DBT)),
    el("Document/BkToCstmrStmt/Stmt/Bal/Dt", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Bal/Dt/Dt", 0, false, Facet::Date),
    el("Document/BkToCstmrStmt/Stmt/Bal/Dt/DtTm", 0, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlNtries", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlNtries/NbOfNtries", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlNtries/Sum", 0, false, SUM17),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlNtries/TtlNetNtryAmt", 0, false, SUM17),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlNtries/CdtDbtInd", 0, false, Facet::Code(CDT_DBT)),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlCdtNtries", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlCdtNtries/NbOfNtries", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlCdtNtries/Sum", 0, false, SUM17),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlDbtNtries", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlDbtNtries/NbOfNtries", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/TxsSummry/TtlDbtNtries/Sum", 0, false, SUM17),
    el("Document/BkToCstmrStmt/Stmt/Ntry", 0, true, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryRef", 0, false, T35),
    amt("Document/BkToCstmrStmt/Stmt/Ntry/Amt", 1),
    el("Document/BkToCstmrStmt/Stmt/Ntry/CdtDbtInd", 1, false, Facet::Code(CDT_DBT)),
    el("Document/BkToCstmrStmt/Stmt/Ntry/RvslInd", 0, false, Facet::Bool),
    el("Document/BkToCstmrStmt/Stmt/Ntry/Sts", 1, false, Facet::Code(ENTRY_STS)),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BookgDt", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BookgDt/Dt", 0, false, Facet::Date),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BookgDt/DtTm", 0, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/Ntry/ValDt", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/ValDt/Dt", 0, false, Facet::Date),
    el("Document/BkToCstmrStmt/Stmt/Ntry/ValDt/DtTm", 0, false, Facet::DateTime),
    el("Document/BkToCstmrStmt/Stmt/Ntry/AcctSvcrRef", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Domn", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Domn/Cd", 1, false, T4),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Domn/Fmly", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Domn/Fmly/Cd", 1, false, T4),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Domn/Fmly/SubFmlyCd", 1, false, T4),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Prtry", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Prtry/Cd", 1, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd/Prtry/Issr", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls", 0, true, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/Btch", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/Btch/NbOfTxs", 0, false, Facet::Number),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls", 0, true, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/MsgId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/AcctSvcrRef", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/PmtInfId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/InstrId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/EndToEndId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/TxId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/Refs/MndtId", 0, false, T35),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/AmtDtls", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/AmtDtls/TxAmt", 0, false, Facet::None),
    amt("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/AmtDtls/TxAmt/Amt", 1),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Dbtr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Dbtr/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Dbtr/PstlAdr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Dbtr/PstlAdr/Ctry", 0, false, Facet::Country),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Dbtr/PstlAdr/AdrLine", 0, true, T70),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct/Id", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct/Id/IBAN", 0, false, Facet::Iban),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct/Id/Othr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct/Id/Othr/Id", 1, false, T34),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Cdtr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Cdtr/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Cdtr/PstlAdr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Cdtr/PstlAdr/Ctry", 0, false, Facet::Country),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/Cdtr/PstlAdr/AdrLine", 0, true, T70),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct/Id", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct/Id/IBAN", 0, false, Facet::Iban),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct/Id/Othr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct/Id/Othr/Id", 1, false, T34),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/UltmtDbtr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/UltmtDbtr/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/UltmtCdtr", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/UltmtCdtr/Nm", 0, false, T140),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/DbtrAgt", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/DbtrAgt/FinInstnId", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/DbtrAgt/FinInstnId/BIC", 0, false, Facet::Bic),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/CdtrAgt", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/CdtrAgt/FinInstnId", 1, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdAgts/CdtrAgt/FinInstnId/BIC", 0, false, Facet::Bic),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RmtInf", 0, false, Facet::None),
    el("Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RmtInf/Ustrd", 0, true, T140),
    el("Document/BkToCstmrStmt/Stmt/Ntry/AddtlNtryInf", 0, false, T500),
    el("Document/BkToCstmrStmt/Stmt/AddtlStmtInf", 0, false, T500),
];

static CAMT_CHOICES: &[Choice] = &[
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Acct/Id",
        any_of: &["IBAN", "Othr"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Bal/Dt",
        any_of: &["Dt", "DtTm"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Ntry/BookgDt",
        any_of: &["Dt", "DtTm"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Ntry/ValDt",
        any_of: &["Dt", "DtTm"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Ntry/BkTxCd",
        any_of: &["Domn", "Prtry"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/DbtrAcct/Id",
        any_of: &["IBAN", "Othr"],
    },
    Choice {
        parent: "Document/BkToCstmrStmt/Stmt/Ntry/NtryDtls/TxDtls/RltdPties/CdtrAcct/Id",
        any_of: &["IBAN", "Othr"],
    },
];

static PAIN_001_001_03: &[ElementSpec] = &[
    el("Document", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr/MsgId", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/GrpHdr/CreDtTm", 1, false, Facet::DateTime),
    el("Document/CstmrCdtTrfInitn/GrpHdr/NbOfTxs", 1, false, Facet::Number),
    el("Document/CstmrCdtTrfInitn/GrpHdr/CtrlSum", 0, false, SUM17),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Nm", 0, false, T140),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Id", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Id/OrgId", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Id/OrgId/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Id/OrgId/Othr/Id", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf", 1, true, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/PmtInfId", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/PmtMtd", 1, false, Facet::Code(PMT_MTD)),
    el("Document/CstmrCdtTrfInitn/PmtInf/BtchBookg", 0, false, Facet::Bool),
    el("Document/CstmrCdtTrfInitn/PmtInf/NbOfTxs", 0, false, Facet::Number),
    el("Document/CstmrCdtTrfInitn/PmtInf/CtrlSum", 0, false, SUM17),
    el("Document/CstmrCdtTrfInitn/PmtInf/PmtTpInf", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/PmtTpInf/SvcLvl", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/PmtTpInf/SvcLvl/Cd", 1, false, T4),
    el("Document/CstmrCdtTrfInitn/PmtInf/ReqdExctnDt", 1, false, Facet::Date),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Nm", 0, false, T140),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/PstlAdr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/PstlAdr/Ctry", 0, false, Facet::Country),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/PstlAdr/AdrLine", 0, true, T70),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Id", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Id/OrgId", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Id/OrgId/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Id/OrgId/Othr/Id", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Id", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Id/IBAN", 0, false, Facet::Iban),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Id/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Id/Othr/Id", 1, false, T34),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Ccy", 0, false, Facet::Currency),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt/FinInstnId", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt/FinInstnId/BIC", 0, false, Facet::Bic),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt/FinInstnId/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt/FinInstnId/Othr/Id", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/ChrgBr", 0, false, Facet::Code(CHRG_BR)),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf", 1, true, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/PmtId", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/PmtId/InstrId", 0, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/PmtId/EndToEndId", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Amt", 1, false, Facet::None),
    amt("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Amt/InstdAmt", 1),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/ChrgBr", 0, false, Facet::Code(CHRG_BR)),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/UltmtDbtr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/UltmtDbtr/Nm", 0, false, T140),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAgt", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAgt/FinInstnId", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAgt/FinInstnId/BIC", 0, false, Facet::Bic),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Nm", 0, false, T140),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/PstlAdr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/PstlAdr/Ctry", 0, false, Facet::Country),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/PstlAdr/AdrLine", 0, true, T70),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Id", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Id/OrgId", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Id/OrgId/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Id/OrgId/Othr/Id", 1, false, T35),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct/Id", 1, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct/Id/IBAN", 0, false, Facet::Iban),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct/Id/Othr", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct/Id/Othr/Id", 1, false, T34),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Purp", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Purp/Cd", 1, false, T4),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/RmtInf", 0, false, Facet::None),
    el("Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/RmtInf/Ustrd", 0, true, T140),
];

static PAIN_CHOICES: &[Choice] = &[
    Choice {
        parent: "Document/CstmrCdtTrfInitn/GrpHdr/InitgPty/Id/OrgId",
        any_of: &["Othr"],
    },
    Choice {
        parent: "Document/CstmrCdtTrfInitn/PmtInf/Dbtr/Id/OrgId",
        any_of: &["Othr"],
    },
    Choice {
        parent: "Document/CstmrCdtTrfInitn/PmtInf/DbtrAcct/Id",
        any_of: &["IBAN", "Othr"],
    },
    Choice {
        parent: "Document/CstmrCdtTrfInitn/PmtInf/DbtrAgt/FinInstnId",
        any_of: &["BIC", "Othr"],
    },
    Choice {
        parent: "Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/Cdtr/Id/OrgId",
        any_of: &["Othr"],
    },
    Choice {
        parent: "Document/CstmrCdtTrfInitn/PmtInf/CdtTrfTxInf/CdtrAcct/Id",
        any_of: &["IBAN", "Othr"],
    },
];

fn bundled_rules(version: &MessageVersion) -> Option<(&'static [ElementSpec], &'static [Choice])> {
    match (version.family, version.version.as_str()) {
        (MessageFamily::Camt053, "053.001.02") => Some((CAMT_053_001_02, CAMT_CHOICES)),
        (MessageFamily::Pain001, "001.001.03") => Some((PAIN_001_001_03, PAIN_CHOICES)),
        _ => None,
    }
}

/* ------------------------ скомпилированная схема ------------------------- */

#[derive(Debug, Clone)]
pub struct ChildSlot {
    pub name: &'static str,
    pub path: &'static str,
    pub min: u8,
    pub many: bool,
}

#[derive(Debug)]
pub struct CompiledSchema {
    pub version: MessageVersion,
    pub namespace: String,
    children: HashMap<&'static str, Vec<ChildSlot>>,
    by_path: HashMap<&'static str, &'static ElementSpec>,
    choices: &'static [Choice],
    pub re_currency: Regex,
    pub re_iban: Regex,
    pub re_bic: Regex,
    pub re_country: Regex,
    pub re_number: Regex,
}

fn split_path(path: &'static str) -> (&'static str, &'static str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

impl CompiledSchema {
    fn compile(
        version: MessageVersion,
        specs: &'static [ElementSpec],
        choices: &'static [Choice],
    ) -> Self {
        let namespace = version.namespace();
        let mut children: HashMap<&'static str, Vec<ChildSlot>> = HashMap::new();
        let mut by_path = HashMap::new();
        for spec in specs {
            let (parent, name) = split_path(spec.path);
            by_path.insert(spec.path, spec);
            children.entry(parent).or_default().push(ChildSlot {
                name,
                path: spec.path,
                min: spec.min,
                many: spec.many,
            });
        }
        CompiledSchema {
            version,
            namespace,
            children,
            by_path,
            choices,
            re_currency: Regex::new("^[A-Z]{3}$").expect("currency pattern"),
            re_iban: Regex::new("^[A-Z]{2}[0-9]{2}[A-Za-z0-9]{1,30}$").expect("iban pattern"),
            re_bic: Regex::new("^[A-Z]{6}[A-Z0-9]{2}([A-Z0-9]{3})?$").expect("bic pattern"),
            re_country: Regex::new("^[A-Z]{2}$").expect("country pattern"),
            re_number: Regex::new("^[0-9]{1,15}$").expect("number pattern"),
        }
    }

    pub fn spec(&self, path: &str) -> Option<&'static ElementSpec> {
        self.by_path.get(path).copied()
    }

    pub fn children_of(&self, parent: &str) -> &[ChildSlot] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_slot(&self, parent: &str, name: &str) -> Option<(usize, &ChildSlot)> {
        self.children_of(parent)
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
    }

    pub fn choices(&self) -> &'static [Choice] {
        self.choices
    }
}

/* ------------------------------- реестр ---------------------------------- */

/// Кеш скомпилированных схем; создаётся один раз на процесс и передаётся
/// по ссылке. Повторная компиляция при гонке допустима — результат
/// эквивалентен, победитель остаётся в кеше.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: RwLock<HashMap<MessageVersion, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, version: &MessageVersion) -> Result<Arc<CompiledSchema>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(schema) = cache.get(version) {
                return Ok(Arc::clone(schema));
            }
        }
        let (specs, choices) =
            bundled_rules(version).ok_or_else(|| SepioError::UnsupportedVersion {
                family: version.family,
                version: version.version.clone(),
            })?;
        let compiled = Arc::new(CompiledSchema::compile(version.clone(), specs, choices));
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(Arc::clone(
            cache.entry(version.clone()).or_insert(compiled),
        ))
    }
}

/* --------------------------- коэрции значений ---------------------------- */

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| SepioError::Parse(format!("date {s}: {e}")))
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_local()))
        .map_err(|e| SepioError::Parse(format!("datetime {s}: {e}")))
}

pub fn parse_amount(s: &str) -> Result<Decimal> {
    Decimal::from_str_exact(s).map_err(|e| SepioError::Parse(format!("amount {s}: {e}")))
}
