//! Фасады разбора: реестр схем → валидатор → извлечение/генерация.
//!
//! Единственное место, знающее об обоих семействах. Диспатч — по
//! заявленному типу, содержимое не «угадывается»; namespace другого
//! семейства для данного фасада — нераспознанный namespace.

use crate::{
    error::{Result, SepioError},
    formats::{camt053::Camt053, pain001::Pain001},
    model::{PaymentInstruction, StatementRecord},
    schema::{CompiledSchema, MessageFamily, MessageVersion, SchemaRegistry},
    traits::{ReadFormat, WriteFormat},
    validate::validate,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CamtParser<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> CamtParser<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        CamtParser { registry }
    }

    /// Выписки документа в исходном порядке. При нарушениях схемы
    /// извлечение не выполняется — наружу уходит полный список нарушений.
    pub fn parse(&self, xml: &str) -> Result<Vec<StatementRecord>> {
        let schema = resolve_checked(self.registry, xml, MessageFamily::Camt053)?;
        let result = validate(xml, &schema)?;
        if !result.valid {
            warn!(violations = result.violations.len(), "schema validation failed");
            return Err(SepioError::SchemaValidation(result));
        }
        Camt053::read(xml.as_bytes())
    }
}

pub struct Pain001Parser<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> Pain001Parser<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Pain001Parser { registry }
    }

    pub fn parse(&self, xml: &str) -> Result<PaymentInstruction> {
        let schema = resolve_checked(self.registry, xml, MessageFamily::Pain001)?;
        let result = validate(xml, &schema)?;
        if !result.valid {
            warn!(violations = result.violations.len(), "schema validation failed");
            return Err(SepioError::SchemaValidation(result));
        }
        Pain001::read(xml.as_bytes())
    }

    /// Генерация: инварианты поручения → XML в буфер → самопроверка по
    /// схеме → запись. В выходной поток не попадает ни байта невалидного
    /// документа.
    pub fn build<W: Write>(&self, mut w: W, instruction: &PaymentInstruction) -> Result<()> {
        let version = MessageVersion::pain_001_v3();
        let schema = self.registry.resolve(&version)?;

        let mut out = Vec::new();
        Pain001::write(&mut out, instruction)?;
        let xml = String::from_utf8(out).map_err(|e| SepioError::Parse(e.to_string()))?;

        let result = validate(&xml, &schema)?;
        if !result.valid {
            return Err(SepioError::SchemaValidation(result));
        }
        w.write_all(xml.as_bytes())?;
        Ok(())
    }
}

fn resolve_checked(
    registry: &SchemaRegistry,
    xml: &str,
    family: MessageFamily,
) -> Result<Arc<CompiledSchema>> {
    let version = MessageVersion::of_document(xml)?;
    if version.family != family {
        return Err(SepioError::UnrecognizedNamespace(format!(
            "{} is not a {family} namespace",
            version.namespace()
        )));
    }
    debug!(version = %version, bytes = xml.len(), "resolved message version");
    registry.resolve(&version)
}
