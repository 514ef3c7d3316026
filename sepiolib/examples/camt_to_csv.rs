use sepiolib::{
    formats::csv::EntryCsv, model::EntryRecord, parser::CamtParser, schema::SchemaRegistry,
    traits::WriteFormat,
};
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: CAMT.053 из stdin -> CSV в stdout
    let mut xml = String::new();
    std::io::stdin().read_to_string(&mut xml)?;

    let registry = SchemaRegistry::new();
    let statements = CamtParser::new(&registry).parse(&xml)?;
    let entries: Vec<EntryRecord> = statements.into_iter().flat_map(|s| s.entries).collect();
    EntryCsv::write(std::io::stdout(), &entries)?;
    Ok(())
}
