use clap::{Parser, ValueEnum};
use sepiolib::{
    error::{Result, SepioError},
    formats::csv::{EntryCsv, PaymentCsv, ENTRY_COLUMNS, PAYMENT_COLUMNS},
    model::{EntryRecord, PaymentInstruction},
    parser::{CamtParser, Pain001Parser},
    schema::SchemaRegistry,
    traits::WriteFormat,
};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MsgType {
    Camt,
    Pain001,
}

#[derive(Parser, Debug)]
#[command(
    name = "sepio",
    version,
    about = "Разбор банковских сообщений ISO 20022 (CAMT.053 / PAIN.001)"
)]
struct Cli {
    /// Тип файла: camt или pain001
    #[arg(long = "type", value_enum)]
    msg_type: MsgType,

    /// Входной XML-файл
    #[arg(long = "input")]
    input: PathBuf,

    /// Куда писать CSV (по умолчанию — таблица в stdout)
    #[arg(long = "output")]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if !cli.input.is_file() {
        return Err(SepioError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input file {} does not exist", cli.input.display()),
        )));
    }
    let xml = fs::read_to_string(&cli.input)?;
    let registry = SchemaRegistry::new();

    match cli.msg_type {
        MsgType::Camt => {
            let statements = CamtParser::new(&registry).parse(&xml)?;
            info!(statements = statements.len(), "CAMT.053 parsed");
            let entries: Vec<EntryRecord> =
                statements.into_iter().flat_map(|s| s.entries).collect();
            match cli.output {
                Some(path) => {
                    // сначала полный буфер, потом файл — частичных файлов не бывает
                    let mut buf = Vec::new();
                    EntryCsv::write(&mut buf, &entries)?;
                    fs::write(&path, buf)?;
                }
                None => print_table(&ENTRY_COLUMNS, &entry_rows(&entries)),
            }
        }
        MsgType::Pain001 => {
            let instruction = Pain001Parser::new(&registry).parse(&xml)?;
            info!(
                transactions = instruction.transaction_count(),
                "PAIN.001 parsed"
            );
            match cli.output {
                Some(path) => {
                    let mut buf = Vec::new();
                    PaymentCsv::write(&mut buf, &instruction)?;
                    fs::write(&path, buf)?;
                }
                None => print_table(&PAYMENT_COLUMNS, &payment_rows(&instruction)),
            }
        }
    }
    Ok(())
}

fn entry_rows(entries: &[EntryRecord]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            vec![
                e.booking_date.format("%Y-%m-%d").to_string(),
                e.value_date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", e.amount),
                e.currency.clone(),
                e.credit_debit.as_code().to_string(),
                e.status.as_code().to_string(),
                e.remittance_info.clone().unwrap_or_default(),
                e.counterparty_name.clone().unwrap_or_default(),
                e.counterparty_iban.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

fn payment_rows(instr: &PaymentInstruction) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for block in &instr.payment_info {
        for tx in &block.transactions {
            rows.push(vec![
                block.payment_id.clone(),
                tx.end_to_end_id.clone(),
                block.requested_execution_date.format("%Y-%m-%d").to_string(),
                format!("{:.2}", tx.amount),
                tx.currency.clone(),
                block.debtor.name.clone(),
                block.debtor_account_iban.clone(),
                tx.creditor.name.clone(),
                tx.creditor_account_iban.clone(),
                tx.remittance_info.clone().unwrap_or_default(),
            ]);
        }
    }
    rows
}

/// Выровненная таблица в stdout; ширина колонки — по самой длинной ячейке.
fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render = |cells: &[&str]| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(&format!("{cell:<width$}", width = widths[i]));
        }
        println!("{}", line.trim_end());
    };

    render(&headers.to_vec());
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        render(&cells);
    }
}
