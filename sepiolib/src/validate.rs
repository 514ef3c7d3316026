//! Структурная валидация документа по скомпилированной таблице правил.
//!
//! Один проход по потоку событий со стеком путей: корень и namespace,
//! белый список элементов, порядок sequence, кардинальность, choice,
//! обязательный атрибут Ccy и фасеты листовых значений. Чистая функция:
//! один и тот же вход всегда даёт один и тот же результат.

use crate::error::{Result, SepioError};
use crate::model::{ValidationResult, Violation};
use crate::schema::{parse_date, parse_datetime, CompiledSchema, ElementSpec, Facet};
use quick_xml::{events::BytesStart, events::Event, Reader};
use rust_decimal::Decimal;

struct Frame {
    known: bool,
    spec_path: &'static str,
    max_index: Option<usize>,
    counts: Vec<u32>,
    had_text: bool,
}

impl Frame {
    fn unknown() -> Self {
        Frame {
            known: false,
            spec_path: "",
            max_index: None,
            counts: Vec::new(),
            had_text: false,
        }
    }
}

pub fn validate(xml: &str, schema: &CompiledSchema) -> Result<ValidationResult> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut violations: Vec<Violation> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut roots_seen = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let frame = open_element(
                    &e,
                    &mut stack,
                    schema,
                    &mut violations,
                    &mut roots_seen,
                    xml,
                    reader.buffer_position(),
                );
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                let frame = open_element(
                    &e,
                    &mut stack,
                    schema,
                    &mut violations,
                    &mut roots_seen,
                    xml,
                    reader.buffer_position(),
                );
                close_frame(frame, schema, &mut violations, xml, reader.buffer_position());
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(xml, reader.buffer_position(), &e))?
                    .into_owned();
                check_frame_text(&mut stack, schema, &text, &mut violations, xml, reader.buffer_position());
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                check_frame_text(&mut stack, schema, &text, &mut violations, xml, reader.buffer_position());
            }
            Ok(Event::End(_)) => {
                if let Some(frame) = stack.pop() {
                    close_frame(frame, schema, &mut violations, xml, reader.buffer_position());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(xml, reader.buffer_position(), &e)),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(SepioError::MalformedXml(
            "unexpected end of document inside an element".into(),
        ));
    }
    if roots_seen == 0 {
        return Err(SepioError::MalformedXml("empty document".into()));
    }

    if violations.is_empty() {
        Ok(ValidationResult::ok())
    } else {
        Ok(ValidationResult::failed(violations))
    }
}

#[allow(clippy::too_many_arguments)]
fn open_element(
    e: &BytesStart<'_>,
    stack: &mut [Frame],
    schema: &CompiledSchema,
    violations: &mut Vec<Violation>,
    roots_seen: &mut usize,
    xml: &str,
    pos: usize,
) -> Frame {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

    let spec_path: &'static str = if let Some(top) = stack.last_mut() {
        if !top.known {
            return Frame::unknown();
        }
        match schema.child_slot(top.spec_path, &name) {
            Some((idx, slot)) => {
                if let Some(max) = top.max_index {
                    if idx < max {
                        push_violation(
                            violations,
                            xml,
                            pos,
                            format!("<{name}> out of sequence order in <{}>", last_segment(top.spec_path)),
                        );
                    }
                }
                top.max_index = Some(top.max_index.map_or(idx, |m| m.max(idx)));
                top.counts[idx] += 1;
                if top.counts[idx] > 1 && !slot.many {
                    push_violation(
                        violations,
                        xml,
                        pos,
                        format!("<{name}> may not repeat in <{}>", last_segment(top.spec_path)),
                    );
                }
                slot.path
            }
            None => {
                push_violation(
                    violations,
                    xml,
                    pos,
                    format!("unexpected element <{name}> in <{}>", last_segment(top.spec_path)),
                );
                return Frame::unknown();
            }
        }
    } else {
        *roots_seen += 1;
        if *roots_seen > 1 {
            push_violation(violations, xml, pos, "multiple root elements".into());
            return Frame::unknown();
        }
        if name != "Document" {
            push_violation(
                violations,
                xml,
                pos,
                format!("root element <{name}>, expected <Document>"),
            );
            return Frame::unknown();
        }
        let ns = e.attributes().flatten().find_map(|a| {
            (a.key.as_ref() == b"xmlns").then(|| String::from_utf8_lossy(&a.value).into_owned())
        });
        match ns {
            Some(ns) if ns == schema.namespace => {}
            Some(ns) => push_violation(
                violations,
                xml,
                pos,
                format!("default namespace {ns}, expected {}", schema.namespace),
            ),
            None => push_violation(
                violations,
                xml,
                pos,
                format!("missing default namespace {}", schema.namespace),
            ),
        }
        "Document"
    };

    if let Some(spec) = schema.spec(spec_path) {
        if spec.ccy_attr {
            match e.attributes().flatten().find(|a| a.key.as_ref() == b"Ccy") {
                Some(a) => {
                    let ccy = String::from_utf8_lossy(&a.value).into_owned();
                    if !schema.re_currency.is_match(&ccy) {
                        push_violation(
                            violations,
                            xml,
                            pos,
                            format!("<{name}>: bad currency code {ccy}"),
                        );
                    }
                }
                None => push_violation(
                    violations,
                    xml,
                    pos,
                    format!("<{name}>: missing Ccy attribute"),
                ),
            }
        }
    }

    Frame {
        known: true,
        spec_path,
        max_index: None,
        counts: vec![0; schema.children_of(spec_path).len()],
        had_text: false,
    }
}

fn close_frame(
    frame: Frame,
    schema: &CompiledSchema,
    violations: &mut Vec<Violation>,
    xml: &str,
    pos: usize,
) {
    if !frame.known {
        return;
    }
    let name = last_segment(frame.spec_path);

    for (idx, slot) in schema.children_of(frame.spec_path).iter().enumerate() {
        if u32::from(slot.min) > frame.counts[idx] {
            push_violation(
                violations,
                xml,
                pos,
                format!("missing required <{}> in <{name}>", slot.name),
            );
        }
    }

    for choice in schema.choices().iter().filter(|c| c.parent == frame.spec_path) {
        let satisfied = choice.any_of.iter().any(|alt| {
            schema
                .child_slot(frame.spec_path, alt)
                .map(|(idx, _)| frame.counts[idx] > 0)
                .unwrap_or(false)
        });
        if !satisfied {
            push_violation(
                violations,
                xml,
                pos,
                format!("<{name}> requires one of {:?}", choice.any_of),
            );
        }
    }

    if let Some(spec) = schema.spec(frame.spec_path) {
        if spec.facet != Facet::None && !frame.had_text {
            push_violation(violations, xml, pos, format!("<{name}> must not be empty"));
        }
    }
}

fn check_frame_text(
    stack: &mut [Frame],
    schema: &CompiledSchema,
    text: &str,
    violations: &mut Vec<Violation>,
    xml: &str,
    pos: usize,
) {
    let Some(top) = stack.last_mut() else { return };
    if !top.known {
        return;
    }
    top.had_text = true;
    let Some(spec) = schema.spec(top.spec_path) else { return };
    if let Some(message) = check_text(spec, text, schema) {
        let name = last_segment(spec.path);
        push_violation(violations, xml, pos, format!("<{name}>: {message}"));
    }
}

fn check_text(spec: &ElementSpec, text: &str, schema: &CompiledSchema) -> Option<String> {
    match spec.facet {
        Facet::None => None,
        Facet::Text { max } => {
            let n = text.chars().count();
            (n == 0 || n > max).then(|| format!("text length {n} outside 1..={max}"))
        }
        Facet::Decimal { max_frac } => match Decimal::from_str_exact(text) {
            Ok(d) if d.is_sign_negative() => Some(format!("negative amount {text}")),
            Ok(d) if d.scale() > max_frac => {
                Some(format!("more than {max_frac} fraction digits: {text}"))
            }
            Ok(_) => None,
            Err(_) => Some(format!("not a decimal: {text}")),
        },
        Facet::Date => parse_date(text)
            .err()
            .map(|_| format!("not an ISO date: {text}")),
        Facet::DateTime => parse_datetime(text)
            .err()
            .map(|_| format!("not an ISO datetime: {text}")),
        Facet::Code(codes) => {
            (!codes.contains(&text)).then(|| format!("{text} is not one of {codes:?}"))
        }
        Facet::Currency => {
            (!schema.re_currency.is_match(text)).then(|| format!("bad currency code {text}"))
        }
        Facet::Country => {
            (!schema.re_country.is_match(text)).then(|| format!("bad country code {text}"))
        }
        Facet::Iban => (!schema.re_iban.is_match(text)).then(|| format!("bad IBAN {text}")),
        Facet::Bic => (!schema.re_bic.is_match(text)).then(|| format!("bad BIC {text}")),
        Facet::Number => {
            (!schema.re_number.is_match(text)).then(|| format!("not a numeric text: {text}"))
        }
        Facet::Bool => {
            (!matches!(text, "true" | "false" | "1" | "0")).then(|| format!("not a boolean: {text}"))
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn push_violation(violations: &mut Vec<Violation>, xml: &str, pos: usize, message: String) {
    let (line, column) = line_col(xml, pos);
    violations.push(Violation {
        line,
        column,
        message,
    });
}

fn malformed(xml: &str, pos: usize, err: &dyn std::fmt::Display) -> SepioError {
    let (line, column) = line_col(xml, pos);
    SepioError::MalformedXml(format!("line {line}, column {column}: {err}"))
}

/// 1-базные строка и колонка для байтового смещения.
fn line_col(xml: &str, offset: usize) -> (usize, usize) {
    let upto = &xml.as_bytes()[..offset.min(xml.len())];
    let line = upto.iter().filter(|&&b| b == b'\n').count() + 1;
    let column = upto.iter().rev().take_while(|&&b| b != b'\n').count() + 1;
    (line, column)
}
