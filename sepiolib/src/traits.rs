//! Унифицированные трэйты чтения/записи на основе std::io::{BufRead, Write}.
//!
//! У каждого формата своя полезная нагрузка (выписки, платёжные поручения,
//! табличные строки), поэтому тип входа/выхода — ассоциированный.

use crate::error::Result;
use std::io::{BufRead, Write};

pub trait ReadFormat {
    type Output;

    fn read<R: BufRead>(r: R) -> Result<Self::Output>;
}

pub trait WriteFormat {
    type Input: ?Sized;

    fn write<W: Write>(w: W, value: &Self::Input) -> Result<()>;
}
