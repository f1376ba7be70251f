use super::*;

mod container;
mod field;
mod validation;

pub(crate) use container::ParsedStruct;
