//! Record store query description.
//!
//! A `Query` carries the projection, filter, filter arguments and ordering of
//! a record store read. Filters use a small positional syntax: comparison
//! terms of the form `column <op> ?` joined by `AND`, where each `?` is bound
//! to the next entry of the selection arguments.

use rxstore_core::{Error, Result, Row, Value};
use std::cmp::Ordering;

/// Column holding the row identifier in every result set.
pub const ID_COLUMN: &str = "_id";

/// Description of a record store read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    projection: Option<Vec<String>>,
    selection: Option<String>,
    selection_args: Vec<Value>,
    sort_order: Option<String>,
}

impl Query {
    /// Creates a query that returns every column of every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the result set to the given columns, in order.
    pub fn project<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.projection = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    /// Sets the filter and its positional arguments.
    pub fn filter(mut self, selection: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        self.selection = Some(selection.into());
        self.selection_args = args.into_iter().collect();
        self
    }

    /// Sets the ordering, e.g. `"title ASC, _id DESC"`.
    pub fn order_by(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }

    /// Returns the projected columns, if restricted.
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// Returns the raw filter.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Returns the filter arguments.
    pub fn selection_args(&self) -> &[Value] {
        &self.selection_args
    }

    /// Returns the raw ordering.
    pub fn sort_order(&self) -> Option<&str> {
        self.sort_order.as_deref()
    }
}

/// Comparison operator of a filter term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "=" | "==" => Some(CompareOp::Eq),
            "!=" | "<>" => Some(CompareOp::NotEq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::LtEq),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::GtEq),
            _ => None,
        }
    }

    fn eval(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

/// A filter compiled against a set of column names.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    terms: Vec<(usize, CompareOp, Value)>,
}

impl Selection {
    /// Compiles `selection` with its positional `args` against `columns`.
    pub fn compile(selection: &str, args: &[Value], columns: &[String]) -> Result<Self> {
        let mut terms = Vec::new();
        let mut args = args.iter();
        for term in split_and(selection) {
            let tokens: Vec<&str> = term.split_whitespace().collect();
            let (column, op, placeholder) = match tokens.as_slice() {
                [column, op, placeholder] => (*column, *op, *placeholder),
                _ => {
                    return Err(Error::invalid_operation(format!(
                        "unsupported filter term: {}",
                        term.trim()
                    )))
                }
            };
            let op = CompareOp::parse(op)
                .ok_or_else(|| Error::invalid_operation(format!("unsupported operator: {}", op)))?;
            if placeholder != "?" {
                return Err(Error::invalid_operation(format!(
                    "filter values must be bound through arguments: {}",
                    term.trim()
                )));
            }
            let index = columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| Error::column_not_found(column))?;
            let value = args.next().cloned().ok_or_else(|| {
                Error::invalid_operation(format!("missing argument for filter term: {}", term.trim()))
            })?;
            terms.push((index, op, value));
        }
        if args.next().is_some() {
            return Err(Error::invalid_operation("too many filter arguments"));
        }
        Ok(Self { terms })
    }

    /// Returns true if `row` satisfies every term.
    pub fn matches(&self, row: &Row) -> bool {
        self.terms.iter().all(|(index, op, expected)| match row.get(*index) {
            Some(Value::Null) | None => false,
            Some(value) => op.eval(value.loose_cmp(expected)),
        })
    }
}

fn split_and(selection: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut rest = selection;
    loop {
        let upper = rest.to_ascii_uppercase();
        match upper.find(" AND ") {
            Some(at) => {
                terms.push(&rest[..at]);
                rest = &rest[at + 5..];
            }
            None => {
                if !rest.trim().is_empty() {
                    terms.push(rest);
                }
                return terms;
            }
        }
    }
}

/// An ordering compiled against a set of column names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    keys: Vec<(usize, bool)>,
}

impl SortOrder {
    /// Compiles `order` (comma separated `column [ASC|DESC]`) against `columns`.
    pub fn compile(order: &str, columns: &[String]) -> Result<Self> {
        let mut keys = Vec::new();
        for key in order.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            let mut parts = key.split_whitespace();
            let column = parts.next().unwrap_or_default();
            let descending = match parts.next().map(|d| d.to_ascii_uppercase()) {
                None => false,
                Some(d) if d == "ASC" => false,
                Some(d) if d == "DESC" => true,
                Some(d) => {
                    return Err(Error::invalid_operation(format!("unsupported sort direction: {}", d)))
                }
            };
            let index = columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| Error::column_not_found(column))?;
            keys.push((index, descending));
        }
        Ok(Self { keys })
    }

    /// Stable-sorts `rows` by the compiled keys.
    pub fn sort(&self, rows: &mut [Row]) {
        rows.sort_by(|a, b| {
            for (index, descending) in &self.keys {
                let ordering = a.get(*index).cmp(&b.get(*index));
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}
