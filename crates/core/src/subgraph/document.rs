//! A small typed builder for GraphQL query documents.
//!
//! Caller input only reaches the rendered text as escaped string literals, integers or
//! validated [`SubgraphId`]s, never as raw interpolated text.
use std::{
    fmt::{self, Display, Write as _},
    str::FromStr,
};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::QueryError;

/// Entity id of a token or pair in the subgraph: `0x` followed by 40 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubgraphId(String);

impl SubgraphId {
    /// Validates `raw` as a 20-byte hex id and lowercases it.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or_else(|| QueryError::InvalidId(raw.to_string()))?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(QueryError::InvalidId(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_address(&self) -> Address {
        Address::from_str(&self.0).expect("validated on construction")
    }
}

impl From<Address> for SubgraphId {
    fn from(address: Address) -> Self {
        Self(format!("{address:#x}"))
    }
}

impl FromStr for SubgraphId {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SubgraphId {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubgraphId> for String {
    fn from(id: SubgraphId) -> Self {
        id.0
    }
}

impl Display for SubgraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Wide enough to hold any `i64` or `u64` exactly
    Int(i128),
    Str(String),
    Id(SubgraphId),
    /// Bare enum value such as `desc` or a field name in `orderBy`
    Enum(&'static str),
    Variable(&'static str),
    List(Vec<Value>),
    Object(Vec<(&'static str, Value)>),
}

impl Value {
    pub fn object<const N: usize>(entries: [(&'static str, Value); N]) -> Self {
        Self::Object(entries.into())
    }

    pub fn ids<'a>(ids: impl IntoIterator<Item = &'a SubgraphId>) -> Self {
        Self::List(ids.into_iter().cloned().map(Value::Id).collect())
    }

    /// `{number: <block>}`, the time-travel argument.
    pub fn block(number: u64) -> Self {
        Self::object([("number", Value::from(number))])
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(i128::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Int(i128::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i128)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<SubgraphId> for Value {
    fn from(v: SubgraphId) -> Self {
        Self::Id(v)
    }
}

impl From<&SubgraphId> for Value {
    fn from(v: &SubgraphId) -> Self {
        Self::Id(v.clone())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(v) => write_escaped(f, v),
            Value::Id(id) => write!(f, "\"{id}\""),
            Value::Enum(v) => f.write_str(v),
            Value::Variable(name) => write!(f, "${name}"),
            Value::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Value::Object(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(Field),
    Spread(&'static str),
}

/// A (possibly aliased) field with arguments and a sub-selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    alias: Option<String>,
    name: &'static str,
    args: Vec<(&'static str, Value)>,
    selection: Vec<Selection>,
}

impl Field {
    pub fn new(name: &'static str) -> Self {
        Self {
            alias: None,
            name,
            args: Vec::new(),
            selection: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn arg(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    /// Adds `block: {number: N}` when a block is given; queries the latest state otherwise.
    pub fn at_block(self, block: Option<u64>) -> Self {
        match block {
            Some(number) => self.arg("block", Value::block(number)),
            None => self,
        }
    }

    pub fn order_by(self, field: &'static str, direction: &'static str) -> Self {
        self.arg("orderBy", Value::Enum(field))
            .arg("orderDirection", Value::Enum(direction))
    }

    pub fn select<const N: usize>(mut self, scalars: [&'static str; N]) -> Self {
        self.selection
            .extend(scalars.into_iter().map(|s| Selection::Field(Field::new(s))));
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.selection.push(Selection::Field(field));
        self
    }

    pub fn spread(mut self, fragment: &'static str) -> Self {
        self.selection.push(Selection::Spread(fragment));
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn args(&self) -> &[(&'static str, Value)] {
        &self.args
    }

    pub fn arg_value(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn render(&self, out: &mut String, depth: usize) {
        indent(out, depth);
        if let Some(alias) = &self.alias {
            let _ = write!(out, "{alias}: ");
        }
        out.push_str(self.name);
        if !self.args.is_empty() {
            out.push('(');
            for (i, (name, value)) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{name}: {value}");
            }
            out.push(')');
        }
        if !self.selection.is_empty() {
            out.push_str(" {\n");
            render_selection(&self.selection, out, depth + 1);
            indent(out, depth);
            out.push('}');
        }
        out.push('\n');
    }
}

fn render_selection(selection: &[Selection], out: &mut String, depth: usize) {
    for item in selection {
        match item {
            Selection::Field(field) => field.render(out, depth),
            Selection::Spread(name) => {
                indent(out, depth);
                let _ = writeln!(out, "...{name}");
            }
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat_n("  ", depth));
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    name: &'static str,
    on: &'static str,
    selection: Vec<Selection>,
}

impl Fragment {
    pub fn new(name: &'static str, on: &'static str) -> Self {
        Self {
            name,
            on,
            selection: Vec::new(),
        }
    }

    pub fn select<const N: usize>(mut self, scalars: [&'static str; N]) -> Self {
        self.selection
            .extend(scalars.into_iter().map(|s| Selection::Field(Field::new(s))));
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.selection.push(Selection::Field(field));
        self
    }
}

/// A single named query operation, with its variable definitions and fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    operation: &'static str,
    variables: Vec<(&'static str, &'static str)>,
    fields: Vec<Field>,
    fragments: Vec<Fragment>,
}

impl Document {
    pub fn query(operation: &'static str) -> Self {
        Self {
            operation,
            variables: Vec::new(),
            fields: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Declares `$name: ty` on the operation.
    pub fn variable(mut self, name: &'static str, ty: &'static str) -> Self {
        self.variables.push((name, ty));
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn top_level_fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of top-level fields carrying an alias.
    pub fn aliased_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.alias.is_some()).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            let _ = writeln!(out, "fragment {} on {} {{", fragment.name, fragment.on);
            render_selection(&fragment.selection, &mut out, 1);
            out.push_str("}\n");
        }

        let _ = write!(out, "query {}", self.operation);
        if !self.variables.is_empty() {
            out.push('(');
            for (i, (name, ty)) in self.variables.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "${name}: {ty}");
            }
            out.push(')');
        }
        out.push_str(" {\n");
        if self.fields.is_empty() {
            // a selection set may not be empty
            indent(&mut out, 1);
            out.push_str("__typename\n");
        }
        for field in &self.fields {
            field.render(&mut out, 1);
        }
        out.push_str("}\n");
        out
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
