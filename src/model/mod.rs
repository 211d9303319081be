use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form mapping carried by tabular records. Insertion order is kept so
/// column order survives a conversion.
pub type Fields = Map<String, Value>;

const TYPE_KEY: &str = "type";
const CONTENT_KEY: &str = "content";
const TEXT_KEY: &str = "text";

/// One entry of the intermediate representation every handler reads into and
/// writes from.
///
/// Handlers pattern-match on the variant they understand and fall back to
/// [`Record::content`] for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Record {
    /// Running text, optionally tied to the page it was extracted from.
    Text { content: String, page: Option<u32> },
    /// A document paragraph with its position and style identifier.
    Paragraph {
        content: String,
        number: Option<u32>,
        style: Option<String>,
    },
    /// A grid of cells.
    Table {
        rows: Vec<Vec<String>>,
        number: Option<u32>,
    },
    /// The text of one presentation slide.
    Slide { content: String, number: Option<u32> },
    /// A titled section of an e-book.
    Chapter {
        title: Option<String>,
        content: String,
    },
    /// Descriptive information about the source document.
    Metadata {
        title: Option<String>,
        author: Option<String>,
    },
    /// A heterogeneous mapping, typically one row of tabular data.
    Row(Fields),
    /// Anything that has no structured counterpart, kept as a string.
    Opaque(String),
}

impl Record {
    /// Creates a plain text record.
    pub fn text(content: impl Into<String>) -> Self {
        Record::Text {
            content: content.into(),
            page: None,
        }
    }

    /// Creates a row from string pairs.
    pub fn row<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Record::Row(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Tag used for the record in its JSON representation.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Text { .. } => "text",
            Record::Paragraph { .. } => "paragraph",
            Record::Table { .. } => "table",
            Record::Slide { .. } => "slide",
            Record::Chapter { .. } => "chapter",
            Record::Metadata { .. } => "metadata",
            Record::Row(_) => "row",
            Record::Opaque(_) => "opaque",
        }
    }

    /// Returns the recognized text of the record.
    ///
    /// Rows expose their `content` key, then their `text` key, and otherwise
    /// a compact JSON rendering of the whole mapping.
    pub fn content(&self) -> Cow<'_, str> {
        match self {
            Record::Text { content, .. }
            | Record::Paragraph { content, .. }
            | Record::Slide { content, .. } => Cow::Borrowed(content),
            Record::Chapter { title, content } => match title {
                Some(title) => Cow::Owned(format!("{title}\n\n{content}")),
                None => Cow::Borrowed(content),
            },
            Record::Table { rows, .. } => Cow::Owned(
                rows.iter()
                    .map(|row| row.join("\t"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Record::Metadata { title, author } => Cow::Owned(format!(
                "Title: {}\nAuthor: {}",
                title.as_deref().unwrap_or("Unknown"),
                author.as_deref().unwrap_or("Unknown")
            )),
            Record::Row(fields) => match fields.get(CONTENT_KEY).or_else(|| fields.get(TEXT_KEY)) {
                Some(value) => value_to_text(value),
                None => Cow::Owned(Value::Object(fields.clone()).to_string()),
            },
            Record::Opaque(value) => Cow::Borrowed(value),
        }
    }

    /// Flattens the record into a JSON object. Rows are returned as-is;
    /// every other variant carries a `type` tag first.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(TYPE_KEY.into(), Value::from(self.kind()));
        match self {
            Record::Text { content, page } => {
                insert_number(&mut fields, "page", *page);
                fields.insert(CONTENT_KEY.into(), Value::from(content.as_str()));
            }
            Record::Paragraph {
                content,
                number,
                style,
            } => {
                insert_number(&mut fields, "number", *number);
                fields.insert(CONTENT_KEY.into(), Value::from(content.as_str()));
                if let Some(style) = style {
                    fields.insert("style".into(), Value::from(style.as_str()));
                }
            }
            Record::Table { rows, number } => {
                insert_number(&mut fields, "number", *number);
                let grid = rows
                    .iter()
                    .map(|row| Value::Array(row.iter().map(|cell| Value::from(cell.as_str())).collect()))
                    .collect();
                fields.insert(CONTENT_KEY.into(), Value::Array(grid));
                fields.insert("rows".into(), Value::from(rows.len()));
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                fields.insert("columns".into(), Value::from(columns));
            }
            Record::Slide { content, number } => {
                insert_number(&mut fields, "number", *number);
                fields.insert(CONTENT_KEY.into(), Value::from(content.as_str()));
            }
            Record::Chapter { title, content } => {
                if let Some(title) = title {
                    fields.insert("title".into(), Value::from(title.as_str()));
                }
                fields.insert(CONTENT_KEY.into(), Value::from(content.as_str()));
            }
            Record::Metadata { title, author } => {
                if let Some(title) = title {
                    fields.insert("title".into(), Value::from(title.as_str()));
                }
                if let Some(author) = author {
                    fields.insert("author".into(), Value::from(author.as_str()));
                }
                fields.insert(CONTENT_KEY.into(), Value::from(self.content().into_owned()));
            }
            Record::Opaque(value) => {
                fields.insert(CONTENT_KEY.into(), Value::from(value.as_str()));
            }
            Record::Row(row) => return row.clone(),
        }
        fields
    }

    /// Rebuilds a record from a JSON object.
    ///
    /// An object becomes a typed variant only when the variant reproduces it
    /// exactly: a recognized `type` tag, no keys outside the variant's fields,
    /// values of the expected types, in the variant's key order. Anything
    /// else is kept whole as a [`Record::Row`].
    pub fn from_fields(fields: Fields) -> Self {
        match parse_tagged(&fields).filter(|record| reproduces(record, &fields)) {
            Some(record) => record,
            None => Record::Row(fields),
        }
    }

    /// Converts the record into its JSON representation.
    pub fn to_json(&self) -> Value {
        Value::Object(self.to_fields())
    }

    /// Converts any JSON value into a record. Non-object values become
    /// [`Record::Opaque`].
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Record::from_fields(fields),
            Value::String(value) => Record::Opaque(value),
            other => Record::Opaque(other.to_string()),
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record::from_json(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.to_json()
    }
}

fn parse_tagged(fields: &Fields) -> Option<Record> {
    let kind = fields.get(TYPE_KEY)?.as_str()?;
    let content = fields.get(CONTENT_KEY);
    let text = || content.and_then(Value::as_str).map(str::to_string);

    let record = match kind {
        "text" => Record::Text {
            content: text()?,
            page: get_number(fields, "page"),
        },
        "paragraph" => Record::Paragraph {
            content: text()?,
            number: get_number(fields, "number"),
            style: get_string(fields, "style"),
        },
        "table" => Record::Table {
            rows: parse_grid(content?)?,
            number: get_number(fields, "number"),
        },
        "slide" => Record::Slide {
            content: text()?,
            number: get_number(fields, "number"),
        },
        "chapter" => Record::Chapter {
            title: get_string(fields, "title"),
            content: text()?,
        },
        "metadata" => Record::Metadata {
            title: get_string(fields, "title"),
            author: get_string(fields, "author"),
        },
        "opaque" => Record::Opaque(text()?),
        _ => return None,
    };
    Some(record)
}

/// Whether writing `record` back out yields every entry of `fields`, in the
/// same relative order. Derived keys (table dimensions, metadata content) may
/// be absent from `fields` but must match when present.
fn reproduces(record: &Record, fields: &Fields) -> bool {
    let regenerated = record.to_fields();
    let mut canonical = regenerated.iter();
    fields
        .iter()
        .all(|(key, value)| canonical.any(|(other_key, other_value)| other_key == key && other_value == value))
}

fn parse_grid(value: &Value) -> Option<Vec<Vec<String>>> {
    value
        .as_array()?
        .iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(|cell| value_to_text(cell).into_owned()).collect())
        })
        .collect()
}

fn get_number(fields: &Fields, key: &str) -> Option<u32> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
}

fn get_string(fields: &Fields, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn insert_number(fields: &mut Fields, key: &str, value: Option<u32>) {
    if let Some(value) = value {
        fields.insert(key.into(), Value::from(value));
    }
}

/// Renders a JSON value as cell or paragraph text: strings verbatim, `null`
/// as the empty string, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(value) => Cow::Borrowed(value),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}
