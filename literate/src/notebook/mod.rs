pub mod metadata;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::error::Error;
use crate::sandbox::{MimeBundle, Payload};

pub const FORMAT_MAJOR: u32 = 4;
pub const FORMAT_MINOR: u32 = 2;

/// A notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    pub metadata: Map<String, Value>,
    #[serde(rename = "nbformat")]
    pub format_major: u32,
    #[serde(rename = "nbformat_minor")]
    pub format_minor: u32,
}

/// A notebook cell. Only code cells carry outputs and an execution count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        metadata: Map<String, Value>,
        source: Vec<String>,
    },
    Code {
        execution_count: Option<u64>,
        metadata: Map<String, Value>,
        outputs: Vec<Output>,
        source: Vec<String>,
    },
}

/// One output record of an executed code cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: String,
        text: Vec<String>,
    },
    DisplayData {
        data: Map<String, Value>,
        metadata: Map<String, Value>,
    },
    ExecuteResult {
        execution_count: u64,
        data: Map<String, Value>,
        metadata: Map<String, Value>,
    },
}

impl Notebook {
    /// An empty notebook whose kernel descriptor names `config.language`.
    pub fn new(config: &Config) -> Self {
        let language = &config.language;
        let metadata = json!({
            "kernelspec": {
                "display_name": language,
                "language": language,
                "name": language,
            },
            "language_info": {
                "file_extension": format!(".{}", language),
                "mimetype": format!("text/x-{}", language),
                "name": language,
            },
        });
        Notebook {
            cells: Vec::new(),
            metadata: match metadata {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            format_major: FORMAT_MAJOR,
            format_minor: FORMAT_MINOR,
        }
    }

    /// Serialize with the one-space indentation notebook tools write.
    pub fn to_json(&self) -> Result<String, Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| Error::serialization("notebook", e))?;
        buf.push(b'\n');
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn from_json(source: &str) -> Result<Self, Error> {
        serde_json::from_str(source).map_err(|e| Error::serialization("notebook", e))
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }
}

impl Cell {
    pub fn markdown(source: Vec<String>) -> Self {
        Cell::Markdown {
            metadata: Map::new(),
            source,
        }
    }

    pub fn code(source: Vec<String>) -> Self {
        Cell::Code {
            execution_count: None,
            metadata: Map::new(),
            outputs: Vec::new(),
            source,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Cell::Code { .. })
    }

    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            Cell::Markdown { metadata, .. } => metadata,
            Cell::Code { metadata, .. } => metadata,
        }
    }

    pub fn source(&self) -> &[String] {
        match self {
            Cell::Markdown { source, .. } => source,
            Cell::Code { source, .. } => source,
        }
    }

    pub fn outputs(&self) -> &[Output] {
        match self {
            Cell::Markdown { .. } => &[],
            Cell::Code { outputs, .. } => outputs,
        }
    }
}

/// Split text into lines that keep their trailing newline.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(String::from).collect()
}

/// Join source lines the way notebooks store them: every line but the last
/// ends in a newline.
pub fn source_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = lines.into_iter().map(Into::into).collect();
    let last = out.len().saturating_sub(1);
    for line in &mut out[..last] {
        line.push('\n');
    }
    out
}

/// The `data` map of a display or execute-result record.
pub fn bundle_data(bundle: &MimeBundle) -> Map<String, Value> {
    bundle
        .iter()
        .map(|(mime, payload)| {
            let value = match payload {
                Payload::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
                Payload::Text(text) if mime.is_line_split() => {
                    Value::Array(split_lines(text).into_iter().map(Value::String).collect())
                }
                Payload::Text(text) => Value::String(text.clone()),
            };
            (mime.as_str().to_string(), value)
        })
        .collect()
}
