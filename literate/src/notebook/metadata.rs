use serde_json::{Map, Value};

use crate::error::Error;

/// Sentinel opening a cell metadata line.
pub const SENTINEL: &str = "%%";

/// Cell type declared by a `[markdown]` / `[code]` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Markdown,
    Code,
}

impl CellKind {
    fn as_str(self) -> &'static str {
        match self {
            CellKind::Markdown => "markdown",
            CellKind::Code => "code",
        }
    }
}

/// A parsed `%% label [kind] {json}` line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellMetadata {
    pub label: Option<String>,
    pub kind: Option<CellKind>,
    pub data: Map<String, Value>,
}

impl CellMetadata {
    /// Fail when the declared kind disagrees with the chunk the line heads.
    pub fn check_kind(&self, actual: CellKind) -> Result<(), Error> {
        match self.kind {
            Some(declared) if declared != actual => Err(Error::configuration(format!(
                "cell declared as [{}] but its content is {}",
                declared.as_str(),
                actual.as_str()
            ))),
            _ => Ok(()),
        }
    }
}

/// Parse `line` as a metadata line. `None` when it does not start with the
/// sentinel; an error when the type tag or JSON payload is malformed.
pub fn parse(line: &str) -> Option<Result<CellMetadata, Error>> {
    let rest = line.trim_start().strip_prefix(SENTINEL)?;
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }
    Some(parse_body(rest.trim()))
}

fn parse_body(body: &str) -> Result<CellMetadata, Error> {
    let (head, payload) = match body.find('{') {
        Some(i) => (body[..i].trim(), Some(body[i..].trim())),
        None => (body, None),
    };

    let (label, kind) = match head.find('[') {
        Some(open) => {
            let close = head[open..].find(']').map(|i| open + i).ok_or_else(|| {
                Error::configuration(format!("unclosed cell type tag in '{}'", head))
            })?;
            let kind = match &head[open + 1..close] {
                "markdown" => CellKind::Markdown,
                "code" => CellKind::Code,
                other => {
                    return Err(Error::configuration(format!(
                        "unknown cell type [{}], expected [markdown] or [code]",
                        other
                    )));
                }
            };
            (head[..open].trim(), Some(kind))
        }
        None => (head, None),
    };

    let data = match payload {
        Some(json) => serde_json::from_str::<Map<String, Value>>(json)
            .map_err(|e| Error::serialization(format!("cell metadata '{}'", json), e))?,
        None => Map::new(),
    };

    Ok(CellMetadata {
        label: (!label.is_empty()).then(|| label.to_string()),
        kind,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ignores_ordinary_lines() {
        assert!(parse("x = 1").is_none());
        assert!(parse("%%%").is_none());
        assert!(parse("100%% done").is_none());
    }

    #[test]
    fn parses_every_part() {
        let meta = parse(r#"%% Setup cell [code] {"tags": ["hide"]}"#).unwrap().unwrap();
        assert_eq!(meta.label.as_deref(), Some("Setup cell"));
        assert_eq!(meta.kind, Some(CellKind::Code));
        assert_eq!(meta.data["tags"], json!(["hide"]));
    }

    #[test]
    fn parts_are_optional() {
        let meta = parse("%%").unwrap().unwrap();
        assert_eq!(meta, CellMetadata::default());

        let meta = parse(r#"%% {"slideshow": {"slide_type": "slide"}}"#).unwrap().unwrap();
        assert_eq!(meta.label, None);
        assert_eq!(meta.kind, None);
        assert_eq!(meta.data["slideshow"]["slide_type"], json!("slide"));

        let meta = parse("%% [markdown]").unwrap().unwrap();
        assert_eq!(meta.kind, Some(CellKind::Markdown));
    }

    #[test]
    fn malformed_payload_is_a_serialization_error() {
        let err = parse("%% {not json}").unwrap().unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn unknown_kind_is_a_configuration_error() {
        let err = parse("%% [raw]").unwrap().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn kind_conflict() {
        let meta = parse("%% [code]").unwrap().unwrap();
        assert!(meta.check_kind(CellKind::Code).is_ok());
        assert!(meta.check_kind(CellKind::Markdown).is_err());
    }
}
