use std::collections::BTreeMap;

/// Render kinds understood by the emitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mime {
    Png,
    Jpeg,
    Svg,
    Markdown,
    Html,
    Plain,
}

impl Mime {
    pub const ALL: [Mime; 6] = [
        Mime::Png,
        Mime::Jpeg,
        Mime::Svg,
        Mime::Markdown,
        Mime::Html,
        Mime::Plain,
    ];

    /// Image kinds in the order the markdown target prefers them.
    pub const IMAGES: [Mime; 3] = [Mime::Png, Mime::Jpeg, Mime::Svg];

    pub fn as_str(self) -> &'static str {
        match self {
            Mime::Png => "image/png",
            Mime::Jpeg => "image/jpeg",
            Mime::Svg => "image/svg+xml",
            Mime::Markdown => "text/markdown",
            Mime::Html => "text/html",
            Mime::Plain => "text/plain",
        }
    }

    /// File extension for kinds written to side-car files.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Mime::Png => Some(".png"),
            Mime::Jpeg => Some(".jpeg"),
            Mime::Svg => Some(".svg"),
            _ => None,
        }
    }

    /// Notebook readers expect these as lists of lines rather than one string.
    pub fn is_line_split(self) -> bool {
        matches!(self, Mime::Svg | Mime::Markdown | Mime::Html)
    }
}

/// A rendered representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }
}

/// Every representation of one value, keyed by render kind.
pub type MimeBundle = BTreeMap<Mime, Payload>;

/// A value the engine can render. Classification asks for specific kinds
/// in priority order; `None` means "not showable that way".
pub trait Showable {
    fn show(&self, mime: Mime) -> Option<Payload>;

    fn mime_bundle(&self) -> MimeBundle {
        Mime::ALL
            .iter()
            .filter_map(|&mime| self.show(mime).map(|payload| (mime, payload)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct Everything;

    impl Showable for Everything {
        fn show(&self, mime: Mime) -> Option<Payload> {
            Some(Payload::Text(mime.as_str().to_string()))
        }
    }

    #[test]
    fn bundle_covers_every_kind_once() {
        let bundle = Everything.mime_bundle();
        assert_eq!(bundle.len(), Mime::ALL.len());
        let types: BTreeSet<_> = bundle.keys().map(|mime| mime.as_str()).collect();
        assert_eq!(types.len(), Mime::ALL.len());
        assert!(!types.contains("text/latex"));
    }

    #[test]
    fn only_text_documents_are_line_split() {
        let split: Vec<_> = Mime::ALL.into_iter().filter(|m| m.is_line_split()).collect();
        assert_eq!(split, vec![Mime::Svg, Mime::Markdown, Mime::Html]);
        assert!(Mime::IMAGES.iter().all(|m| m.extension().is_some()));
    }
}
