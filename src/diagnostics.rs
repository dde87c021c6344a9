use crate::error::ConfigError;
use crate::utils::LineRange;
use miette::{LabeledSpan, NamedSource, SourceCode, SourceSpan};
use std::fmt::{self, Display};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The text of a configuration document, shared by every location that points into it.
#[derive(Debug)]
pub struct SourceFile {
    name: Option<String>,
    text: String,
    named: NamedSource<String>,
}

impl SourceFile {
    pub fn new(name: Option<String>, text: String) -> Self {
        let named = NamedSource::new(
            name.clone().unwrap_or_else(|| "<config>".to_string()),
            text.clone(),
        );
        SourceFile { name, text, named }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds the location of the byte range `start..end` within this file.
    pub fn location(self: &Arc<Self>, start: usize, end: usize) -> Location {
        Location {
            range: LineRange::from_offsets(&self.text, start, end),
            span: (start, end.saturating_sub(start)).into(),
            source: Arc::clone(self),
        }
    }
}

/// Where a diagnostic points: a range inside a named (or anonymous) source document.
#[derive(Debug, Clone)]
pub struct Location {
    pub range: LineRange,
    pub span: SourceSpan,
    source: Arc<SourceFile>,
}

impl Location {
    pub fn file(&self) -> Option<&str> {
        self.source.name()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file() {
            Some(file) => write!(f, "[{}:{}]", file, self.range),
            None => write!(f, "[{}]", self.range),
        }
    }
}

/// A single reported problem.
///
/// `Display` renders the compact one-line form used by command line output and
/// tests, e.g. `error: [Config.toml:(2:10,2:14)] configurable variable 'intVar' ...`.
/// The `miette::Diagnostic` implementation exposes the same data for graphical
/// reports.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: ConfigError,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(error: ConfigError, location: Option<Location>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            error,
            location,
        }
    }

    pub fn warning(error: ConfigError, location: Option<Location>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            error,
            location,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(location) = &self.location {
            write!(f, "{location} ")?;
        }
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for Diagnostic {}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        miette::Diagnostic::code(&self.error)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        miette::Diagnostic::help(&self.error)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.location
            .as_ref()
            .map(|location| &location.source.named as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let location = self.location.as_ref()?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.severity.to_string()),
            location.span,
        ))))
    }
}

/// Append-only, insertion ordered collection of diagnostics for one resolution run.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => log::debug!("configuration error: {diagnostic}"),
            Severity::Warning => log::debug!("configuration warning: {diagnostic}"),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, error: ConfigError, location: Option<Location>) {
        self.push(Diagnostic::error(error, location));
    }

    pub fn warn(&mut self, error: ConfigError, location: Option<Location>) {
        self.push(Diagnostic::warning(error, location));
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}
