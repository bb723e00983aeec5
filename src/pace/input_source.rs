use std::fmt;
use std::fmt::Write;

use super::eval::EvalFrame;

/// 1-based position within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize)]
pub struct InputPosition {
    pub line: u32,
    pub column: u32,
}

impl InputPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for InputPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SrcSpan {
    pub begin: InputPosition,
    pub end: InputPosition,
}

impl SrcSpan {
    #[inline]
    pub fn from_positions(begin: InputPosition, end: InputPosition) -> Self {
        Self { begin, end }
    }

    /// Smallest span covering both spans.
    pub fn merge(self, other: SrcSpan) -> SrcSpan {
        SrcSpan {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

/// The source text a token stream was produced from. Only used to print the
/// surrounding lines of an error, none of the pipeline stages need it.
#[derive(Debug, Clone)]
pub struct InputSource {
    pub filename: String,
    lines: Vec<String>,
}

impl InputSource {
    pub fn new(filename: String, text: &str) -> Self {
        Self { filename, lines: text.lines().map(|l| l.to_string()).collect() }
    }

    pub fn line(&self, line_number: u32) -> Option<&str> {
        if line_number == 0 {
            return None;
        }
        self.lines.get(line_number as usize - 1).map(|l| l.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorKind {
    #[display(fmt = "LexError")]
    Lex,
    #[display(fmt = "GroupingError")]
    Grouping,
    #[display(fmt = "UnknownNameError")]
    UnknownName,
    #[display(fmt = "ScopeAccessError")]
    ScopeAccess,
    #[display(fmt = "IncompatibleTypesError")]
    IncompatibleTypes,
    #[display(fmt = "AmbiguousOverloadError")]
    AmbiguousOverload,
    #[display(fmt = "UnknownOverloadError")]
    UnknownOverload,
    #[display(fmt = "ModuleImportError")]
    ModuleImport,
    #[display(fmt = "SentenceError")]
    Sentence,
    #[display(fmt = "RuntimeError")]
    Runtime,
    #[display(fmt = "InternalError")]
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct ErrorStatement {
    pub statement_kind: StatementKind,
    pub span: SrcSpan,
    pub message: String,
}

impl ErrorStatement {
    fn write_header(&self, f: &mut dyn Write, filename: &str) -> fmt::Result {
        match self.statement_kind {
            StatementKind::Info => f.write_str(" INFO: ")?,
            StatementKind::Error => f.write_str("ERROR: ")?,
        }
        f.write_str(&self.message)?;
        f.write_char('\n')?;

        f.write_str(" +- ")?;
        if !filename.is_empty() {
            write!(f, "in {} ", filename)?;
        }
        if self.span.begin.line == self.span.end.line {
            writeln!(f, "at {}", self.span.begin)
        } else {
            writeln!(f, "from {} to {}", self.span.begin, self.span.end)
        }
    }

    fn write_context(&self, f: &mut dyn Write, source: &InputSource) -> fmt::Result {
        writeln!(f, " | ")?;
        let first = self.span.begin.line;
        let last = self.span.end.line.max(first);
        for line_number in first..=last {
            if let Some(line) = source.line(line_number) {
                writeln!(f, " |  {}", line.replace('\t', "    "))?;
            }
        }

        // Underline the span on its first line
        if let Some(line) = source.line(first) {
            let start = self.span.begin.column.max(1) as usize;
            let end = if first == self.span.end.line {
                (self.span.end.column as usize).max(start + 1)
            } else {
                line.chars().count() + 1
            };
            let mut annotation = String::from(" |  ");
            for _ in 1..start {
                annotation.push(' ');
            }
            for _ in start..end {
                annotation.push('~');
            }
            writeln!(f, "{}", annotation)?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(f, "")
    }
}

/// Every failure of the pipeline. The first statement is the error itself,
/// following statements are informational (e.g. where a bracket was opened).
/// Failures during execution also carry the call frames that were active.
#[derive(Debug, Clone)]
pub struct CoreError {
    pub kind: ErrorKind,
    pub statements: Vec<ErrorStatement>,
    pub frames: Vec<EvalFrame>,
    pub backtrace: Option<String>,
}

impl CoreError {
    pub fn new<S: ToString>(kind: ErrorKind, span: SrcSpan, message: S) -> Self {
        Self {
            kind,
            statements: vec![ErrorStatement {
                statement_kind: StatementKind::Error,
                span,
                message: message.to_string(),
            }],
            frames: Vec::new(),
            backtrace: None,
        }
    }

    /// Programmer error inside the pipeline itself. Debug builds capture where
    /// it was raised.
    pub fn internal<S: ToString>(span: SrcSpan, message: S) -> Self {
        let mut error = Self::new(ErrorKind::Internal, span, message);
        if cfg!(debug_assertions) {
            error.backtrace = Some(format!("{:?}", backtrace::Backtrace::new()));
        }
        error
    }

    pub fn with_info<S: ToString>(mut self, span: SrcSpan, message: S) -> Self {
        self.statements.push(ErrorStatement {
            statement_kind: StatementKind::Info,
            span,
            message: message.to_string(),
        });
        self
    }

    pub fn with_frames(mut self, frames: Vec<EvalFrame>) -> Self {
        if self.frames.is_empty() {
            self.frames = frames;
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.statements[0].message
    }

    pub fn span(&self) -> SrcSpan {
        self.statements[0].span
    }

    /// Full report including the offending source lines.
    pub fn render(&self, source: &InputSource) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}: ", self.kind);
        for (idx, statement) in self.statements.iter().enumerate() {
            if idx != 0 {
                out.push('\n');
            }
            let _ = statement.write_header(&mut out, &source.filename);
            let _ = statement.write_context(&mut out, source);
        }
        self.write_frames(&mut out);
        out
    }

    fn write_frames(&self, f: &mut dyn Write) {
        if self.frames.is_empty() {
            return;
        }
        let _ = writeln!(f);
        let _ = writeln!(f, " +-  Stack trace:");
        for frame in self.frames.iter().rev() {
            let _ = writeln!(f, " | {}", frame);
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind)?;
        self.statements[0].fmt(f)?;
        for statement in self.statements.iter().skip(1) {
            writeln!(f)?;
            statement.fmt(f)?;
        }
        let mut frames = String::new();
        self.write_frames(&mut frames);
        f.write_str(&frames)
    }
}

impl std::error::Error for CoreError {}
