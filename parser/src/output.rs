//! Format-dispatching parser facade over captured output.

use rosacli_core::{CapturedOutput, OutputFormat};

use crate::description::reflect_description;
use crate::table::TableRow;
use crate::text::{ParsedText, TextRules};
use crate::tree::Tree;

/// Captured output parsed according to its declared format.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    Text(ParsedText),
    Tree(Tree),
}

impl ParsedOutput {
    pub fn as_text(&self) -> Option<&ParsedText> {
        match self {
            ParsedOutput::Text(text) => Some(text),
            ParsedOutput::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            ParsedOutput::Tree(tree) => Some(tree),
            ParsedOutput::Text(_) => None,
        }
    }
}

/// Parses [`CapturedOutput`] buffers.
///
/// The declared format of the buffer decides the parse; the content is never
/// sniffed. Every entry point degrades to empty structures on malformed input.
///
/// # Examples
///
/// ```
/// use rosacli_core::{CapturedOutput, OutputFormat};
/// use rosacli_parser::Parser;
///
/// let parser = Parser::default();
/// let json = CapturedOutput::new(br#"{"state":"ready"}"#.to_vec(), OutputFormat::Json);
/// assert_eq!(parser.tree(&json).dig_string(["state"]), "ready");
///
/// let text = CapturedOutput::text("INFO: done\nID   STATE\nc1   ready\n");
/// assert_eq!(parser.text(&text).tip(), "INFO: done");
/// assert_eq!(parser.table(&text)[0].get("STATE"), Some("ready"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    rules: TextRules,
}

impl Parser {
    pub fn new(rules: TextRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TextRules {
        &self.rules
    }

    pub fn parse(&self, output: &CapturedOutput) -> ParsedOutput {
        match output.format() {
            OutputFormat::Text => ParsedOutput::Text(self.text(output)),
            format => ParsedOutput::Tree(Tree::parse(output.as_bytes(), format)),
        }
    }

    /// Splits the buffer into Tip and Output, whatever its declared format.
    pub fn text(&self, output: &CapturedOutput) -> ParsedText {
        ParsedText::parse_with(&output.to_text(), &self.rules)
    }

    /// Table rows of the Output region.
    pub fn table(&self, output: &CapturedOutput) -> Vec<TableRow> {
        self.text(output).table()
    }

    /// Description tree of the Output region.
    pub fn description(&self, output: &CapturedOutput) -> Tree {
        reflect_description(&self.text(output).output())
    }

    /// Tree for JSON/YAML output; `Null` for text or malformed input.
    pub fn tree(&self, output: &CapturedOutput) -> Tree {
        Tree::parse(output.as_bytes(), output.format())
    }
}
