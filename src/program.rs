//! Line buffers the posts render into.
//!
//! [`ProgramBuffer`] is the plain append-only list of lines with indentation. Controllers that
//! keep positions in a separate section of the file (Fanuc `/POS`, Motoman `//POS`) and cannot
//! load arbitrarily long programs use [`PagedProgram`]: instruction lines and target
//! definitions are collected per [`Page`], and a new page is opened once the current one reaches
//! the line limit. Each page becomes its own file; the program itself then only calls its
//! pages in order.

use tracing::{debug, info};

use crate::post_error::PostError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramBuffer {
    lines: Vec<String>,
    indent: usize,
    tab: String,
}

impl ProgramBuffer {
    /// Empty buffer indenting nested blocks with `tab`.
    pub fn new(tab: &str) -> Self {
        ProgramBuffer { lines: Vec::new(), indent: 0, tab: tab.to_string() }
    }

    /// Appends a line at the current indentation.
    pub fn push(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", self.tab.repeat(self.indent), line));
        }
    }

    /// Appends a line ignoring indentation.
    pub fn push_raw(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Appends every line of a multi-line text at the current indentation.
    pub fn push_block(&mut self, text: &str) {
        for line in text.lines() {
            self.push(line);
        }
    }

    pub fn extend(&mut self, other: &ProgramBuffer) {
        self.lines.extend(other.lines.iter().cloned());
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines joined, with a final newline.
    pub fn text(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// One file of a paginated program: instructions plus the targets they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<String>,
    pub targets: Vec<String>,
    /// Targets defined on this page; target numbering restarts on every page.
    pub target_count: usize,
}

impl Page {
    /// Reserves the next target number (0 based).
    pub fn next_target(&mut self) -> usize {
        let id = self.target_count;
        self.target_count += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagedProgram {
    pub name: String,
    pages: Vec<Page>,
    /// 0 disables pagination
    max_lines: usize,
}

impl PagedProgram {
    pub fn new(name: &str, max_lines: usize) -> Self {
        PagedProgram { name: name.to_string(), pages: vec![Page::default()], max_lines }
    }

    pub fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// True if the current page has reached the line limit and the next instruction
    /// (taking `lines` lines) must go to a fresh page.
    pub fn is_full(&self, lines: usize) -> bool {
        let current = self.pages[self.pages.len() - 1].lines.len();
        self.max_lines > 0 && current > 0 && current + lines > self.max_lines
    }

    /// Opens a new page and returns its 1 based number.
    pub fn new_page(&mut self) -> usize {
        self.pages.push(Page::default());
        debug!("{}: page {} started", self.name, self.pages.len());
        self.pages.len()
    }

    pub fn is_split(&self) -> bool {
        self.pages.len() > 1
    }

    /// Name of the file holding page `index` (0 based). Unsplit programs keep their name.
    pub fn page_name(&self, index: usize) -> String {
        if self.is_split() {
            page_name(&self.name, index)
        } else {
            self.name.clone()
        }
    }

    /// Names of all page files, in call order.
    pub fn page_names(&self) -> Vec<String> {
        (0..self.pages.len()).map(|i| self.page_name(i)).collect()
    }
}

/// Naming scheme of pages: PROGRAM_1, PROGRAM_2, ...
pub fn page_name(program: &str, index: usize) -> String {
    format!("{}_{}", program, index + 1)
}

/// Keeps track of which program is open, so that out of order calls fail early.
#[derive(Debug, Clone, Default)]
pub struct ProgramTracker {
    open: Option<String>,
    started: Vec<String>,
    /// (program, page) for every program that was split into pages
    split: Vec<(String, String)>,
}

impl ProgramTracker {
    /// Opens `name` (already sanitized).
    pub fn start(&mut self, name: &str) -> Result<(), PostError> {
        if let Some(open) = &self.open {
            return Err(PostError::ProgramMismatch { expected: Some(open.clone()), found: name.to_string() });
        }
        if let Some((program, page)) = self.split.iter().find(|(program, page)| program == name || page == name) {
            return Err(PostError::AlreadySplit { program: program.clone(), page: page.clone() });
        }
        info!("Program {} started", name);
        self.open = Some(name.to_string());
        self.started.push(name.to_string());
        Ok(())
    }

    /// Closes `name`, which must be the open program.
    pub fn finish(&mut self, name: &str) -> Result<String, PostError> {
        match self.open.take() {
            Some(open) if open == name => Ok(open),
            other => {
                let expected = other.clone();
                self.open = other;
                Err(PostError::ProgramMismatch { expected, found: name.to_string() })
            }
        }
    }

    /// Name of the open program, `NoProgram` if there is none.
    pub fn current(&self, instruction: &'static str) -> Result<&str, PostError> {
        self.open.as_deref().ok_or(PostError::NoProgram { instruction })
    }

    /// `Unfinished` while a program is still open.
    pub fn check_finished(&self) -> Result<(), PostError> {
        match &self.open {
            Some(program) => Err(PostError::Unfinished { program: program.clone() }),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The first program started, which becomes the main program.
    pub fn main(&self) -> Option<&str> {
        self.started.first().map(String::as_str)
    }

    /// True while the main program is the open one.
    pub fn in_main(&self) -> bool {
        self.open.is_some() && self.open.as_deref() == self.main()
    }

    /// Records the pages of a program that was split.
    pub fn register_split(&mut self, program: &PagedProgram) {
        if program.is_split() {
            for page in program.page_names() {
                self.split.push((program.name.clone(), page));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_indentation() {
        let mut b = ProgramBuffer::new("  ");
        b.push("DEF main()");
        b.indent();
        b.push("PTP HOME");
        b.push("");
        b.dedent();
        b.dedent();
        b.push("END");
        assert_eq!(b.text(), "DEF main()\n  PTP HOME\n\nEND\n");
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_pagination() {
        let mut p = PagedProgram::new("MAIN", 3);
        for i in 0..3 {
            assert!(!p.is_full(1));
            p.page().lines.push(format!("line {}", i));
        }
        assert!(p.is_full(1));
        assert_eq!(p.page_name(0), "MAIN");
        assert_eq!(p.new_page(), 2);
        assert!(p.is_split());
        assert_eq!(p.page_names(), vec!["MAIN_1", "MAIN_2"]);
        assert_eq!(p.page().next_target(), 0);
        assert_eq!(p.page().next_target(), 1);
    }

    #[test]
    fn test_tracker_order() {
        let mut t = ProgramTracker::default();
        assert!(matches!(t.current("MoveJ"), Err(PostError::NoProgram { instruction: "MoveJ" })));
        t.start("MAIN").unwrap();
        assert!(t.in_main());
        assert!(matches!(t.start("SUB"), Err(PostError::ProgramMismatch { .. })));
        assert!(matches!(t.finish("SUB"), Err(PostError::ProgramMismatch { .. })));
        assert_eq!(t.current("MoveJ").unwrap(), "MAIN");
        assert_eq!(t.finish("MAIN").unwrap(), "MAIN");
        assert!(!t.is_open());
        assert!(matches!(t.finish("MAIN"), Err(PostError::ProgramMismatch { expected: None, .. })));
        t.start("SUB").unwrap();
        assert!(!t.in_main());
        assert_eq!(t.main(), Some("MAIN"));
    }

    #[test]
    fn test_tracker_rejects_page_names() {
        let mut t = ProgramTracker::default();
        let mut p = PagedProgram::new("MAIN", 1);
        p.page().lines.push("x".into());
        p.new_page();
        t.start("MAIN").unwrap();
        t.finish("MAIN").unwrap();
        t.register_split(&p);
        assert!(matches!(t.start("MAIN_2"), Err(PostError::AlreadySplit { .. })));
        assert!(matches!(t.start("MAIN"), Err(PostError::AlreadySplit { .. })));
        assert!(t.start("MAIN_3").is_ok());
    }

    #[test]
    fn test_pagination_disabled() {
        let mut p = PagedProgram::new("MAIN", 0);
        for _ in 0..10_000 {
            p.page().lines.push(String::new());
        }
        assert!(!p.is_full(1));
    }
}
