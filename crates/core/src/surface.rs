//! 編輯區的協作介面。 / Boundary to the rich-text editing surface.

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::format::{ColorTarget, FormatSnapshot, Justify, Modifier, Rgb, DEFAULT_FAMILY};
use crate::node::{NodeId, NodeTree};

/// 編輯區錯誤。 / Failures reported by the editing surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("could not load page {page}: {reason}")]
    Load { page: NodeId, reason: String },
    #[error("could not save page {page}: {reason}")]
    Save { page: NodeId, reason: String },
    #[error("editor command failed: {0}")]
    Command(String),
}

/// Page handed to the editor: identity, title and content file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRef {
    pub id: NodeId,
    pub title: String,
    pub data_file: PathBuf,
}

impl PageRef {
    /// Returns `None` unless `id` names a page in `tree`.
    pub fn resolve(tree: &NodeTree, id: NodeId) -> Option<Self> {
        let node = tree.get(id)?;
        let data_file = tree.data_file_path(id)?;
        Some(Self {
            id,
            title: node.title().to_string(),
            data_file,
        })
    }
}

/// 編輯指令。 / Formatting and insertion commands understood by the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    ToggleModifier(Modifier),
    SetJustify(Justify),
    ToggleBulletList,
    ToggleFontFamily(String),
    SetFontFamily(String),
    SetFontSize(u32),
    /// `None` drops the override and reverts to the document default.
    SetColor(ColorTarget, Option<Rgb>),
    Indent,
    Unindent,
    InsertRule,
    InsertImage { source: PathBuf, save_name: String },
}

/// 編輯區協作者。 / Editing surface the controllers drive.
pub trait EditorSurface {
    /// Shows `pages`; an empty slice clears the editor.
    fn view_pages(&mut self, pages: &[PageRef]) -> Result<(), EditorError>;

    /// Flushes pending edits to the pages' content files.
    fn save(&mut self) -> Result<(), EditorError>;

    fn current_format(&self) -> FormatSnapshot;

    fn apply(&mut self, command: EditorCommand) -> Result<(), EditorError>;

    /// Returns keyboard focus to the text area.
    fn grab_focus(&mut self) {}
}

/// 無介面的編輯區。 / Editor model without a widget: tracks shown pages and
/// the caret format so the controllers can run headless.
#[derive(Debug, Default, Clone)]
pub struct HeadlessEditor {
    pages: Vec<PageRef>,
    format: FormatSnapshot,
    indent: u32,
    inserted: Vec<EditorCommand>,
    saves: usize,
}

impl HeadlessEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PageRef] {
        &self.pages
    }

    pub fn indent_level(&self) -> u32 {
        self.indent
    }

    /// Rules and images inserted so far.
    pub fn inserted(&self) -> &[EditorCommand] {
        &self.inserted
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    /// Moves the caret into text formatted as `format`.
    pub fn set_caret_format(&mut self, format: FormatSnapshot) {
        self.format = format;
    }
}

impl EditorSurface for HeadlessEditor {
    fn view_pages(&mut self, pages: &[PageRef]) -> Result<(), EditorError> {
        self.pages = pages.to_vec();
        debug!(count = pages.len(), "headless editor showing pages");
        Ok(())
    }

    fn save(&mut self) -> Result<(), EditorError> {
        self.saves += 1;
        Ok(())
    }

    fn current_format(&self) -> FormatSnapshot {
        self.format.clone()
    }

    fn apply(&mut self, command: EditorCommand) -> Result<(), EditorError> {
        match command {
            EditorCommand::ToggleModifier(modifier) => {
                let value = !self.format.modifier(modifier);
                self.format.set_modifier(modifier, value);
            }
            EditorCommand::SetJustify(justify) => self.format.justify = justify,
            EditorCommand::ToggleBulletList => self.format.bullet_list = !self.format.bullet_list,
            EditorCommand::ToggleFontFamily(family) => {
                self.format.family = if self.format.family == family {
                    DEFAULT_FAMILY.to_string()
                } else {
                    family
                };
            }
            EditorCommand::SetFontFamily(family) => self.format.family = family,
            EditorCommand::SetFontSize(size) => {
                if size == 0 {
                    return Err(EditorError::Command("font size must be positive".into()));
                }
                self.format.size = size;
            }
            EditorCommand::SetColor(ColorTarget::Foreground, color) => self.format.fg_color = color,
            EditorCommand::SetColor(ColorTarget::Background, color) => self.format.bg_color = color,
            EditorCommand::Indent => self.indent += 1,
            EditorCommand::Unindent => self.indent = self.indent.saturating_sub(1),
            command @ (EditorCommand::InsertRule | EditorCommand::InsertImage { .. }) => {
                self.inserted.push(command)
            }
        }
        Ok(())
    }
}
