//! 格式狀態鏡像。 / Keeps toolbar and menu format controls in step with the
//! caret formatting of the editor.
//!
//! Every bound control owns one subscription in the mirror's signal
//! registry; that subscription is the control's "changed" handler. Pushing
//! editor state into the controls suspends all of those handlers first, so
//! a programmatic update never echoes back into the editor as a command.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::format::{
    decreased_font_size, increased_font_size, ColorTarget, FormatSnapshot, Justify, Modifier, Rgb,
    MONOSPACE_FAMILY,
};
use crate::observer::{Registry, SubscriptionId};
use crate::surface::{EditorCommand, EditorSurface};

/// 格式控制項識別碼。 / Identifies one format-display control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    Bold,
    Italic,
    Underline,
    Monospace,
    NoWrap,
    JustifyLeft,
    JustifyCenter,
    JustifyRight,
    JustifyFill,
    BulletList,
    FontFamily,
    FontSize,
}

impl ControlId {
    pub const ALL: [ControlId; 12] = [
        ControlId::Bold,
        ControlId::Italic,
        ControlId::Underline,
        ControlId::Monospace,
        ControlId::NoWrap,
        ControlId::JustifyLeft,
        ControlId::JustifyCenter,
        ControlId::JustifyRight,
        ControlId::JustifyFill,
        ControlId::BulletList,
        ControlId::FontFamily,
        ControlId::FontSize,
    ];

    /// The value this control shows for `snapshot`.
    pub fn project(self, snapshot: &FormatSnapshot) -> ControlValue {
        match self {
            ControlId::Bold => ControlValue::Toggle(snapshot.bold),
            ControlId::Italic => ControlValue::Toggle(snapshot.italic),
            ControlId::Underline => ControlValue::Toggle(snapshot.underline),
            ControlId::Monospace => ControlValue::Toggle(snapshot.is_monospace()),
            ControlId::NoWrap => ControlValue::Toggle(snapshot.nowrap),
            ControlId::JustifyLeft => ControlValue::Toggle(snapshot.justify == Justify::Left),
            ControlId::JustifyCenter => ControlValue::Toggle(snapshot.justify == Justify::Center),
            ControlId::JustifyRight => ControlValue::Toggle(snapshot.justify == Justify::Right),
            ControlId::JustifyFill => ControlValue::Toggle(snapshot.justify == Justify::Fill),
            ControlId::BulletList => ControlValue::Toggle(snapshot.bullet_list),
            ControlId::FontFamily => ControlValue::Family(snapshot.family.clone()),
            ControlId::FontSize => ControlValue::Size(snapshot.size),
        }
    }

    fn modifier(self) -> Option<Modifier> {
        match self {
            ControlId::Bold => Some(Modifier::Bold),
            ControlId::Italic => Some(Modifier::Italic),
            ControlId::Underline => Some(Modifier::Underline),
            ControlId::NoWrap => Some(Modifier::NoWrap),
            _ => None,
        }
    }

    fn justify(self) -> Option<Justify> {
        match self {
            ControlId::JustifyLeft => Some(Justify::Left),
            ControlId::JustifyCenter => Some(Justify::Center),
            ControlId::JustifyRight => Some(Justify::Right),
            ControlId::JustifyFill => Some(Justify::Fill),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlValue {
    Toggle(bool),
    Family(String),
    Size(u32),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Toggle(on) => write!(f, "{}", if *on { "on" } else { "off" }),
            ControlValue::Family(family) => f.write_str(family),
            ControlValue::Size(size) => write!(f, "{size}"),
        }
    }
}

/// "Changed" notification of one control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlChange {
    pub id: ControlId,
    pub value: ControlValue,
}

/// 格式控制項。 / A widget that displays one formatting attribute.
pub trait FormatControl {
    fn id(&self) -> ControlId;

    /// Stores `value`, returning whether the shown value changed.
    fn set(&mut self, value: ControlValue) -> bool;

    fn read(&self) -> ControlValue;
}

/// Plain in-memory control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlState {
    id: ControlId,
    value: ControlValue,
}

impl ControlState {
    pub fn new(id: ControlId) -> Self {
        Self {
            id,
            value: id.project(&FormatSnapshot::default()),
        }
    }
}

impl FormatControl for ControlState {
    fn id(&self) -> ControlId {
        self.id
    }

    fn set(&mut self, value: ControlValue) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    fn read(&self) -> ControlValue {
        self.value.clone()
    }
}

/// Where a color command takes its color from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    /// Current value of the dedicated color picker.
    Picker,
    /// Drop the override and revert to the document default.
    Clear,
    Explicit(Rgb),
}

struct BoundControl {
    control: Box<dyn FormatControl>,
    handler: SubscriptionId,
}

/// 格式狀態鏡像控制器。 / Format State Mirror.
pub struct FormatMirror {
    controls: Vec<BoundControl>,
    signals: Registry<ControlChange>,
    pending: Rc<RefCell<VecDeque<ControlChange>>>,
    fg_picker: Option<Rgb>,
    bg_picker: Option<Rgb>,
}

impl fmt::Debug for FormatMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ControlId> = self.controls.iter().map(|b| b.control.id()).collect();
        f.debug_struct("FormatMirror")
            .field("controls", &ids)
            .field("signals", &self.signals)
            .field("pending", &self.pending.borrow().len())
            .field("fg_picker", &self.fg_picker)
            .field("bg_picker", &self.bg_picker)
            .finish()
    }
}

impl Default for FormatMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatMirror {
    pub fn new() -> Self {
        Self {
            controls: Vec::new(),
            signals: Registry::new(),
            pending: Rc::new(RefCell::new(VecDeque::new())),
            fg_picker: None,
            bg_picker: None,
        }
    }

    /// A mirror with one [`ControlState`] bound for every [`ControlId`].
    pub fn with_standard_controls() -> Self {
        let mut mirror = Self::new();
        for id in ControlId::ALL {
            mirror.bind(Box::new(ControlState::new(id)));
        }
        mirror
    }

    /// 綁定控制項。 / Binds `control` and connects its changed handler, which
    /// queues the change for [`take_pending`](Self::take_pending).
    pub fn bind(&mut self, control: Box<dyn FormatControl>) -> SubscriptionId {
        let id = control.id();
        let queue = self.pending.clone();
        let handler = self.signals.subscribe(move |change: &ControlChange| {
            if change.id == id {
                queue.borrow_mut().push_back(change.clone());
            }
        });
        self.controls.push(BoundControl { control, handler });
        handler
    }

    /// Signal registry; widget adapters may observe control changes here.
    pub fn signals_mut(&mut self) -> &mut Registry<ControlChange> {
        &mut self.signals
    }

    pub fn read(&self, id: ControlId) -> Option<ControlValue> {
        self.controls
            .iter()
            .find(|bound| bound.control.id() == id)
            .map(|bound| bound.control.read())
    }

    /// Whether every bound control shows the matching field of `snapshot`.
    pub fn matches(&self, snapshot: &FormatSnapshot) -> bool {
        self.controls
            .iter()
            .all(|bound| bound.control.read() == bound.control.id().project(snapshot))
    }

    /// 模擬使用者操作控制項。 / Sets a control the way a user interaction
    /// would: the control's changed handler fires if the value changed.
    pub fn set_control(&mut self, id: ControlId, value: ControlValue) -> bool {
        let Some(bound) = self.controls.iter_mut().find(|b| b.control.id() == id) else {
            return false;
        };
        if !bound.control.set(value.clone()) {
            return false;
        }
        self.signals.emit(&ControlChange { id, value });
        true
    }

    /// User-originated changes not yet routed to the editor.
    pub fn take_pending(&mut self) -> Vec<ControlChange> {
        self.pending.borrow_mut().drain(..).collect()
    }

    /// 將編輯器格式套用到控制項。 / Pushes `snapshot` into every bound
    /// control with every changed handler suspended.
    pub fn on_editor_format_changed(&mut self, snapshot: &FormatSnapshot) {
        let Self {
            controls, signals, ..
        } = self;
        let handlers: Vec<SubscriptionId> = controls.iter().map(|b| b.handler).collect();
        signals.with_suspended(&handlers, |signals| {
            for bound in controls.iter_mut() {
                let id = bound.control.id();
                let value = id.project(snapshot);
                if bound.control.set(value.clone()) {
                    signals.emit(&ControlChange { id, value });
                }
            }
        });
        debug!(size = snapshot.size, family = %snapshot.family, "mirrored caret format");
    }

    /// 將控制項變更轉為編輯指令。 / Translates a control interaction into an
    /// editor command, then re-mirrors the editor's resulting format.
    pub fn on_control_changed(
        &mut self,
        id: ControlId,
        value: ControlValue,
        editor: &mut dyn EditorSurface,
    ) -> Result<()> {
        let (command, refocus) = match (id, value) {
            (id, ControlValue::Toggle(_)) if id.modifier().is_some() => {
                let modifier = id.modifier().ok_or_else(|| mismatch(id))?;
                (EditorCommand::ToggleModifier(modifier), false)
            }
            (id, ControlValue::Toggle(_)) if id.justify().is_some() => {
                let justify = id.justify().ok_or_else(|| mismatch(id))?;
                (EditorCommand::SetJustify(justify), true)
            }
            (ControlId::Monospace, ControlValue::Toggle(_)) => (
                EditorCommand::ToggleFontFamily(MONOSPACE_FAMILY.to_string()),
                true,
            ),
            (ControlId::BulletList, ControlValue::Toggle(_)) => {
                (EditorCommand::ToggleBulletList, false)
            }
            (ControlId::FontFamily, ControlValue::Family(family)) => {
                (EditorCommand::SetFontFamily(family), true)
            }
            (ControlId::FontSize, ControlValue::Size(size)) => {
                (EditorCommand::SetFontSize(size), true)
            }
            (id, _) => return Err(mismatch(id)),
        };
        self.run(command, editor)?;
        if refocus {
            editor.grab_focus();
        }
        Ok(())
    }

    pub fn increase_font_size(&mut self, editor: &mut dyn EditorSurface) -> Result<()> {
        let size = increased_font_size(editor.current_format().size);
        self.run(EditorCommand::SetFontSize(size), editor)
    }

    /// Steps down by two; a size at the minimum stays unchanged.
    pub fn decrease_font_size(&mut self, editor: &mut dyn EditorSurface) -> Result<()> {
        let size = decreased_font_size(editor.current_format().size);
        self.run(EditorCommand::SetFontSize(size), editor)
    }

    pub fn set_color(
        &mut self,
        target: ColorTarget,
        choice: ColorChoice,
        editor: &mut dyn EditorSurface,
    ) -> Result<()> {
        let color = match choice {
            ColorChoice::Picker => self.picker_color(target),
            ColorChoice::Clear => None,
            ColorChoice::Explicit(color) => Some(color),
        };
        self.run(EditorCommand::SetColor(target, color), editor)
    }

    pub fn picker_color(&self, target: ColorTarget) -> Option<Rgb> {
        match target {
            ColorTarget::Foreground => self.fg_picker,
            ColorTarget::Background => self.bg_picker,
        }
    }

    /// Color pickers are not driven by the caret; only the user sets them.
    pub fn set_picker_color(&mut self, target: ColorTarget, color: Option<Rgb>) {
        match target {
            ColorTarget::Foreground => self.fg_picker = color,
            ColorTarget::Background => self.bg_picker = color,
        }
    }

    fn run(&mut self, command: EditorCommand, editor: &mut dyn EditorSurface) -> Result<()> {
        debug!(?command, "format command");
        editor.apply(command)?;
        self.on_editor_format_changed(&editor.current_format());
        Ok(())
    }
}

fn mismatch(id: ControlId) -> CoreError {
    CoreError::Validation(format!("control {id:?} received a value of the wrong kind"))
}
