//! TakeNote 核心：導覽、格式鏡像與文件生命週期。
//! TakeNote core: pane navigation, format mirroring and the document lifecycle.

pub mod error;
pub mod format;
pub mod guard;
pub mod launcher;
pub mod lifecycle;
pub mod mirror;
pub mod navigation;
pub mod node;
pub mod observer;
pub mod report;
pub mod store;
pub mod surface;
pub mod window;

#[cfg(test)]
mod testing;

pub use error::{CoreError, Result};
pub use format::{ColorTarget, FormatSnapshot, Justify, Modifier, Rgb};
pub use guard::{Guard, GuardScope};
pub use launcher::{AppLauncher, LaunchError, ProcessLauncher};
pub use lifecycle::{
    AutosaveConfig, LifecycleManager, LifecycleState, ManualScheduler, Scheduler, TimerId,
    PROGRAM_NAME,
};
pub use mirror::{ColorChoice, ControlChange, ControlId, ControlValue, FormatControl, FormatMirror};
pub use navigation::{
    resolve_create_parent, ListSource, NavContext, NavigationController, Pane, PaneUpdate,
    PendingSelection,
};
pub use node::{Node, NodeId, NodeKind, NodeTree, TreeError, PAGE_DATA_FILE};
pub use observer::{Registry, SubscriptionId};
pub use report::{report_error, MessageLog, Reporter};
pub use store::{Document, DocumentStore, NodeChange, StoreError};
pub use surface::{EditorCommand, EditorError, EditorSurface, HeadlessEditor, PageRef};
pub use window::{LayoutHost, NoLayout, NoteWindow};
