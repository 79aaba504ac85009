//! weft-editor-core: Pure Rust text editing logic without framework dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage abstraction
//! - `EditorRope` - ropey-backed implementation
//! - `UndoableBuffer<T>` - undo/redo over any `TextBuffer`
//! - `PlainEditor<B>` - a small editing surface with cursor and selection
//! - `SourceDocument` - the shared document source that widget markers live in

pub mod document;
pub mod source;
pub mod text;
pub mod types;
pub mod undo;

pub use document::PlainEditor;
pub use smol_str::SmolStr;
pub use source::{ChangeEvent, ChangeOrigin, ListenerId, SharedSource, SourceDocument};
pub use text::{EditorRope, TextBuffer};
pub use types::{EditInfo, Selection};
pub use undo::{UndoManager, UndoableBuffer};
