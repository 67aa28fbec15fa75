//! Human-readable description of the tag payload layouts, stored in the descriptor heap so an
//! offline reader can decode the tag heap without this crate.

use serde::{Deserialize, Serialize};

use crate::tags::{payload_size, OpCode, CALL_NAME_LEN, COMPONENT_ID, KERNEL_NAME_LEN, REASON_LEN};

pub const LAYOUT_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    U8,
    U16,
    U32,
    /// NUL-terminated UTF-8 in a fixed-size array.
    Str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLayout {
    pub name: String,
    pub opcode: u8,
    pub size_dwords: u32,
    pub fields: Vec<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub version: u16,
    pub component: u16,
    pub tags: Vec<TagLayout>,
}

impl LayoutDocument {
    /// Layouts of every tag kind this crate emits.
    pub fn current() -> Self {
        Self {
            version: LAYOUT_VERSION,
            component: COMPONENT_ID,
            tags: OpCode::ALL.into_iter().map(tag_layout).collect(),
        }
    }

    pub fn tag(&self, opcode: u8) -> Option<&TagLayout> {
        self.tags.iter().find(|t| t.opcode == opcode)
    }
}

fn field(name: &str, offset: u32, size: u32, kind: FieldKind) -> FieldLayout {
    FieldLayout {
        name: name.to_owned(),
        offset,
        size,
        kind,
    }
}

fn tag_layout(opcode: OpCode) -> TagLayout {
    let (text_name, text_len) = match opcode {
        OpCode::KernelName => ("kernel_name", KERNEL_NAME_LEN),
        OpCode::PipeControlReason => ("reason", REASON_LEN),
        OpCode::CallNameBegin | OpCode::CallNameEnd => ("call_name", CALL_NAME_LEN),
    };
    TagLayout {
        name: opcode.name().to_owned(),
        opcode: opcode as u8,
        size_dwords: (payload_size(opcode) / 4) as u32,
        fields: vec![
            field("opcode", 0, 1, FieldKind::U8),
            field("reserved", 1, 1, FieldKind::U8),
            field("component", 2, 2, FieldKind::U16),
            field("dword_count", 4, 4, FieldKind::U32),
            field("call_id", 8, 4, FieldKind::U32),
            field(text_name, 12, text_len as u32, FieldKind::Str),
        ],
    }
}
