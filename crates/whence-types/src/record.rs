//! Operation records: the nodes of the provenance DAG.
//!
//! A [`Record`] is one tracked runtime operation. Its operands are
//! [`TrackedValue`]s, each pairing the runtime value with the record that
//! produced it. Instrumented code emits [`RecordDraft`]s; the store assigns
//! IDs and resolves batch-relative references into a [`Record`].
//!
//! ## Design: kinds are open
//!
//! `OperationKind` names the operations the traversal rules know about and
//! keeps everything else as `Other(tag)`, so records from a newer
//! instrumentation pass still round-trip through the store untouched.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::EnumString;

use crate::error::ModelError;
use crate::ids::RecordId;

/// Length of a string in characters (Unicode scalar values).
///
/// Every character index in whence uses this unit.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ── Operation kinds ─────────────────────────────────────────────────────────

/// Tag identifying which operation a record describes.
///
/// Serialized as a kebab-case string. The camelCase spellings emitted by the
/// instrumentation pass are accepted as aliases.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    #[strum(serialize = "string-literal", serialize = "stringLiteral")]
    StringLiteral,
    #[strum(serialize = "numeric-literal", serialize = "numericLiteral")]
    NumericLiteral,
    #[strum(serialize = "template-literal", serialize = "templateLiteral")]
    TemplateLiteral,
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "binary-expression", serialize = "binaryExpression")]
    BinaryExpression,
    #[strum(serialize = "assignment-expression", serialize = "assignmentExpression")]
    AssignmentExpression,
    #[strum(serialize = "member-expression", serialize = "memberExpression")]
    MemberExpression,
    #[strum(serialize = "call-expression", serialize = "callExpression")]
    CallExpression,
    #[strum(serialize = "style-assignment", serialize = "styleAssignment")]
    StyleAssignment,
    /// Any tag without a dedicated variant.
    #[strum(default)]
    Other(String),
}

impl OperationKind {
    /// Parse from a tag string. Never fails: unknown tags become `Other`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        <Self as FromStr>::from_str(s).unwrap_or_else(|_| Self::Other(s.to_string()))
    }

    /// Canonical tag string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::StringLiteral => "string-literal",
            Self::NumericLiteral => "numeric-literal",
            Self::TemplateLiteral => "template-literal",
            Self::Identifier => "identifier",
            Self::BinaryExpression => "binary-expression",
            Self::AssignmentExpression => "assignment-expression",
            Self::MemberExpression => "member-expression",
            Self::CallExpression => "call-expression",
            Self::StyleAssignment => "style-assignment",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for OperationKind {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> String {
        match kind {
            OperationKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Operands ────────────────────────────────────────────────────────────────

/// A runtime value paired with the record that produced it.
///
/// `tracking` is `None` for untracked literals and external inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedValue<R = RecordId> {
    #[serde(default)]
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<R>,
}

impl<R> TrackedValue<R> {
    /// A value produced by a logged operation.
    pub fn tracked(value: impl Into<Value>, tracking: impl Into<R>) -> Self {
        Self {
            value: value.into(),
            tracking: Some(tracking.into()),
        }
    }

    /// A value with no known producer.
    pub fn untracked(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            tracking: None,
        }
    }

    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Named, insertion-ordered operands.
pub type Args<R = RecordId> = IndexMap<String, TrackedValue<R>>;

/// Shape of an assignment's left-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AssignmentTarget {
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "member-expression", serialize = "MemberExpression")]
    MemberExpression,
}

/// Zero-based line/column position in a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Source range of the expression that emitted a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    pub file: String,
    pub start: Position,
    pub end: Position,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, start: Position, end: Position) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// Secondary index key: `"{file}:{line}:{column}"` of the start position.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.file, self.start.line, self.start.column)
    }
}

/// Compile-time metadata captured by the instrumentation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticArgs {
    /// Operator symbol (`+`, `=`, `+=`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Left-hand side shape for assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<AssignmentTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceLoc>,
}

// ── Records ─────────────────────────────────────────────────────────────────

/// One stored operation. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: OperationKind,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub static_args: StaticArgs,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra_args: Args,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub runtime_args: Args,
    /// Produced value. Diagnostics only; traversal never reads it.
    #[serde(default)]
    pub result: Value,
}

impl Record {
    pub fn arg(&self, name: &str) -> Option<&TrackedValue> {
        self.args.get(name)
    }

    pub fn extra_arg(&self, name: &str) -> Option<&TrackedValue> {
        self.extra_args.get(name)
    }

    pub fn runtime_arg(&self, name: &str) -> Option<&TrackedValue> {
        self.runtime_args.get(name)
    }

    pub fn operator(&self) -> Option<&str> {
        self.static_args.operator.as_deref()
    }

    pub fn loc(&self) -> Option<&SourceLoc> {
        self.static_args.loc.as_ref()
    }

    /// Every record this one points back to, across all operand groups.
    pub fn references(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.args
            .values()
            .chain(self.extra_args.values())
            .chain(self.runtime_args.values())
            .filter_map(|v| v.tracking)
    }
}

/// Reference from a draft to its operand's producer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftRef {
    /// A record already in the store.
    Stored(RecordId),
    /// An earlier entry of the same batch, by position.
    #[serde(rename = "batch")]
    InBatch(usize),
}

impl From<RecordId> for DraftRef {
    fn from(id: RecordId) -> Self {
        Self::Stored(id)
    }
}

/// A record as emitted by instrumented code, before the store assigns its ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub kind: OperationKind,
    #[serde(default)]
    pub args: Args<DraftRef>,
    #[serde(default)]
    pub static_args: StaticArgs,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra_args: Args<DraftRef>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub runtime_args: Args<DraftRef>,
    #[serde(default)]
    pub result: Value,
}

impl RecordDraft {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            args: Args::default(),
            static_args: StaticArgs::default(),
            extra_args: Args::default(),
            runtime_args: Args::default(),
            result: Value::Null,
        }
    }

    /// A string literal with no producer of its own.
    pub fn string_literal(text: &str) -> Self {
        Self::new(OperationKind::StringLiteral)
            .arg("value", TrackedValue::untracked(text))
            .result(text)
    }

    /// `left + right`, with the concatenated result when both sides are strings.
    pub fn concat(left: TrackedValue<DraftRef>, right: TrackedValue<DraftRef>) -> Self {
        let result = match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => Value::String(format!("{l}{r}")),
            _ => Value::Null,
        };
        Self::new(OperationKind::BinaryExpression)
            .operator("+")
            .arg("left", left)
            .arg("right", right)
            .result(result)
    }

    pub fn arg(mut self, name: impl Into<String>, value: TrackedValue<DraftRef>) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    pub fn extra_arg(mut self, name: impl Into<String>, value: TrackedValue<DraftRef>) -> Self {
        self.extra_args.insert(name.into(), value);
        self
    }

    pub fn runtime_arg(mut self, name: impl Into<String>, value: TrackedValue<DraftRef>) -> Self {
        self.runtime_args.insert(name.into(), value);
        self
    }

    pub fn operator(mut self, op: impl Into<String>) -> Self {
        self.static_args.operator = Some(op.into());
        self
    }

    pub fn target(mut self, target: AssignmentTarget) -> Self {
        self.static_args.target = Some(target);
        self
    }

    pub fn loc(mut self, loc: SourceLoc) -> Self {
        self.static_args.loc = Some(loc);
        self
    }

    pub fn result(mut self, result: impl Into<Value>) -> Self {
        self.result = result.into();
        self
    }

    /// Turn the draft into a stored record with ID `id`.
    ///
    /// `preceding` holds the IDs already assigned to the earlier entries of the
    /// same batch, so `InBatch(i)` resolves to `preceding[i]`. Stored
    /// references must be strictly older than `id`.
    pub fn resolve(self, id: RecordId, preceding: &[RecordId]) -> Result<Record, ModelError> {
        Ok(Record {
            id,
            kind: self.kind,
            args: resolve_args(self.args, id, preceding)?,
            static_args: self.static_args,
            extra_args: resolve_args(self.extra_args, id, preceding)?,
            runtime_args: resolve_args(self.runtime_args, id, preceding)?,
            result: self.result,
        })
    }
}

fn resolve_args(
    args: Args<DraftRef>,
    id: RecordId,
    preceding: &[RecordId],
) -> Result<Args, ModelError> {
    args.into_iter()
        .map(|(name, operand)| {
            let tracking = match operand.tracking {
                None => None,
                Some(DraftRef::Stored(reference)) => {
                    if reference >= id {
                        return Err(ModelError::ForwardReference {
                            record: id,
                            reference,
                        });
                    }
                    Some(reference)
                }
                Some(DraftRef::InBatch(reference)) => match preceding.get(reference) {
                    Some(resolved) => Some(*resolved),
                    None => {
                        return Err(ModelError::BatchReference {
                            index: preceding.len(),
                            reference,
                        });
                    }
                },
            };
            Ok((
                name,
                TrackedValue {
                    value: operand.value,
                    tracking,
                },
            ))
        })
        .collect()
}
