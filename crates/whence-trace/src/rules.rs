//! Traversal rules: one backward step per operation kind.
//!
//! A rule looks at a record and a character index into the record's value
//! and names the operand (and index within it) that character came from.
//! Rules are plain functions registered in a [`RuleTable`] keyed by
//! [`OperationKind`], so new kinds plug in without touching the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use whence_types::{OperationKind, Record, TrackedValue, char_len};

use crate::trace::Step;

/// Result of applying a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Next(Step),
    Terminal(TerminalReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The record introduced the value itself.
    Literal,
    /// The character is produced by the operation, not copied from an operand.
    Synthesized,
    /// The operand holding the character has no producer.
    Untracked { operand: String },
    Unsupported { detail: String },
}

/// A backward step for one operation kind.
pub type Rule = fn(&Record, usize) -> RuleOutcome;

/// Rule dispatch by operation kind.
#[derive(Clone)]
pub struct RuleTable {
    rules: HashMap<OperationKind, Rule>,
}

impl RuleTable {
    /// A table with no rules; every kind is unsupported.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register `rule` for `kind`, returning the rule it replaced.
    pub fn register(&mut self, kind: OperationKind, rule: Rule) -> Option<Rule> {
        self.rules.insert(kind, rule)
    }

    pub fn with(mut self, kind: OperationKind, rule: Rule) -> Self {
        self.register(kind, rule);
        self
    }

    pub fn get(&self, kind: &OperationKind) -> Option<Rule> {
        self.rules.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the rule registered for `record.kind`, if any.
    pub fn apply(&self, record: &Record, char_index: usize) -> Option<RuleOutcome> {
        self.get(&record.kind).map(|rule| rule(record, char_index))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::empty()
            .with(OperationKind::StringLiteral, literal)
            .with(OperationKind::NumericLiteral, literal)
            .with(OperationKind::TemplateLiteral, literal)
            .with(OperationKind::Identifier, identifier)
            .with(OperationKind::BinaryExpression, binary_expression)
            .with(OperationKind::AssignmentExpression, assignment_expression)
            .with(OperationKind::MemberExpression, member_expression)
            .with(OperationKind::StyleAssignment, style_assignment)
    }
}

impl std::fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.rules.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("RuleTable").field("kinds", &kinds).finish()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn unsupported(detail: impl Into<String>) -> RuleOutcome {
    RuleOutcome::Terminal(TerminalReason::Unsupported {
        detail: detail.into(),
    })
}

fn missing(operand: &str) -> RuleOutcome {
    unsupported(format!("missing operand `{operand}`"))
}

/// Continue into `operand` at `char_index`.
fn descend(name: &str, operand: &TrackedValue, char_index: usize) -> RuleOutcome {
    match operand.tracking {
        Some(id) => RuleOutcome::Next(Step::new(id, char_index)),
        None => RuleOutcome::Terminal(TerminalReason::Untracked {
            operand: name.to_string(),
        }),
    }
}

/// `left + right` on strings: indices below `chars(left)` come from the left
/// operand, the rest from the right one shifted back by that length.
fn concat(
    left: (&str, &TrackedValue),
    right: (&str, &TrackedValue),
    char_index: usize,
) -> RuleOutcome {
    let (Some(left_value), Some(_)) = (left.1.as_str(), right.1.as_str()) else {
        return unsupported("non-string operands");
    };
    let left_len = char_len(left_value);
    if char_index < left_len {
        descend(left.0, left.1, char_index)
    } else {
        descend(right.0, right.1, char_index - left_len)
    }
}

// ── Rules ───────────────────────────────────────────────────────────────────

pub fn literal(_record: &Record, _char_index: usize) -> RuleOutcome {
    RuleOutcome::Terminal(TerminalReason::Literal)
}

pub fn identifier(record: &Record, char_index: usize) -> RuleOutcome {
    match record.arg("value") {
        Some(value) => descend("value", value, char_index),
        None => missing("value"),
    }
}

pub fn member_expression(record: &Record, char_index: usize) -> RuleOutcome {
    match record.extra_arg("propertyValue") {
        Some(value) => descend("propertyValue", value, char_index),
        None => missing("propertyValue"),
    }
}

pub fn binary_expression(record: &Record, char_index: usize) -> RuleOutcome {
    if record.operator() != Some("+") {
        return unsupported(format!("operator {:?}", record.operator().unwrap_or("")));
    }
    let (Some(left), Some(right)) = (record.arg("left"), record.arg("right")) else {
        return missing("left/right");
    };
    concat(("left", left), ("right", right), char_index)
}

/// `=` copies the right-hand side; `+=` appends it to the current value.
pub fn assignment_expression(record: &Record, char_index: usize) -> RuleOutcome {
    match record.operator() {
        Some("=") => match record.arg("argument") {
            Some(argument) => descend("argument", argument, char_index),
            None => missing("argument"),
        },
        Some("+=") => {
            if let Some(assignment) = record.runtime_arg("assignment") {
                return descend("assignment", assignment, char_index);
            }
            let (Some(current), Some(argument)) =
                (record.arg("currentValue"), record.arg("argument"))
            else {
                return missing("currentValue/argument");
            };
            concat(("currentValue", current), ("argument", argument), char_index)
        }
        other => unsupported(format!("assignment operator {:?}", other.unwrap_or(""))),
    }
}

/// Value is `"<name>: <value>"`.
pub fn style_assignment(record: &Record, char_index: usize) -> RuleOutcome {
    let (Some(name), Some(value)) = (record.arg("styleName"), record.arg("styleValue")) else {
        return missing("styleName/styleValue");
    };
    let Some(name_str) = name.as_str() else {
        return unsupported("non-string style name");
    };
    let name_len = char_len(name_str);
    if char_index < name_len {
        descend("styleName", name, char_index)
    } else if char_index < name_len + 2 {
        RuleOutcome::Terminal(TerminalReason::Synthesized)
    } else {
        descend("styleValue", value, char_index - name_len - 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whence_types::{RecordDraft, RecordId};

    fn resolve(draft: RecordDraft, id: u64) -> Record {
        draft.resolve(RecordId::new(id), &[]).unwrap()
    }

    #[test]
    fn test_concat_splits_on_left_length() {
        let record = resolve(
            RecordDraft::concat(
                TrackedValue::tracked("Hello, ", RecordId::new(1)),
                TrackedValue::tracked("World", RecordId::new(2)),
            ),
            3,
        );
        assert_eq!(
            binary_expression(&record, 6),
            RuleOutcome::Next(Step::new(RecordId::new(1), 6))
        );
        assert_eq!(
            binary_expression(&record, 7),
            RuleOutcome::Next(Step::new(RecordId::new(2), 0))
        );
        assert_eq!(
            binary_expression(&record, 9),
            RuleOutcome::Next(Step::new(RecordId::new(2), 2))
        );
    }

    #[test]
    fn test_concat_counts_characters_not_bytes() {
        let record = resolve(
            RecordDraft::concat(
                TrackedValue::tracked("»", RecordId::new(1)),
                TrackedValue::tracked("x", RecordId::new(2)),
            ),
            3,
        );
        assert_eq!(
            binary_expression(&record, 1),
            RuleOutcome::Next(Step::new(RecordId::new(2), 0))
        );
    }

    #[test]
    fn test_binary_non_concat_is_unsupported() {
        let record = resolve(
            RecordDraft::new(OperationKind::BinaryExpression)
                .operator("-")
                .arg("left", TrackedValue::tracked(3, RecordId::new(1)))
                .arg("right", TrackedValue::tracked(1, RecordId::new(2))),
            3,
        );
        assert!(matches!(
            binary_expression(&record, 0),
            RuleOutcome::Terminal(TerminalReason::Unsupported { .. })
        ));

        let numeric_plus = resolve(
            RecordDraft::concat(
                TrackedValue::tracked(3, RecordId::new(1)),
                TrackedValue::tracked("x", RecordId::new(2)),
            ),
            3,
        );
        assert!(matches!(
            binary_expression(&numeric_plus, 0),
            RuleOutcome::Terminal(TerminalReason::Unsupported { .. })
        ));
    }

    #[test]
    fn test_untracked_operand_terminates() {
        let record = resolve(
            RecordDraft::concat(
                TrackedValue::untracked("ab"),
                TrackedValue::tracked("cd", RecordId::new(1)),
            ),
            2,
        );
        assert_eq!(
            binary_expression(&record, 1),
            RuleOutcome::Terminal(TerminalReason::Untracked {
                operand: "left".into()
            })
        );
    }

    #[test]
    fn test_assignment_operators() {
        let plain = resolve(
            RecordDraft::new(OperationKind::AssignmentExpression)
                .operator("=")
                .arg("argument", TrackedValue::tracked("abc", RecordId::new(1))),
            2,
        );
        assert_eq!(
            assignment_expression(&plain, 2),
            RuleOutcome::Next(Step::new(RecordId::new(1), 2))
        );

        let compound = resolve(
            RecordDraft::new(OperationKind::AssignmentExpression)
                .operator("+=")
                .arg("currentValue", TrackedValue::tracked("ab", RecordId::new(1)))
                .arg("argument", TrackedValue::tracked("cd", RecordId::new(2))),
            3,
        );
        assert_eq!(
            assignment_expression(&compound, 3),
            RuleOutcome::Next(Step::new(RecordId::new(2), 1))
        );

        let with_runtime = resolve(
            RecordDraft::new(OperationKind::AssignmentExpression)
                .operator("+=")
                .arg("currentValue", TrackedValue::tracked("ab", RecordId::new(1)))
                .arg("argument", TrackedValue::tracked("cd", RecordId::new(2)))
                .runtime_arg("assignment", TrackedValue::tracked("abcd", RecordId::new(3))),
            4,
        );
        assert_eq!(
            assignment_expression(&with_runtime, 3),
            RuleOutcome::Next(Step::new(RecordId::new(3), 3))
        );

        let shift = resolve(
            RecordDraft::new(OperationKind::AssignmentExpression)
                .operator("<<=")
                .arg("argument", TrackedValue::tracked(1, RecordId::new(1))),
            2,
        );
        assert!(matches!(
            assignment_expression(&shift, 0),
            RuleOutcome::Terminal(TerminalReason::Unsupported { .. })
        ));
    }

    #[test]
    fn test_style_assignment_regions() {
        let record = resolve(
            RecordDraft::new(OperationKind::StyleAssignment)
                .arg("styleName", TrackedValue::tracked("color", RecordId::new(1)))
                .arg("styleValue", TrackedValue::tracked("red", RecordId::new(2)))
                .result("color: red"),
            3,
        );
        assert_eq!(
            style_assignment(&record, 4),
            RuleOutcome::Next(Step::new(RecordId::new(1), 4))
        );
        assert_eq!(
            style_assignment(&record, 5),
            RuleOutcome::Terminal(TerminalReason::Synthesized)
        );
        assert_eq!(
            style_assignment(&record, 6),
            RuleOutcome::Terminal(TerminalReason::Synthesized)
        );
        assert_eq!(
            style_assignment(&record, 8),
            RuleOutcome::Next(Step::new(RecordId::new(2), 1))
        );
    }

    #[test]
    fn test_table_dispatch_and_override() {
        let mut table = RuleTable::default();
        let record = resolve(RecordDraft::string_literal("x"), 1);
        assert_eq!(
            table.apply(&record, 0),
            Some(RuleOutcome::Terminal(TerminalReason::Literal))
        );

        let call = resolve(RecordDraft::new(OperationKind::CallExpression), 2);
        assert_eq!(table.apply(&call, 0), None);

        fn always_synthesized(_: &Record, _: usize) -> RuleOutcome {
            RuleOutcome::Terminal(TerminalReason::Synthesized)
        }
        assert!(table.register(OperationKind::CallExpression, always_synthesized).is_none());
        assert_eq!(
            table.apply(&call, 0),
            Some(RuleOutcome::Terminal(TerminalReason::Synthesized))
        );
    }
}
