#![forbid(unsafe_code)]

//! Maps one raw statement onto the structured record the lineage core consumes.

use rw_core::{ParsedStatement, StatementKind};
use sqlparser::ast::{
    AssignmentTarget, FromTable, ObjectName, ObjectNamePart, ObjectType, Statement, TableFactor,
    TableObject, TableWithJoins,
};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("[{instruction}] is not DML or is not a valid instruction")]
    UnrecognizedInstruction { instruction: String },
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unsupported statement: {reason}")]
    Unsupported { reason: String },
    #[error("expected exactly one statement per line")]
    MultipleStatements,
}

/// Parses one line of a statement script.
///
/// Blank lines, comments and statements other than CREATE TABLE, INSERT,
/// UPDATE, DROP TABLE and DELETE fail with
/// [`ParseError::UnrecognizedInstruction`]; callers skip those.
pub fn parse_statement(text: &str) -> Result<ParsedStatement, ParseError> {
    let instruction = leading_keyword(text);
    if kind_for_keyword(&instruction).is_none() {
        return Err(ParseError::UnrecognizedInstruction { instruction });
    }

    let mut statements = Parser::parse_sql(&SQLiteDialect {}, text)
        .map_err(|err| ParseError::Syntax(err.to_string()))?;
    if statements.len() != 1 {
        return Err(ParseError::MultipleStatements);
    }
    let statement = statements.remove(0);
    match statement {
        Statement::CreateTable(create) => Ok(ParsedStatement::new(
            StatementKind::Create,
            table_name(&create.name)?,
        )),
        Statement::Insert(insert) => {
            let TableObject::TableName(name) = &insert.table else {
                return Err(unsupported("INSERT into a table function"));
            };
            Ok(ParsedStatement::new(StatementKind::Insert, table_name(name)?))
        }
        Statement::Update(update) => {
            let table = relation_name(&update.table)?;
            let mut columns = update.assignments.iter().map(|assignment| {
                match &assignment.target {
                    AssignmentTarget::ColumnName(name) => table_name(name),
                    AssignmentTarget::Tuple(_) => Err(unsupported("tuple assignment")),
                }
            });
            let Some(column) = columns.next().transpose()? else {
                return Err(unsupported("UPDATE without assignments"));
            };
            if update.assignments.len() > 1 {
                warn!(
                    table = %table,
                    column = %column,
                    assignments = update.assignments.len(),
                    "multi-column update recorded against its first column"
                );
            }
            let mut parsed = ParsedStatement::new(StatementKind::Update, table).with_column(column);
            parsed.selector = update.selection.as_ref().map(ToString::to_string);
            Ok(parsed)
        }
        Statement::Delete(delete) => {
            let tables = match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
            };
            let [table] = tables.as_slice() else {
                return Err(unsupported("DELETE must target exactly one table"));
            };
            let mut parsed = ParsedStatement::new(StatementKind::Delete, relation_name(table)?);
            parsed.selector = delete.selection.as_ref().map(ToString::to_string);
            Ok(parsed)
        }
        Statement::Drop {
            object_type, names, ..
        } => {
            if object_type != ObjectType::Table {
                return Err(ParseError::UnrecognizedInstruction {
                    instruction: format!("DROP {object_type}"),
                });
            }
            let [name] = names.as_slice() else {
                return Err(unsupported("DROP TABLE must name exactly one table"));
            };
            Ok(ParsedStatement::new(StatementKind::Drop, table_name(name)?))
        }
        other => Err(ParseError::UnrecognizedInstruction {
            instruction: statement_label(&other),
        }),
    }
}

fn leading_keyword(text: &str) -> String {
    let trimmed = text.trim_start();
    if trimmed.starts_with("--") {
        return "--".to_string();
    }
    trimmed
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn kind_for_keyword(keyword: &str) -> Option<StatementKind> {
    match keyword {
        "CREATE" => Some(StatementKind::Create),
        "INSERT" => Some(StatementKind::Insert),
        "UPDATE" => Some(StatementKind::Update),
        "DROP" => Some(StatementKind::Drop),
        "DELETE" => Some(StatementKind::Delete),
        _ => None,
    }
}

fn statement_label(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

fn relation_name(table: &TableWithJoins) -> Result<String, ParseError> {
    match &table.relation {
        TableFactor::Table { name, .. } => table_name(name),
        _ => Err(unsupported("target is not a plain table")),
    }
}

/// Last identifier of a possibly qualified name, unquoted.
fn table_name(name: &ObjectName) -> Result<String, ParseError> {
    name.0
        .last()
        .and_then(ObjectNamePart::as_ident)
        .map(|ident| ident.value.clone())
        .ok_or_else(|| unsupported(&format!("cannot resolve name {name}")))
}

fn unsupported(reason: &str) -> ParseError {
    ParseError::Unsupported {
        reason: reason.to_string(),
    }
}
