/// Line-oriented statements and meta commands for the REPL.
///
/// Statements:
///   insert <id> <username> <email>
///   select
///
/// Meta commands start with a dot: `.exit`, `.constants`, `.btree`.
use crate::btree::node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::error::{Result, RowDbError};
use crate::row::{Row, ROW_SIZE};
use crate::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Inserted,
    Rows(Vec<Row>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Constants,
    BTree,
}

impl MetaCommand {
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim() {
            ".exit" => Ok(MetaCommand::Exit),
            ".constants" => Ok(MetaCommand::Constants),
            ".btree" => Ok(MetaCommand::BTree),
            other => Err(RowDbError::UnrecognizedCommand(other.to_string())),
        }
    }
}

/// Parse one input line into a statement.
pub fn prepare(input: &str) -> Result<Statement> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    match tokens.first() {
        Some(&"insert") => prepare_insert(&tokens),
        Some(&"select") if tokens.len() == 1 => Ok(Statement::Select),
        _ => Err(RowDbError::UnrecognizedStatement(input.trim().to_string())),
    }
}

fn prepare_insert(tokens: &[&str]) -> Result<Statement> {
    if tokens.len() != 4 {
        return Err(RowDbError::Parse(
            "expected: insert <id> <username> <email>".into(),
        ));
    }

    let id: i64 = tokens[1]
        .parse()
        .map_err(|_| RowDbError::Parse(format!("invalid id '{}'", tokens[1])))?;
    if id < 0 {
        return Err(RowDbError::NegativeId);
    }
    let id = u32::try_from(id)
        .map_err(|_| RowDbError::Parse(format!("id {} is out of range", id)))?;

    Ok(Statement::Insert(Row::new(id, tokens[2], tokens[3])?))
}

pub fn execute(statement: &Statement, table: &mut Table) -> Result<ExecResult> {
    match statement {
        Statement::Insert(row) => {
            table.insert(row.id, row)?;
            Ok(ExecResult::Inserted)
        }
        Statement::Select => Ok(ExecResult::Rows(table.select_all()?)),
    }
}

/// Parse and execute one input line.
pub fn execute_line(input: &str, table: &mut Table) -> Result<ExecResult> {
    let statement = prepare(input)?;
    execute(&statement, table)
}

/// Layout constants, one `NAME: value` per line.
pub fn constants_report() -> String {
    let constants: [(&str, usize); 6] = [
        ("ROW_SIZE", ROW_SIZE),
        ("COMMON_NODE_HEADER_SIZE", COMMON_NODE_HEADER_SIZE),
        ("LEAF_NODE_HEADER_SIZE", LEAF_NODE_HEADER_SIZE),
        ("LEAF_NODE_CELL_SIZE", LEAF_NODE_CELL_SIZE),
        ("LEAF_NODE_SPACE_FOR_CELLS", LEAF_NODE_SPACE_FOR_CELLS),
        ("LEAF_NODE_MAX_CELLS", LEAF_NODE_MAX_CELLS as usize),
    ];
    constants
        .iter()
        .map(|(name, value)| format!("{}: {}\n", name, value))
        .collect()
}
