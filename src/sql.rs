use std::str::FromStr;

use rust_decimal::Decimal;
use sqlparser::ast::{self, Expr, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;
use crate::timefmt::parse_timestamp;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertRoom {
        id: Ulid,
        spec: RoomSpec,
    },
    InsertBooking(NewBooking),
    ExtendBooking {
        booking_id: Ulid,
        guest: String,
        check_out: Ms,
    },
    CheckIn {
        booking_id: Ulid,
    },
    CheckOut {
        booking_id: Ulid,
    },
    RateStay {
        booking_id: Ulid,
        guest: String,
        rating: i64,
        review: Option<String>,
    },
    InsertReview(NewReview),
    /// Both bounds or neither ("clear" mode).
    SelectAvailability {
        check_in: Option<Ms>,
        check_out: Option<Ms>,
    },
    SelectRooms {
        id: Option<Ulid>,
    },
    SelectBookings {
        room_id: Option<Ulid>,
        guest: Option<String>,
    },
    SelectReviews {
        room_id: Ulid,
    },
    SelectRoomDetail {
        room_id: Ulid,
        guest: String,
    },
    SelectCheckedIn {
        guest: String,
        room_id: Option<Ulid>,
    },
}

const ROOM_COLUMNS: &[&str] = &[
    "id",
    "name",
    "price",
    "capacity",
    "description",
    "amenities",
    "bedrooms",
    "bathrooms",
    "size_sqft",
    "security_level",
];
const BOOKING_COLUMNS: &[&str] = &[
    "id",
    "room_id",
    "guest",
    "check_in",
    "check_out",
    "special_requests",
    "guest_count",
];
const EXTENSION_COLUMNS: &[&str] = &["booking_id", "guest", "check_out"];
const FRONT_DESK_COLUMNS: &[&str] = &["booking_id"];
const RATING_COLUMNS: &[&str] = &["booking_id", "guest", "rating", "review"];
const REVIEW_COLUMNS: &[&str] = &["id", "room_id", "guest", "text", "rating"];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let Some(first) = stmts.first() else {
        return Err(SqlError::Empty);
    };

    match first {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// Table an INSERT or SELECT targets, without interpreting values.
/// Works on statements that still contain `$n` placeholders.
pub fn target_table(sql: &str) -> Option<String> {
    let stmts = Parser::parse_sql(&PostgreSqlDialect {}, sql).ok()?;
    match stmts.first()? {
        Statement::Insert(insert) => insert_table_name(insert).ok(),
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) => table_factor_name(&select.from.first()?.relation).ok(),
            _ => None,
        },
        _ => None,
    }
}

// ── INSERT ────────────────────────────────────────────────────

/// One VALUES row keyed by column name.
struct InsertRow<'a> {
    cells: Vec<(String, &'a Expr)>,
}

impl<'a> InsertRow<'a> {
    fn new(insert: &'a ast::Insert, allowed: &[&str]) -> Result<Self, SqlError> {
        if insert.columns.is_empty() {
            return Err(SqlError::MissingColumnList);
        }
        let values = extract_insert_values(insert)?;
        if values.len() != insert.columns.len() {
            return Err(SqlError::WrongArity(insert.columns.len(), values.len()));
        }
        let mut cells = Vec::with_capacity(values.len());
        for (column, value) in insert.columns.iter().zip(values) {
            let name = column_key(&column.to_string());
            if !allowed.contains(&name.as_str()) {
                return Err(SqlError::UnknownColumn(name));
            }
            if cells.iter().any(|(n, _)| *n == name) {
                return Err(SqlError::Parse(format!("column {name} given twice")));
            }
            cells.push((name, value));
        }
        Ok(Self { cells })
    }

    /// Value for `col`, with SQL NULL treated as absent.
    fn get(&self, col: &str) -> Option<&'a Expr> {
        self.cells
            .iter()
            .find(|(name, _)| name == col)
            .map(|(_, expr)| *expr)
            .filter(|expr| !matches!(extract_value(expr), Some(Value::Null)))
    }

    fn required(&self, col: &'static str) -> Result<&'a Expr, SqlError> {
        self.get(col).ok_or(SqlError::MissingColumn(col))
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;

    match table.as_str() {
        "rooms" => {
            let row = InsertRow::new(insert, ROOM_COLUMNS)?;
            let mut spec = RoomSpec::new(
                parse_text(row.required("name")?)?,
                parse_decimal(row.required("price")?)?,
                parse_u32(row.required("capacity")?)?,
            );
            if let Some(e) = row.get("description") {
                spec.description = parse_text(e)?;
            }
            if let Some(e) = row.get("amenities") {
                spec.amenities = parse_text(e)?;
            }
            if let Some(e) = row.get("bedrooms") {
                spec.bedrooms = parse_u32(e)?;
            }
            if let Some(e) = row.get("bathrooms") {
                spec.bathrooms = parse_u32(e)?;
            }
            if let Some(e) = row.get("size_sqft") {
                spec.size_sqft = parse_u32(e)?;
            }
            if let Some(e) = row.get("security_level") {
                spec.security_level = parse_text(e)?;
            }
            Ok(Command::InsertRoom {
                id: row.get("id").map(parse_ulid).transpose()?.unwrap_or_else(Ulid::new),
                spec,
            })
        }
        "bookings" => {
            let row = InsertRow::new(insert, BOOKING_COLUMNS)?;
            Ok(Command::InsertBooking(NewBooking {
                id: row.get("id").map(parse_ulid).transpose()?.unwrap_or_else(Ulid::new),
                room_id: parse_ulid(row.required("room_id")?)?,
                guest: parse_text(row.required("guest")?)?,
                check_in: parse_timestamp_expr(row.required("check_in")?)?,
                check_out: parse_timestamp_expr(row.required("check_out")?)?,
                special_requests: row.get("special_requests").map(parse_text).transpose()?.unwrap_or_default(),
                guest_count: row.get("guest_count").map(parse_u32).transpose()?,
            }))
        }
        "extensions" => {
            let row = InsertRow::new(insert, EXTENSION_COLUMNS)?;
            Ok(Command::ExtendBooking {
                booking_id: parse_ulid(row.required("booking_id")?)?,
                guest: parse_text(row.required("guest")?)?,
                check_out: parse_timestamp_expr(row.required("check_out")?)?,
            })
        }
        "check_ins" | "check_outs" => {
            let row = InsertRow::new(insert, FRONT_DESK_COLUMNS)?;
            let booking_id = parse_ulid(row.required("booking_id")?)?;
            if table == "check_ins" {
                Ok(Command::CheckIn { booking_id })
            } else {
                Ok(Command::CheckOut { booking_id })
            }
        }
        "ratings" => {
            let row = InsertRow::new(insert, RATING_COLUMNS)?;
            Ok(Command::RateStay {
                booking_id: parse_ulid(row.required("booking_id")?)?,
                guest: parse_text(row.required("guest")?)?,
                rating: parse_i64_expr(row.required("rating")?)?,
                review: row.get("review").map(parse_text).transpose()?,
            })
        }
        "reviews" => {
            let row = InsertRow::new(insert, REVIEW_COLUMNS)?;
            Ok(Command::InsertReview(NewReview {
                id: row.get("id").map(parse_ulid).transpose()?.unwrap_or_else(Ulid::new),
                room_id: parse_ulid(row.required("room_id")?)?,
                guest: parse_text(row.required("guest")?)?,
                text: parse_text(row.required("text")?)?,
                rating: row.get("rating").map(parse_i64_expr).transpose()?,
            }))
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

/// Column comparisons from an AND-chain WHERE clause.
#[derive(Default)]
struct Filters<'a> {
    terms: Vec<(String, ast::BinaryOperator, &'a Expr)>,
}

impl<'a> Filters<'a> {
    fn collect(expr: &'a Expr, out: &mut Self) -> Result<(), SqlError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::And,
                right,
            } => {
                Self::collect(left, out)?;
                Self::collect(right, out)
            }
            Expr::BinaryOp { left, op, right } => {
                let col = expr_column_name(left)
                    .ok_or_else(|| SqlError::Unsupported(format!("filter on {left}")))?;
                out.terms.push((col, op.clone(), right.as_ref()));
                Ok(())
            }
            Expr::Nested(inner) => Self::collect(inner, out),
            other => Err(SqlError::Unsupported(format!("WHERE {other}"))),
        }
    }

    fn find(&self, col: &str, ops: &[ast::BinaryOperator]) -> Option<&'a Expr> {
        self.terms
            .iter()
            .find(|(name, op, _)| name == col && ops.contains(op))
            .map(|(_, _, expr)| *expr)
    }

    fn eq(&self, col: &str) -> Option<&'a Expr> {
        self.find(col, &[ast::BinaryOperator::Eq])
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    let Some(from) = select.from.first() else {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    };
    let table = table_factor_name(&from.relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        Filters::collect(selection, &mut filters)?;
    }

    match table.as_str() {
        "availability" => {
            use ast::BinaryOperator as Op;
            let check_in = filters
                .find("check_in", &[Op::GtEq, Op::Eq])
                .map(parse_timestamp_expr)
                .transpose()?;
            let check_out = filters
                .find("check_out", &[Op::LtEq, Op::Eq])
                .map(parse_timestamp_expr)
                .transpose()?;
            match (check_in, check_out) {
                (Some(_), None) => Err(SqlError::MissingFilter("check_out")),
                (None, Some(_)) => Err(SqlError::MissingFilter("check_in")),
                _ => Ok(Command::SelectAvailability { check_in, check_out }),
            }
        }
        "rooms" => Ok(Command::SelectRooms {
            id: filters.eq("id").map(parse_ulid).transpose()?,
        }),
        "bookings" => {
            let room_id = filters.eq("room_id").map(parse_ulid).transpose()?;
            let guest = filters.eq("guest").map(parse_text).transpose()?;
            if room_id.is_none() && guest.is_none() {
                return Err(SqlError::MissingFilter("room_id or guest"));
            }
            Ok(Command::SelectBookings { room_id, guest })
        }
        "reviews" => Ok(Command::SelectReviews {
            room_id: parse_ulid(filters.eq("room_id").ok_or(SqlError::MissingFilter("room_id"))?)?,
        }),
        "room_detail" => Ok(Command::SelectRoomDetail {
            room_id: parse_ulid(filters.eq("room_id").ok_or(SqlError::MissingFilter("room_id"))?)?,
            guest: parse_text(filters.eq("guest").ok_or(SqlError::MissingFilter("guest"))?)?,
        }),
        "checked_in" => Ok(Command::SelectCheckedIn {
            guest: parse_text(filters.eq("guest").ok_or(SqlError::MissingFilter("guest"))?)?,
            room_id: filters.eq("room_id").map(parse_ulid).transpose()?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<&[Expr], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

/// `"Guest"` or `bookings.guest` → `guest`.
fn column_key(rendered: &str) -> String {
    let last = rendered.rsplit('.').next().unwrap_or(rendered);
    last.trim_matches('"').to_lowercase()
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_text(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    let s = parse_text(expr)?;
    Ulid::from_string(&s).map_err(|e| SqlError::Parse(format!("bad ULID {s:?}: {e}")))
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        return Ok(-parse_i64_expr(expr)?);
    }
    let s = parse_text(expr)?;
    s.trim()
        .parse()
        .map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}")))
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64_expr(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

fn parse_decimal(expr: &Expr) -> Result<Decimal, SqlError> {
    if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        return Ok(-parse_decimal(expr)?);
    }
    let s = parse_text(expr)?;
    Decimal::from_str(s.trim()).map_err(|e| SqlError::Parse(format!("bad decimal {s:?}: {e}")))
}

/// Quoted timestamps in any accepted layout, or bare integer milliseconds.
fn parse_timestamp_expr(expr: &Expr) -> Result<Ms, SqlError> {
    match extract_value(expr) {
        Some(Value::Number(..)) | None => parse_i64_expr(expr),
        Some(Value::SingleQuotedString(s)) => {
            parse_timestamp(s).map_err(|e| SqlError::BadTimestamp(e.to_string()))
        }
        Some(value) => Err(SqlError::Parse(format!("expected timestamp, got {value}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    MissingColumnList,
    MissingColumn(&'static str),
    /// (columns, values)
    WrongArity(usize, usize),
    MissingFilter(&'static str),
    BadTimestamp(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::MissingColumnList => write!(f, "INSERT needs an explicit column list"),
            SqlError::MissingColumn(c) => write!(f, "missing value for column: {c}"),
            SqlError::WrongArity(columns, values) => {
                write!(f, "{columns} columns but {values} values")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::BadTimestamp(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SqlError {}
