//! Spreadsheet import and export.
//!
//! Reading is delegated to `calamine` and writing to `rust_xlsxwriter`; this
//! module only maps rows onto customers and users.
//!
//! # Import layout
//!
//! First worksheet, header row first. Columns are found by name
//! (case-insensitive): `name` and `unique_id` are required, `total_orders`,
//! `tokens_earned` and `tokens_redeemed` are optional and default to 0.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use loyalty_card_core::{TokenLedger, UniqueCode};

use crate::db::{CustomerRepository, RepositoryError, UserRepository};
use crate::models::customer::{Customer, NewCustomer};
use crate::models::user::User;

/// Content type of generated workbooks.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const USER_HEADERS: [&str; 2] = ["username", "role"];
const CUSTOMER_HEADERS: [&str; 6] = [
    "name",
    "unique_id",
    "total_orders",
    "tokens_earned",
    "tokens_redeemed",
    "token_balance",
];

/// Errors from spreadsheet import or export.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    /// The upload is not a readable spreadsheet.
    #[error("could not read spreadsheet: {0}")]
    Read(#[from] calamine::Error),

    /// The workbook has no worksheets.
    #[error("spreadsheet has no worksheets")]
    NoWorksheet,

    /// A required header is absent.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    /// Writing the export workbook failed.
    #[error("could not write spreadsheet: {0}")]
    Write(#[from] XlsxError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A data row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based sheet row number, header included.
    pub row: usize,
    pub reason: String,
}

/// Rows accepted from a sheet, before they are stored.
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub customers: Vec<NewCustomer>,
    /// Rows without a name or unique code.
    pub dropped: usize,
    /// Rows with unusable values.
    pub skipped: Vec<SkippedRow>,
}

/// Result of an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub dropped: usize,
    pub skipped: Vec<SkippedRow>,
}

impl ImportSummary {
    /// One-line report for the admin page.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = format!("Imported {} customers", self.imported);
        if self.dropped > 0 {
            message.push_str(&format!(
                ", {} rows without name or unique_id ignored",
                self.dropped
            ));
        }
        if !self.skipped.is_empty() {
            let rows: Vec<String> = self.skipped.iter().map(|s| s.row.to_string()).collect();
            message.push_str(&format!(
                ", {} rows skipped (rows {})",
                self.skipped.len(),
                rows.join(", ")
            ));
        }
        message
    }
}

/// Spreadsheet import/export backed by the database.
pub struct SpreadsheetService<'a> {
    pool: &'a PgPool,
}

impl<'a> SpreadsheetService<'a> {
    /// Create a new spreadsheet service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Import customers from an uploaded workbook.
    ///
    /// Accepted rows are stored in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `SpreadsheetError::Read` if the bytes are not a workbook.
    /// Returns `SpreadsheetError::MissingColumn` if a required header is absent.
    /// Returns `SpreadsheetError::Repository` if storing fails; nothing is stored then.
    pub async fn import(&self, bytes: Vec<u8>) -> Result<ImportSummary, SpreadsheetError> {
        let parsed = parse_workbook(bytes)?;
        let imported = CustomerRepository::new(self.pool)
            .create_many(&parsed.customers)
            .await?;

        tracing::info!(
            imported,
            dropped = parsed.dropped,
            skipped = parsed.skipped.len(),
            "Customer import finished"
        );

        Ok(ImportSummary {
            imported,
            dropped: parsed.dropped,
            skipped: parsed.skipped,
        })
    }

    /// Build the export workbook from current state.
    ///
    /// # Errors
    ///
    /// Returns `SpreadsheetError::Repository` if loading fails.
    /// Returns `SpreadsheetError::Write` if the workbook cannot be built.
    pub async fn export(&self) -> Result<Vec<u8>, SpreadsheetError> {
        let users = UserRepository::new(self.pool).list_all().await?;
        let customers = CustomerRepository::new(self.pool).list_all().await?;
        export_workbook(&users, &customers)
    }
}

/// Parse the first worksheet of a workbook.
///
/// # Errors
///
/// Returns `SpreadsheetError::Read` if the bytes are not a workbook.
/// Returns `SpreadsheetError::NoWorksheet` if it has no sheets.
/// Returns `SpreadsheetError::MissingColumn` if a required header is absent.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<ParsedImport, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;

    parse_rows(range.rows())
}

/// Column positions found in the header row.
struct Columns {
    name: usize,
    unique_id: usize,
    total_orders: Option<usize>,
    tokens_earned: Option<usize>,
    tokens_redeemed: Option<usize>,
}

impl Columns {
    fn from_header(header: &[Data]) -> Result<Self, SpreadsheetError> {
        let find = |wanted: &str| {
            header.iter().position(|cell| {
                cell_text(cell).is_some_and(|text| text.eq_ignore_ascii_case(wanted))
            })
        };

        Ok(Self {
            name: find("name").ok_or(SpreadsheetError::MissingColumn("name"))?,
            unique_id: find("unique_id").ok_or(SpreadsheetError::MissingColumn("unique_id"))?,
            total_orders: find("total_orders"),
            tokens_earned: find("tokens_earned"),
            tokens_redeemed: find("tokens_redeemed"),
        })
    }
}

/// Map sheet rows (header first) onto new customers.
///
/// # Errors
///
/// Returns `SpreadsheetError::MissingColumn` if the header lacks `name` or
/// `unique_id`, including when there is no header at all.
pub fn parse_rows<'r, I>(rows: I) -> Result<ParsedImport, SpreadsheetError>
where
    I: IntoIterator<Item = &'r [Data]>,
{
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or(SpreadsheetError::MissingColumn("name"))?;
    let columns = Columns::from_header(header)?;
    let mut parsed = ParsedImport::default();

    for (index, row) in rows.enumerate() {
        // Header is row 1.
        let row_number = index + 2;

        let name = row.get(columns.name).and_then(cell_text);
        let code = row.get(columns.unique_id).and_then(cell_text);
        let (Some(name), Some(code)) = (name, code) else {
            parsed.dropped += 1;
            continue;
        };

        match parse_customer(row, &columns, name, &code) {
            Ok(customer) => parsed.customers.push(customer),
            Err(reason) => parsed.skipped.push(SkippedRow {
                row: row_number,
                reason,
            }),
        }
    }

    Ok(parsed)
}

fn parse_customer(
    row: &[Data],
    columns: &Columns,
    name: String,
    code: &str,
) -> Result<NewCustomer, String> {
    let unique_id = UniqueCode::from_import(code).map_err(|e| e.to_string())?;
    let counter = |column: Option<usize>, label: &str| {
        cell_counter(column.and_then(|c| row.get(c)))
            .ok_or_else(|| format!("{label} is not a whole number"))
    };

    let ledger = TokenLedger::new(
        counter(columns.total_orders, "total_orders")?,
        counter(columns.tokens_earned, "tokens_earned")?,
        counter(columns.tokens_redeemed, "tokens_redeemed")?,
    )
    .map_err(|e| e.to_string())?;

    Ok(NewCustomer {
        name,
        unique_id,
        ledger,
    })
}

/// Trimmed text of a cell; whole floats render without a fraction.
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            #[allow(clippy::cast_possible_truncation)] // bounded above
            let whole = *f as i64;
            whole.to_string()
        }
        other => other.to_string(),
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Integer value of a counter cell. Blank means 0; fractions are truncated.
fn cell_counter(cell: Option<&Data>) -> Option<i32> {
    match cell {
        None | Some(Data::Empty) => Some(0),
        Some(Data::Int(i)) => i32::try_from(*i).ok(),
        Some(Data::Float(f)) => float_to_i32(*f),
        Some(Data::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0);
            }
            s.parse::<i32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i32))
        }
        Some(_) => None,
    }
}

fn float_to_i32(f: f64) -> Option<i32> {
    let t = f.trunc();
    if t.is_finite() && t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX) {
        #[allow(clippy::cast_possible_truncation)] // range checked above
        Some(t as i32)
    } else {
        None
    }
}

/// Build an export workbook with `Users` and `Customers` sheets.
///
/// # Errors
///
/// Returns `SpreadsheetError::Write` if the workbook cannot be built.
pub fn export_workbook(users: &[User], customers: &[Customer]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Users")?;
        for (col, header) in (0u16..).zip(USER_HEADERS) {
            sheet.write_string_with_format(0, col, header, &bold)?;
        }
        for (row, user) in (1u32..).zip(users) {
            sheet.write_string(row, 0, user.username.as_str())?;
            sheet.write_string(row, 1, user.role.as_str())?;
        }
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Customers")?;
        for (col, header) in (0u16..).zip(CUSTOMER_HEADERS) {
            sheet.write_string_with_format(0, col, header, &bold)?;
        }
        for (row, customer) in (1u32..).zip(customers) {
            let ledger = &customer.ledger;
            sheet.write_string(row, 0, &customer.name)?;
            sheet.write_string(row, 1, customer.unique_id.as_str())?;
            sheet.write_number(row, 2, ledger.total_orders())?;
            sheet.write_number(row, 3, ledger.tokens_earned())?;
            sheet.write_number(row, 4, ledger.tokens_redeemed())?;
            sheet.write_number(row, 5, ledger.balance())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Download name for an export taken at `now`.
#[must_use]
pub fn export_filename(now: NaiveDateTime) -> String {
    format!("loyalty_export_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}
