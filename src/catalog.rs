//! A summary of everything in a snapshot, for operators checking what PLAN actually wrote.

use sqlx::SqlitePool;

use crate::schema::{self, SchemaMapping};
use crate::sqlx::quote_ident;

/// One table of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
	/// The table's name.
	pub name: String,

	/// Column names, in declaration order.
	pub columns: Vec<String>,

	/// Number of rows.
	pub rows: i64,
}

/// The tables of a snapshot and the layout detected from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
	/// Every user table, sorted by name.
	pub tables: Vec<Table>,

	/// The detected layout, if the snapshot looks like a PLAN database.
	pub mapping: Option<SchemaMapping>,
}

/// Lists every table of a snapshot with its columns and size.
#[tracing::instrument(skip_all, err(Display))]
pub async fn describe(pool: &SqlitePool) -> Result<Catalog, schema::Error> {
	let mut tables = Vec::new();

	for name in crate::sqlx::list_tables(pool).await? {
		let columns = crate::sqlx::list_columns(pool, &name).await?;
		let rows = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", quote_ident(&name)))
			.fetch_one(pool)
			.await?;

		tables.push(Table { name, columns, rows });
	}

	let mapping = schema::inspect(pool).await?;

	Ok(Catalog { tables, mapping })
}
