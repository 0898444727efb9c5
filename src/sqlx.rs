//! Helpers and extension traits for [`sqlx`].

use std::ops::{Deref, DerefMut};
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Maximum number of connections to a snapshot; one per leaderboard query.
const MAX_CONNECTIONS: u32 = 3;

/// Opens a snapshot file for reading.
#[tracing::instrument(skip_all, fields(path = %path.display()), err(Debug))]
pub async fn open_snapshot(path: &Path) -> sqlx::Result<SqlitePool> {
	let options = SqliteConnectOptions::new()
		.filename(path)
		.read_only(true)
		.immutable(true);

	SqlitePoolOptions::new()
		.max_connections(MAX_CONNECTIONS)
		.connect_with(options)
		.await
}

/// Lists the names of all user tables in the database.
pub async fn list_tables(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
	sqlx::query_scalar::<_, String>(
		"SELECT name
		 FROM sqlite_master
		 WHERE type = 'table'
		   AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
		 ORDER BY name",
	)
	.fetch_all(pool)
	.await
}

/// Lists the column names of `table`, in declaration order.
pub async fn list_columns(pool: &SqlitePool, table: &str) -> sqlx::Result<Vec<String>> {
	sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) ORDER BY cid")
		.bind(table)
		.fetch_all(pool)
		.await
}

/// Quotes an identifier for use in SQL.
///
/// Table and column names come from the snapshot itself, so they are never trusted.
pub fn quote_ident(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A column of a table alias, quoted (`p."uuid"`).
pub fn column(alias: &str, column: &str) -> String {
	format!("{alias}.{}", quote_ident(column))
}

/// Query builder for inserting `WHERE` and `AND` clauses into a query.
///
/// This can be used transparently like a [`QueryBuilder`], but also has extra methods.
/// See [`FilteredQuery::filter()`] for more details.
pub struct FilteredQuery<'q> {
	/// The underlying query builder.
	query: QueryBuilder<'q, Sqlite>,

	/// The current state of the filter.
	filter: Filter,
}

/// State machine for determining whether to insert `WHERE` or `AND` into a query.
#[derive(Debug, Default, Clone, Copy)]
enum Filter {
	/// SQL `WHERE` clause.
	#[default]
	Where,

	/// SQL `AND` clause.
	And,
}

impl Filter {
	/// The corresponding SQL for the current state.
	const fn sql(self) -> &'static str {
		match self {
			Self::Where => " WHERE ",
			Self::And => " AND ",
		}
	}
}

impl<'q> FilteredQuery<'q> {
	/// Creates a new [`FilteredQuery`] from a base `query`.
	///
	/// This is a wrapper over [`QueryBuilder::new()`].
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: QueryBuilder::new(query), filter: Filter::default() }
	}

	/// Filter by a specific `column` and compare it with a `value`.
	///
	/// This will insert `WHERE {column} {value}` into the query, which means the comparison
	/// operator must be included in `column`.
	///
	/// `WHERE` / `AND` will be inserted appropriately.
	pub fn filter<V>(&mut self, column: &str, value: V) -> &mut Self
	where
		V: sqlx::Type<Sqlite> + sqlx::Encode<'q, Sqlite> + Send + 'q,
	{
		self.query
			.push(self.filter.sql())
			.push(column)
			.push_bind(value);

		self.filter = Filter::And;
		self
	}

	/// Inserts a raw SQL condition.
	pub fn filter_raw(&mut self, condition: &str) -> &mut Self {
		self.query.push(self.filter.sql()).push(condition);
		self.filter = Filter::And;
		self
	}

	/// Excludes rows where `expr` is one of `values`.
	///
	/// Nothing is inserted if `values` is empty.
	pub fn filter_not_in<I, V>(&mut self, expr: &str, values: I) -> &mut Self
	where
		I: IntoIterator<Item = V>,
		V: sqlx::Type<Sqlite> + sqlx::Encode<'q, Sqlite> + Send + 'q,
	{
		let mut values = values.into_iter().peekable();

		if values.peek().is_none() {
			return self;
		}

		self.query
			.push(self.filter.sql())
			.push(expr)
			.push(" NOT IN (");

		let mut list = self.query.separated(", ");

		for value in values {
			list.push_bind(value);
		}

		list.push_unseparated(")");

		self.filter = Filter::And;
		self
	}
}

impl<'q> Deref for FilteredQuery<'q> {
	type Target = QueryBuilder<'q, Sqlite>;

	fn deref(&self) -> &Self::Target {
		&self.query
	}
}

impl DerefMut for FilteredQuery<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.query
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use sqlx::sqlite::SqlitePoolOptions;
	use sqlx::SqlitePool;

	use super::{quote_ident, FilteredQuery};

	/// An in-memory database seeded with `schema`.
	///
	/// A single connection that never expires, so every query sees the same database.
	pub(crate) async fn memory_pool(schema: &str) -> anyhow::Result<SqlitePool> {
		let pool = SqlitePoolOptions::new()
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect("sqlite::memory:")
			.await?;

		sqlx::raw_sql(schema).execute(&pool).await?;

		Ok(pool)
	}

	#[test]
	fn quoting() {
		assert_eq!(quote_ident("plan_users"), r#""plan_users""#, "plain identifier");
		assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#, "embedded quotes are doubled");
	}

	#[test]
	fn where_then_and() {
		let mut query = FilteredQuery::new("SELECT * FROM t");
		query.filter("a > ", 1_i64);
		query.filter_not_in("b", Vec::<String>::new());
		query.filter_not_in("c", [String::from("x"), String::from("y")]);

		assert_eq!(
			query.sql(),
			"SELECT * FROM t WHERE a > ? AND c NOT IN (?, ?)",
			"empty NOT IN lists are skipped",
		);
	}

	#[tokio::test]
	async fn introspection() -> anyhow::Result<()> {
		let pool = memory_pool("CREATE TABLE plan_users (id INTEGER, uuid TEXT, name TEXT);").await?;

		assert_eq!(super::list_tables(&pool).await?, ["plan_users"], "one table");
		assert_eq!(
			super::list_columns(&pool, "plan_users").await?,
			["id", "uuid", "name"],
			"columns in declaration order",
		);
		assert!(super::list_columns(&pool, "missing").await?.is_empty(), "unknown table");

		Ok(())
	}
}
