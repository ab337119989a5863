//! Query builder utilities for the PostgreSQL repositories
//!
//! Every list query in CareDesk is `SELECT ... WHERE 1=1` followed by a
//! run of optional filters. [`FilteredQuery`] pushes each filter only when a
//! value was supplied and always binds values, so no user text is spliced
//! into SQL.

use sqlx::{
    postgres::PgArguments,
    query::{Query, QueryScalar},
    Encode, Postgres, QueryBuilder, Type,
};

/// Filtered select/count builder
///
/// Example usage:
/// ```rust,ignore
/// let mut query = FilteredQuery::select(PATIENT_COLUMNS, "patients");
/// query
///     .filter_not_deleted()
///     .filter_eq("gender", filter.gender.map(|g| g.as_str()))
///     .search(&["first_name", "last_name", "mrn"], filter.search.as_deref())
///     .order_by("created_at DESC")
///     .paginate(limit, offset);
///
/// let rows = query.build().fetch_all(&pool).await?;
/// ```
pub struct FilteredQuery<'a> {
    query: QueryBuilder<'a, Postgres>,
}

impl<'a> FilteredQuery<'a> {
    /// `SELECT <columns> FROM <table> WHERE 1=1`
    pub fn select(columns: &str, table: &str) -> Self {
        Self {
            query: QueryBuilder::new(format!("SELECT {columns} FROM {table} WHERE 1=1")),
        }
    }

    /// `SELECT COUNT(*) FROM <table> WHERE 1=1`
    pub fn count(table: &str) -> Self {
        Self {
            query: QueryBuilder::new(format!("SELECT COUNT(*) FROM {table} WHERE 1=1")),
        }
    }

    /// Add an equality filter (only if value is Some)
    pub fn filter_eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        self.filter_op(column, "=", value)
    }

    /// Add a `>=` filter (only if value is Some)
    pub fn filter_gte<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        self.filter_op(column, ">=", value)
    }

    /// Add a `<` filter (only if value is Some)
    pub fn filter_lt<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        self.filter_op(column, "<", value)
    }

    fn filter_op<T>(&mut self, column: &str, op: &str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if let Some(val) = value {
            self.query.push(format!(" AND {column} {op} "));
            self.query.push_bind(val);
        }
        self
    }

    /// Case-insensitive substring match over any of `columns`
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let term = match term.map(str::trim) {
            Some(term) if !term.is_empty() => term,
            _ => return self,
        };
        let pattern = like_pattern(term);
        self.query.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.query.push(" OR ");
            }
            self.query.push(format!("{column} ILIKE "));
            self.query.push_bind(pattern.clone());
        }
        self.query.push(")");
        self
    }

    /// Append a fixed condition, e.g. `stock_quantity <= reorder_level`
    pub fn filter_raw(&mut self, condition: &str) -> &mut Self {
        self.query.push(format!(" AND {condition}"));
        self
    }

    /// Filter for non-deleted records only
    pub fn filter_not_deleted(&mut self) -> &mut Self {
        self.filter_raw("is_deleted = false")
    }

    /// Add ORDER BY clause
    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.query.push(format!(" ORDER BY {clause}"));
        self
    }

    /// Apply LIMIT/OFFSET
    pub fn paginate(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.query.push(" LIMIT ");
        self.query.push_bind(limit);
        self.query.push(" OFFSET ");
        self.query.push_bind(offset);
        self
    }

    /// Build the final row query
    pub fn build(&mut self) -> Query<'_, Postgres, PgArguments> {
        self.query.build()
    }

    /// Build a single `i64` scalar query, used with [`FilteredQuery::count`]
    pub fn build_count(&mut self) -> QueryScalar<'_, Postgres, i64, PgArguments> {
        self.query.build_query_scalar::<i64>()
    }

    pub fn sql(&self) -> &str {
        self.query.sql()
    }
}

/// `%term%` with LIKE wildcards in the term escaped
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_filters_only_when_present() {
        let mut query = FilteredQuery::select("id", "patients");
        query
            .filter_not_deleted()
            .filter_eq("gender", Some("female"))
            .filter_eq::<Uuid>("user_id", None)
            .order_by("created_at DESC")
            .paginate(20, 0);

        assert_eq!(
            query.sql(),
            "SELECT id FROM patients WHERE 1=1 AND is_deleted = false AND gender = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_search_binds_each_column() {
        let mut query = FilteredQuery::count("medicines");
        query.search(&["name", "generic_name"], Some("  amox "));
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM medicines WHERE 1=1 AND (name ILIKE $1 OR generic_name ILIKE $2)"
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut query = FilteredQuery::count("staff");
        query.search(&["first_name"], Some("   "));
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM staff WHERE 1=1");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
