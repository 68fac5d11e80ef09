/// Schema Introspection Module
///
/// Hand-built informational queries against `pg_catalog`. They are plain
/// SQL strings: the session submits them through the statement router
/// exactly as if they had been typed, so they are timed and rendered like
/// any other query.

/// Schema that table descriptions are resolved in.
pub const DEFAULT_SCHEMA: &str = "public";

/// The informational listings reachable from meta-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogQuery {
    Databases,
    Tables,
    Schemas,
    Views,
    Indexes,
    Sequences,
    Functions,
    Roles,
    /// Bare table names of the default schema
    DefaultSchemaTables,
}

impl CatalogQuery {
    /// The SQL text submitted for this listing.
    pub fn sql(self) -> &'static str {
        match self {
            CatalogQuery::Databases => {
                "SELECT datname AS \"Name\", pg_catalog.pg_get_userbyid(datdba) AS \"Owner\", \
                 pg_catalog.pg_encoding_to_char(encoding) AS \"Encoding\" \
                 FROM pg_catalog.pg_database ORDER BY datname"
            }
            CatalogQuery::Tables => {
                "SELECT schemaname AS \"Schema\", tablename AS \"Name\", tableowner AS \"Owner\" \
                 FROM pg_catalog.pg_tables \
                 WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY schemaname, tablename"
            }
            CatalogQuery::Schemas => {
                "SELECT nspname AS \"Name\", pg_catalog.pg_get_userbyid(nspowner) AS \"Owner\" \
                 FROM pg_catalog.pg_namespace \
                 WHERE nspname !~ '^pg_' AND nspname <> 'information_schema' \
                 ORDER BY nspname"
            }
            CatalogQuery::Views => {
                "SELECT schemaname AS \"Schema\", viewname AS \"Name\", viewowner AS \"Owner\" \
                 FROM pg_catalog.pg_views \
                 WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY schemaname, viewname"
            }
            CatalogQuery::Indexes => {
                "SELECT schemaname AS \"Schema\", indexname AS \"Name\", tablename AS \"Table\" \
                 FROM pg_catalog.pg_indexes \
                 WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY schemaname, indexname"
            }
            CatalogQuery::Sequences => {
                "SELECT schemaname AS \"Schema\", sequencename AS \"Name\", sequenceowner AS \"Owner\" \
                 FROM pg_catalog.pg_sequences \
                 WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY schemaname, sequencename"
            }
            CatalogQuery::Functions => {
                "SELECT n.nspname AS \"Schema\", p.proname AS \"Name\", \
                 pg_catalog.pg_get_function_result(p.oid) AS \"Result data type\" \
                 FROM pg_catalog.pg_proc p \
                 LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace \
                 WHERE n.nspname NOT IN ('pg_catalog', 'information_schema') \
                 ORDER BY n.nspname, p.proname"
            }
            CatalogQuery::Roles => {
                "SELECT rolname AS \"Role name\", rolsuper AS \"Superuser\", rolinherit AS \"Inherit\", \
                 rolcreaterole AS \"Create role\", rolcreatedb AS \"Create DB\" \
                 FROM pg_catalog.pg_roles ORDER BY rolname"
            }
            CatalogQuery::DefaultSchemaTables => {
                "SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = 'public' ORDER BY tablename"
            }
        }
    }
}

/// Quotes a value as a SQL string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Column listing for one table of [`DEFAULT_SCHEMA`]: name, formatted
/// type and nullability, in physical order, skipping dropped columns.
pub fn describe_table_sql(table: &str) -> String {
    format!(
        "SELECT a.attname AS \"Column\", \
         pg_catalog.format_type(a.atttypid, a.atttypmod) AS \"Type\", \
         CASE WHEN a.attnotnull THEN 'not null' ELSE '' END AS \"Modifiers\" \
         FROM pg_catalog.pg_attribute a \
         WHERE a.attrelid = (\
         SELECT c.oid FROM pg_catalog.pg_class c \
         LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
         WHERE c.relname = {} AND n.nspname = {}) \
         AND a.attnum > 0 AND NOT a.attisdropped \
         ORDER BY a.attnum",
        quote_literal(table),
        quote_literal(DEFAULT_SCHEMA)
    )
}
