//! Static schema of the filterable columns of each record stream

use serde::Serialize;

use crate::models::StreamKind;

/// One queryable column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub description: &'static str,
}

/// A comparison operator offered by the suggestion dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub op: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

const fn field(
    name: &'static str,
    field_type: &'static str,
    description: &'static str,
) -> FieldDescriptor {
    FieldDescriptor {
        name,
        field_type,
        description,
    }
}

static LOG_FIELDS: [FieldDescriptor; 11] = [
    field("timestamp", "TIMESTAMP", "The timestamp when the log entry was recorded"),
    field("path", "VARCHAR", "Source file path and line number of the log"),
    field("target", "VARCHAR", "Target module or component of the log"),
    field("log_level", "VARCHAR", "Log level (e.g., INFO, ERROR, WARN, DEBUG)"),
    field("cluster_id", "VARCHAR", "Identifier of the cluster"),
    field("node_id", "VARCHAR", "Identifier of the node"),
    field("warehouse_id", "VARCHAR", "Identifier of the warehouse"),
    field("query_id", "VARCHAR", "Query ID associated with the log"),
    field("message", "VARCHAR", "Log message content"),
    field("fields", "VARIANT", "Additional fields (as a JSON object)"),
    field("batch_number", "BIGINT", "Internal use, no special meaning"),
];

static QUERY_FIELDS: [FieldDescriptor; 50] = [
    field("log_type", "TINYINT", "The query status"),
    field("log_type_name", "VARCHAR", "The name of query status"),
    field("handler_type", "VARCHAR", "The protocol or handler used for the query (e.g., HTTPQuery, MySQL)"),
    field("tenant_id", "VARCHAR", "The tenant identifier"),
    field("cluster_id", "VARCHAR", "The cluster identifier"),
    field("node_id", "VARCHAR", "The node identifier"),
    field("sql_user", "VARCHAR", "The user who executed the query"),
    field("sql_user_quota", "VARCHAR", "The quota information of the user"),
    field("sql_user_privileges", "VARCHAR", "The privileges of the user"),
    field("query_id", "VARCHAR", "The unique identifier for the query"),
    field("query_kind", "VARCHAR", "The kind of query (e.g., Query, Insert, CopyIntoTable, etc.)"),
    field("query_text", "VARCHAR", "The SQL text of the query"),
    field("query_hash", "VARCHAR", "The hash value of the query text"),
    field("query_parameterized_hash", "VARCHAR", "The hash value of the query regardless of the specific values"),
    field("event_date", "DATE", "The date when the event occurred"),
    field("event_time", "TIMESTAMP", "The timestamp when the event occurred"),
    field("query_start_time", "TIMESTAMP", "The timestamp when the query started"),
    field("query_duration_ms", "BIGINT", "The duration of the query in milliseconds"),
    field("query_queued_duration_ms", "BIGINT", "The time the query spent in the queue in milliseconds"),
    field("current_database", "VARCHAR", "The database in use when the query was executed"),
    field("written_rows", "BIGINT UNSIGNED", "The number of rows written by the query"),
    field("written_bytes", "BIGINT UNSIGNED", "The number of bytes written by the query"),
    field("join_spilled_rows", "BIGINT UNSIGNED", "The number of rows spilled during join operations"),
    field("join_spilled_bytes", "BIGINT UNSIGNED", "The number of bytes spilled during join operations"),
    field("agg_spilled_rows", "BIGINT UNSIGNED", "The number of rows spilled during aggregation operations"),
    field("agg_spilled_bytes", "BIGINT UNSIGNED", "The number of bytes spilled during aggregation operations"),
    field("group_by_spilled_rows", "BIGINT UNSIGNED", "The number of rows spilled during group by operations"),
    field("group_by_spilled_bytes", "BIGINT UNSIGNED", "The number of bytes spilled during group by operations"),
    field("written_io_bytes", "BIGINT UNSIGNED", "The number of bytes written to IO"),
    field("written_io_bytes_cost_ms", "BIGINT UNSIGNED", "The IO cost in milliseconds for writing"),
    field("scan_rows", "BIGINT UNSIGNED", "The number of rows scanned by the query"),
    field("scan_bytes", "BIGINT UNSIGNED", "The number of bytes scanned by the query"),
    field("scan_io_bytes", "BIGINT UNSIGNED", "The number of IO bytes read during scanning"),
    field("scan_io_bytes_cost_ms", "BIGINT UNSIGNED", "The IO cost in milliseconds for scanning"),
    field("scan_partitions", "BIGINT UNSIGNED", "The number of partitions scanned"),
    field("total_partitions", "BIGINT UNSIGNED", "The total number of partitions involved"),
    field("result_rows", "BIGINT UNSIGNED", "The number of rows in the query result"),
    field("result_bytes", "BIGINT UNSIGNED", "The number of bytes in the query result"),
    field("bytes_from_remote_disk", "BIGINT UNSIGNED", "The number of bytes read from remote disk"),
    field("bytes_from_local_disk", "BIGINT UNSIGNED", "The number of bytes read from local disk"),
    field("bytes_from_memory", "BIGINT UNSIGNED", "The number of bytes read from memory"),
    field("client_address", "VARCHAR", "The address of the client that issued the query"),
    field("user_agent", "VARCHAR", "The user agent string of the client"),
    field("exception_code", "INT", "The exception code if the query failed"),
    field("exception_text", "VARCHAR", "The exception message if the query failed"),
    field("server_version", "VARCHAR", "The version of the server that processed the query"),
    field("query_tag", "VARCHAR", "The tag associated with the query"),
    field("has_profile", "BOOLEAN", "Whether the query has an associated execution profile"),
    field("peek_memory_usage", "VARIANT", "The peak memory usage during query execution (as a JSON object)"),
    field("session_id", "VARCHAR", "The session identifier associated with the query"),
];

static OPERATORS: [Operator; 14] = [
    Operator { op: "=", description: "Equal to", example: "sql_user = 'admin'" },
    Operator { op: "!=", description: "Not equal to", example: "log_level != 'INFO'" },
    Operator { op: "<>", description: "Not equal to (alternative)", example: "exception_code <> 0" },
    Operator { op: ">", description: "Greater than", example: "query_duration_ms > 1000" },
    Operator { op: ">=", description: "Greater than or equal", example: "result_rows >= 100" },
    Operator { op: "<", description: "Less than", example: "scan_bytes < 1000000" },
    Operator { op: "<=", description: "Less than or equal", example: "written_rows <= 50" },
    Operator { op: "LIKE", description: "Pattern matching", example: "message LIKE '%error%'" },
    Operator { op: "NOT LIKE", description: "Pattern not matching", example: "query_text NOT LIKE '%DROP%'" },
    Operator { op: "IN", description: "In list of values", example: "log_level IN ('ERROR', 'WARN')" },
    Operator { op: "NOT IN", description: "Not in list of values", example: "handler_type NOT IN ('MySQL')" },
    Operator { op: "IS NULL", description: "Is null", example: "exception_text IS NULL" },
    Operator { op: "IS NOT NULL", description: "Is not null", example: "query_tag IS NOT NULL" },
    Operator { op: "BETWEEN", description: "Between two values", example: "query_duration_ms BETWEEN 100 AND 5000" },
];

/// Fields of one stream's table
pub fn field_suggestions(kind: StreamKind) -> &'static [FieldDescriptor] {
    match kind {
        StreamKind::Logs => &LOG_FIELDS,
        StreamKind::Queries => &QUERY_FIELDS,
    }
}

/// Fields for a table given by name; unknown names have no fields
pub fn field_suggestions_for(table: &str) -> &'static [FieldDescriptor] {
    table
        .parse::<StreamKind>()
        .map(field_suggestions)
        .unwrap_or(&[])
}

pub fn operator_suggestions() -> &'static [Operator] {
    &OPERATORS
}

/// Known values of low-cardinality columns; empty for everything else
pub fn value_suggestions(field_name: &str) -> &'static [&'static str] {
    match field_name {
        "log_level" => &["INFO", "ERROR", "WARN", "DEBUG", "TRACE"],
        "handler_type" => &["HTTPQuery", "MySQL", "FlightSQL", "ClickHouse"],
        "query_kind" => &[
            "Query",
            "Insert",
            "CopyIntoTable",
            "Update",
            "Delete",
            "CreateTable",
            "DropTable",
        ],
        "log_type_name" => &["Start", "Finish", "Error", "Aborted"],
        "has_profile" => &["true", "false"],
        _ => &[],
    }
}

/// Case-insensitive lookup of a field in a stream's table
pub fn find_field(kind: StreamKind, name: &str) -> Option<&'static FieldDescriptor> {
    field_suggestions(kind)
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(field_suggestions(StreamKind::Logs).len(), 11);
        assert_eq!(field_suggestions(StreamKind::Queries).len(), 50);
        assert_eq!(operator_suggestions().len(), 14);
    }

    #[test]
    fn test_unknown_table_has_no_fields() {
        assert!(field_suggestions_for("metrics").is_empty());
        assert_eq!(field_suggestions_for("query_history").len(), 50);
    }

    #[test]
    fn test_value_suggestions() {
        assert_eq!(value_suggestions("log_level")[1], "ERROR");
        assert!(value_suggestions("message").is_empty());
    }

    #[test]
    fn test_find_field_ignores_case() {
        assert_eq!(find_field(StreamKind::Logs, "LOG_LEVEL").map(|f| f.name), Some("log_level"));
        assert!(find_field(StreamKind::Logs, "sql_user").is_none());
    }
}
