use airtable_core::Fields;
use clap::{Parser, Subcommand};

/// Read and write Airtable records from the command line.
///
/// The API key is read from `AIRTABLE_API_KEY`. Flags override the
/// matching `AIRTABLE_*` variables.
#[derive(Parser, Debug)]
#[command(name = "airtable", version, about)]
pub struct Args {
    /// Base id (overrides AIRTABLE_BASE_ID).
    #[arg(long, global = true)]
    pub base_id: Option<String>,

    /// API root URL (overrides AIRTABLE_API_ROOT).
    #[arg(long, global = true)]
    pub api_root: Option<String>,

    /// Per-request timeout in milliseconds (overrides AIRTABLE_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List records, one page unless --all is given
    List {
        table: String,

        /// Query parameter as key=value, e.g. pageSize=10 or sort=Name:desc
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,

        /// Follow offsets and print every record
        #[arg(long)]
        all: bool,
    },

    /// Fetch one record
    Get { table: String, id: String },

    /// Create a record from a JSON object, or up to ten from a JSON array
    Create {
        table: String,
        #[arg(value_parser = parse_records)]
        records: Batch,
    },

    /// Replace every field of a record (fields not given are cleared)
    Update {
        table: String,
        id: String,
        #[arg(value_parser = parse_fields)]
        fields: Fields,
    },

    /// Change only the given fields of a record
    Patch {
        table: String,
        id: String,
        #[arg(value_parser = parse_fields)]
        fields: Fields,
    },

    /// Delete a record
    Delete { table: String, id: String },
}

/// One or more field maps given as a single JSON argument.
#[derive(Debug, Clone)]
pub struct Batch(pub Vec<Fields>);

pub fn parse() -> Args {
    Args::parse()
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn parse_fields(s: &str) -> Result<Fields, String> {
    serde_json::from_str(s).map_err(|e| format!("fields must be a JSON object: {e}"))
}

fn parse_records(s: &str) -> Result<Batch, String> {
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(serde_json::Value::Object(fields)) => Ok(Batch(vec![fields])),
        Ok(value @ serde_json::Value::Array(_)) => serde_json::from_value(value)
            .map(Batch)
            .map_err(|e| format!("every array item must be a JSON object: {e}")),
        Ok(_) => Err("expected a JSON object or an array of objects".to_string()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn list_collects_repeated_params() {
        let parsed = args(&[
            "airtable", "list", "Tasks", "-p", "pageSize=5", "--param", "sort=Name:desc", "--all",
        ]);
        match parsed.command {
            Command::List { table, params, all } => {
                assert_eq!(table, "Tasks");
                assert_eq!(
                    params,
                    vec![
                        ("pageSize".to_string(), "5".to_string()),
                        ("sort".to_string(), "Name:desc".to_string()),
                    ]
                );
                assert!(all);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn param_without_equals_is_rejected() {
        assert!(Args::try_parse_from(["airtable", "list", "Tasks", "-p", "pageSize"]).is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let parsed = args(&["airtable", "get", "Tasks", "rec1", "--base-id", "appX", "--timeout-ms", "250"]);
        assert_eq!(parsed.base_id.as_deref(), Some("appX"));
        assert_eq!(parsed.timeout_ms, Some(250));
        assert!(matches!(parsed.command, Command::Get { ref id, .. } if id == "rec1"));
    }

    #[test]
    fn create_accepts_object_or_array() {
        let single = args(&["airtable", "create", "Tasks", r#"{"Name":"a"}"#]);
        assert!(matches!(single.command, Command::Create { ref records, .. } if records.0.len() == 1));

        let batch = args(&["airtable", "create", "Tasks", r#"[{"Name":"a"},{"Name":"b"}]"#]);
        assert!(matches!(batch.command, Command::Create { ref records, .. } if records.0.len() == 2));

        assert!(Args::try_parse_from(["airtable", "create", "Tasks", "42"]).is_err());
        assert!(Args::try_parse_from(["airtable", "create", "Tasks", "[1]"]).is_err());
    }

    #[test]
    fn patch_requires_an_object() {
        let parsed = args(&["airtable", "patch", "Tasks", "rec1", r#"{"Done":true}"#]);
        match parsed.command {
            Command::Patch { fields, .. } => assert_eq!(fields["Done"], true),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Args::try_parse_from(["airtable", "patch", "Tasks", "rec1", "[]"]).is_err());
    }
}
