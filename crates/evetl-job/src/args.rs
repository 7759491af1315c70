// Job argument resolution
//
// The orchestration host passes its own `--key value` options alongside the
// job parameters. Only the keys this job understands reach clap; the rest
// are dropped so host-specific flags never fail the run.

use clap::Parser;

/// Option names accepted by the job (without the leading `--`)
pub const JOB_ARG_KEYS: &[&str] = &["JOB_NAME", "RAW_S3_PATH", "TARGET_S3_PATH", "JOB_RUN_ID"];

/// Transform raw EV charging-session CSV into partitioned Parquet
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "evetl-job")]
#[command(version)]
#[command(about = "Transform raw EV charging-session CSV into partitioned Parquet", long_about = None)]
pub struct JobArgs {
    /// Job name; scopes the run records under the target
    #[arg(long = "JOB_NAME", value_name = "NAME")]
    pub job_name: String,

    /// Source file or prefix, e.g. s3://bucket/raw/sessions.csv
    #[arg(long = "RAW_S3_PATH", value_name = "LOCATION")]
    pub raw_s3_path: String,

    /// Destination root for the partitioned dataset
    #[arg(long = "TARGET_S3_PATH", value_name = "LOCATION")]
    pub target_s3_path: String,

    /// Run id assigned by the orchestration service (generated when absent)
    #[arg(long = "JOB_RUN_ID", value_name = "ID")]
    pub job_run_id: Option<String>,
}

impl JobArgs {
    /// Parse from a full argv (program name first), ignoring unknown keys.
    pub fn resolve<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::try_parse_from(select_job_options(args))
    }
}

/// Keep the program name plus every known `--KEY value` / `--KEY=value` pair.
pub fn select_job_options<I, T>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut iter = args.into_iter().map(Into::into).peekable();
    let mut selected = Vec::new();

    if let Some(program) = iter.next() {
        selected.push(program);
    }

    while let Some(token) = iter.next() {
        let Some(option) = token.strip_prefix("--") else {
            continue;
        };

        let (key, inline_value) = match option.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (option.to_string(), None),
        };
        let known = JOB_ARG_KEYS.contains(&key.as_str());

        match inline_value {
            Some(value) => {
                if known {
                    selected.push(format!("--{}={}", key, value));
                }
            }
            None => {
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next(),
                    _ => None,
                };
                if known {
                    selected.push(format!("--{}", key));
                    if let Some(value) = value {
                        selected.push(value);
                    }
                }
            }
        }
    }

    selected
}
