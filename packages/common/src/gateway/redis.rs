//! Redis-backed data gateway.
//!
//! Problems are stored as JSON strings under `{prefix}:problem:{id}`.
//! Submissions are stored as hashes under `{prefix}:submission:{id}` so that a
//! status change touches only the status, result and timestamp fields.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use tracing::debug;

use super::error::GatewayError;
use super::traits::DataGateway;
use crate::{Problem, Submission, SubmissionStatus};

/// Compare-and-set of a submission's status. Checks existence and that the
/// stored status is one of the comma-separated statuses in ARGV[5], keeps
/// `updated_at` monotonic and writes status + result in one atomic step.
/// Returns `{code, stored_status}`: 1 written, 0 missing, -1 refused.
const UPDATE_STATUS_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {0, ''}
end
local current = redis.call('HGET', KEYS[1], 'status') or ''
local accepted = false
for status in string.gmatch(ARGV[5], '[^,]+') do
  if status == current then
    accepted = true
  end
end
if not accepted then
  return {-1, current}
end
local prev = tonumber(redis.call('HGET', KEYS[1], 'updated_at') or '0') or 0
local now = tonumber(ARGV[2])
if prev > now then
  now = prev
end
redis.call('HSET', KEYS[1], 'status', ARGV[1], 'updated_at', tostring(now))
if ARGV[3] == '1' then
  redis.call('HSET', KEYS[1], 'result', ARGV[4])
end
return {1, current}
";

impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

pub struct RedisGateway {
    conn: MultiplexedConnection,
    key_prefix: String,
    update_script: Script,
}

impl RedisGateway {
    /// Connect to Redis at `url`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
            update_script: Script::new(UPDATE_STATUS_SCRIPT),
        })
    }

    fn problem_key(&self, id: &str) -> String {
        format!("{}:problem:{}", self.key_prefix, id)
    }

    fn submission_key(&self, id: &str) -> String {
        format!("{}:submission:{}", self.key_prefix, id)
    }

    /// Insert or replace a problem.
    pub async fn put_problem(&self, problem: &Problem) -> Result<(), GatewayError> {
        let payload = serde_json::to_string(problem)?;
        let mut conn = self.conn.clone();
        let (): () = redis::cmd("SET")
            .arg(self.problem_key(&problem.id))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, GatewayError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| GatewayError::Serialization(format!("submission hash missing '{name}'")))
}

fn parse_field<T>(fields: &HashMap<String, String>, name: &str) -> Result<T, GatewayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    field(fields, name)?
        .parse::<T>()
        .map_err(|e| GatewayError::Serialization(format!("invalid '{name}': {e}")))
}

fn submission_from_hash(fields: HashMap<String, String>) -> Result<Submission, GatewayError> {
    let kind = serde_json::from_value(serde_json::Value::String(
        field(&fields, "type")?.to_string(),
    ))?;

    Ok(Submission {
        id: field(&fields, "id")?.to_string(),
        user_id: field(&fields, "user_id")?.to_string(),
        problem_id: field(&fields, "problem_id")?.to_string(),
        language: parse_field(&fields, "language")?,
        code: field(&fields, "code")?.to_string(),
        kind,
        status: parse_field(&fields, "status")?,
        result: fields.get("result").cloned(),
        created_at: parse_field(&fields, "created_at")?,
        updated_at: parse_field(&fields, "updated_at")?,
    })
}

#[async_trait]
impl DataGateway for RedisGateway {
    async fn get_problem(&self, id: &str) -> Result<Problem, GatewayError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.problem_key(id))
            .query_async(&mut conn)
            .await?;
        let raw = raw.ok_or_else(|| GatewayError::problem_not_found(id))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save_submission(&self, submission: &Submission) -> Result<(), GatewayError> {
        let key = self.submission_key(&submission.id);
        let mut hset = redis::cmd("HSET");
        hset.arg(&key)
            .arg("id")
            .arg(&submission.id)
            .arg("user_id")
            .arg(&submission.user_id)
            .arg("problem_id")
            .arg(&submission.problem_id)
            .arg("language")
            .arg(submission.language.as_str())
            .arg("code")
            .arg(&submission.code)
            .arg("type")
            .arg(submission.kind.as_str())
            .arg("status")
            .arg(submission.status.as_str())
            .arg("created_at")
            .arg(submission.created_at)
            .arg("updated_at")
            .arg(submission.updated_at);
        if let Some(result) = &submission.result {
            hset.arg("result").arg(result);
        }

        let mut conn = self.conn.clone();
        let (): () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(&key)
            .ignore()
            .add_command(hset)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!(submission_id = %submission.id, "Saved submission");
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> Result<Option<Submission>, GatewayError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.submission_key(id))
            .query_async(&mut conn)
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        submission_from_hash(fields).map(Some)
    }

    async fn update_submission_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        result: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let (code, current): (i64, String) = self
            .update_script
            .key(self.submission_key(id))
            .arg(status.as_str())
            .arg(Utc::now().timestamp())
            .arg(if result.is_some() { "1" } else { "0" })
            .arg(result.unwrap_or_default())
            .arg(accepted_from(status))
            .invoke_async(&mut conn)
            .await?;

        match code {
            1 => Ok(()),
            0 => Err(GatewayError::submission_not_found(id)),
            _ => Err(GatewayError::TransitionRefused {
                id: id.to_string(),
                from: current.parse().map_err(|e| GatewayError::Serialization(format!("{e}")))?,
                to: status,
            }),
        }
    }
}

/// Stored statuses that accept a write of `next`, comma-separated.
fn accepted_from(next: SubmissionStatus) -> String {
    SubmissionStatus::ALL
        .iter()
        .filter(|stored| stored.accepts_write(next))
        .map(|stored| stored.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
