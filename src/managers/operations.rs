use crate::errors::ToolError;
use crate::services::jules_client::{CreateSession, JulesClient, PageQuery};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every backend operation exposed as a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSources,
    GetSource,
    ListSessions,
    CreateSession,
    GetSession,
    DeleteSession,
    ApprovePlan,
    SendMessage,
    ListActivities,
    GetActivity,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::ListSources,
        Operation::GetSource,
        Operation::ListSessions,
        Operation::CreateSession,
        Operation::GetSession,
        Operation::DeleteSession,
        Operation::ApprovePlan,
        Operation::SendMessage,
        Operation::ListActivities,
        Operation::GetActivity,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            Operation::ListSources => "list_sources",
            Operation::GetSource => "get_source",
            Operation::ListSessions => "list_sessions",
            Operation::CreateSession => "create_session",
            Operation::GetSession => "get_session",
            Operation::DeleteSession => "delete_session",
            Operation::ApprovePlan => "approve_plan",
            Operation::SendMessage => "send_message",
            Operation::ListActivities => "list_activities",
            Operation::GetActivity => "get_activity",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tool_name() == name)
    }

    /// Parses `args` for this operation and issues the matching client call.
    pub async fn dispatch(self, client: &JulesClient, args: Value) -> Result<Value, ToolError> {
        let tool = self.tool_name();
        let result = match self {
            Operation::ListSources => client.list_sources().await,
            Operation::GetSource => {
                let args: SourceArgs = parse_args(tool, args)?;
                client.get_source(&args.source_name).await
            }
            Operation::ListSessions => {
                let args: PageArgs = parse_args(tool, args)?;
                client.list_sessions(&args.into()).await
            }
            Operation::CreateSession => {
                let args: CreateSessionArgs = parse_args(tool, args)?;
                client.create_session(&args.into()).await
            }
            Operation::GetSession => {
                let args: SessionArgs = parse_args(tool, args)?;
                client.get_session(&args.session_name).await
            }
            Operation::DeleteSession => {
                let args: SessionArgs = parse_args(tool, args)?;
                client.delete_session(&args.session_name).await
            }
            Operation::ApprovePlan => {
                let args: SessionArgs = parse_args(tool, args)?;
                client.approve_plan(&args.session_name).await
            }
            Operation::SendMessage => {
                let args: SendMessageArgs = parse_args(tool, args)?;
                client.send_message(&args.session_name, &args.prompt).await
            }
            Operation::ListActivities => {
                let args: ListActivitiesArgs = parse_args(tool, args)?;
                client
                    .list_activities(&args.session_name, &args.page.into())
                    .await
            }
            Operation::GetActivity => {
                let args: ActivityArgs = parse_args(tool, args)?;
                client.get_activity(&args.activity_name).await
            }
        };
        result.map_err(ToolError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct SourceArgs {
    pub source_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionArgs {
    pub session_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityArgs {
    pub activity_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PageArgs {
    #[serde(default, deserialize_with = "whole_number")]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

impl From<PageArgs> for PageQuery {
    fn from(args: PageArgs) -> Self {
        PageQuery {
            page_size: args.page_size,
            page_token: args.page_token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListActivitiesArgs {
    pub session_name: String,
    #[serde(flatten)]
    pub page: PageArgs,
}

/// Accepts `10` and `10.0` alike; JSON encoders on the caller side do not
/// agree on how to write whole numbers.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match &value {
        Value::Null => Ok(None),
        Value::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a whole number, got {}", number))),
        other => Err(D::Error::custom(format!("expected a number, got {}", other))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionArgs {
    pub source: String,
    pub instruction: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub require_plan_approval: Option<bool>,
    #[serde(default)]
    pub auto_pr: Option<bool>,
}

impl From<CreateSessionArgs> for CreateSession {
    fn from(args: CreateSessionArgs) -> Self {
        CreateSession::new(args.source, args.instruction)
            .branch(args.branch)
            .require_plan_approval(args.require_plan_approval.unwrap_or(false))
            .auto_pr(args.auto_pr.unwrap_or(false))
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageArgs {
    pub session_name: String,
    pub prompt: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|err| {
        ToolError::invalid_params(format!("Invalid arguments for {}: {}", tool, err))
            .with_hint(format!("help: see the inputSchema of '{}' in tools/list", tool))
    })
}
