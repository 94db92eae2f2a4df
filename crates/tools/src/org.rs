//! Canned org-chart lookups.
//!
//! Two tools that the model has to chain — the team lookup only works once
//! the manager's name is known — which makes them a good fixture for
//! multi-step reasoning.

use async_trait::async_trait;

use loopwright_core::{ParamSpec, Tool, ToolError};

/// `get_my_manager` — the current user's manager record.
pub struct ManagerTool;

#[async_trait]
impl Tool for ManagerTool {
    fn name(&self) -> &str {
        "get_my_manager"
    }

    fn description(&self) -> &str {
        "Get the current user's manager: name, email, city, and department"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![]
    }

    async fn call(
        &self,
        _arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({
            "manager_name": "Alice Johnson",
            "manager_email": "alice.johnson@company.com",
            "manager_city": "Paris",
            "manager_department": "Engineering",
        }))
    }
}

/// `get_team_members` — the direct reports of a named manager.
pub struct TeamMembersTool;

#[async_trait]
impl Tool for TeamMembersTool {
    fn name(&self) -> &str {
        "get_team_members"
    }

    fn description(&self) -> &str {
        "List the team members reporting to a manager, by the manager's full name"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string("manager_name", "The manager's full name, e.g. 'Alice Johnson'")
            .required()]
    }

    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        let manager_name = arguments
            .get("manager_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let team = match manager_name {
            "Alice Johnson" => Some(serde_json::json!([
                {"name": "Bob Smith", "role": "Senior Engineer", "city": "London"},
                {"name": "Carol Williams", "role": "Engineer", "city": "Paris"},
                {"name": "David Brown", "role": "Junior Engineer", "city": "Paris"},
            ])),
            "John Doe" => Some(serde_json::json!([
                {"name": "Eve Davis", "role": "Designer", "city": "Tokyo"},
                {"name": "Frank Miller", "role": "Product Manager", "city": "New York"},
            ])),
            _ => None,
        };

        Ok(match team {
            Some(team) => serde_json::json!({"manager": manager_name, "team": team}),
            None => serde_json::json!({
                "error": format!("No team found for manager {manager_name}")
            }),
        })
    }
}
