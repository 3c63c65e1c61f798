//! Prompt templates for the routing flow

use std::collections::HashMap;

const ROUTER_SYSTEM: &str = r#"You are a router that selects the most appropriate tool.
When a request cannot be handled by any tool, return exactly 'none' (lowercase, no quotes).
Available tools:
{tool_descriptions}

Return ONLY the tool name or 'none'. No explanation or quotes."#;

const EXECUTOR_SYSTEM: &str = r#"You are a helpful assistant with access to the following tools:

{tool_description}

Available tools: {tools}

When using tools:
1. Analyze the user's request
2. Select the most appropriate tool
3. Use the tool with proper parameters
4. Return the results in a clear format

Current request: {input}


Context: {system_time}
"#;

const ERROR_HANDLING: &str = r#"An error occurred while using the tool.
Error message: {error_message}

Please:
1. Analyze the error
2. Explain what went wrong
3. Suggest how to fix it
4. Decide whether to:
   - Retry with modified parameters
   - Switch to a different tool
   - Ask for user clarification
"#;

const REFLECTION: &str = r#"Review the following execution result:
{execution_result}

Consider:
1. Was the tool choice appropriate?
2. Did it achieve the desired outcome?
3. Should we:
   - Continue with the same tool
   - Try a different tool
   - Ask for clarification
   - Return results to user
"#;

/// User-supplied replacements for the built-in templates.
///
/// Each override uses the same `{placeholder}` names as the built-in text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOverrides {
    pub router_system: Option<String>,
    pub executor_system: Option<String>,
    pub error_handling: Option<String>,
}

/// Templates for generating prompts at each stage
#[derive(Debug, Clone, Default)]
pub struct PromptTemplate {
    overrides: PromptOverrides,
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: PromptOverrides) -> Self {
        Self { overrides }
    }

    /// Substitute `{key}` placeholders. Unknown placeholders are left as-is.
    pub fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) if vars.contains_key(&after[..end]) => {
                    out.push_str(vars[&after[..end]]);
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// System prompt for the router model
    pub fn router_system(&self, tool_descriptions: &str) -> String {
        let template = self.overrides.router_system.as_deref().unwrap_or(ROUTER_SYSTEM);
        Self::render(
            template,
            &HashMap::from([("tool_descriptions", tool_descriptions)]),
        )
    }

    /// System prompt for the execution model
    pub fn executor_system(
        &self,
        tool_description: &str,
        tools: &str,
        input: &str,
        system_time: &str,
    ) -> String {
        let template = self
            .overrides
            .executor_system
            .as_deref()
            .unwrap_or(EXECUTOR_SYSTEM);
        Self::render(
            template,
            &HashMap::from([
                ("tool_description", tool_description),
                ("tools", tools),
                ("input", input),
                ("system_time", system_time),
            ]),
        )
    }

    /// Follow-up instruction after a tool failure
    pub fn error_handling(&self, error_message: &str) -> String {
        let template = self
            .overrides
            .error_handling
            .as_deref()
            .unwrap_or(ERROR_HANDLING);
        Self::render(
            template,
            &HashMap::from([("error_message", error_message)]),
        )
    }

    /// Reflection prompt over an execution result
    pub fn reflection(&self, execution_result: &str) -> String {
        Self::render(
            REFLECTION,
            &HashMap::from([("execution_result", execution_result)]),
        )
    }
}
